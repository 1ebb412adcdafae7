//! duckload: load cleaned CSV data into DuckDB and query it back.
//!
//! # Usage
//!
//! ```bash
//! duckload init --csv data/events.csv
//! duckload query "SELECT PLATFORM, COUNT(*) AS N FROM TRANSACTIONS GROUP BY 1" --sort-by N --descending
//! ```
//!
//! Environment variables can also be used:
//! - `DUCKLOAD_DB_PATH`: Path to the DuckDB file
//! - `DUCKLOAD_LOG_JSON`: Emit JSON logs
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use duckload::config::{load_clean_options, Cli, Command};
use duckload::observability::tracing::init_tracing;
use duckload::StorageGateway;

fn main() -> Result<()> {
    // Parse configuration from CLI arguments and environment
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_tracing(&cli.config.log_level, cli.config.log_json);

    let mut gateway = StorageGateway::new(&cli.config.db_path);
    if let Command::Load {
        pipeline: Some(path),
        ..
    } = &cli.command
    {
        let options = load_clean_options(path)
            .with_context(|| format!("failed to read pipeline file {}", path.display()))?;
        gateway = gateway.with_clean_options(options);
    }

    let mut db = gateway
        .scoped()
        .with_context(|| format!("failed to open database {}", cli.config.db_path.display()))?;

    match cli.command {
        Command::Init {
            csv,
            table,
            if_exists,
            schema,
        } => commands::init::run(&mut db, &csv, &table, if_exists, schema.as_deref())?,
        Command::Load {
            csv,
            table,
            if_exists,
            no_clean,
            ..
        } => commands::load::run(&mut db, &csv, &table, if_exists, !no_clean)?,
        Command::Query {
            sql,
            round,
            no_round,
            sort_by,
            descending,
            output,
        } => {
            let round = (!no_round).then_some(round);
            commands::query::run(&mut db, &sql, round, &sort_by, !descending, output)?;
        }
        Command::Exec { file, output } => commands::query::exec(&mut db, &file, output)?,
    }

    Ok(())
}
