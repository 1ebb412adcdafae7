//! Configuration parsing for the duckload CLI.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - JSON cleaning profiles for CSV loads

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{IfExists, DEFAULT_TABLE_NAME};
use crate::table::CleanOptions;

/// Duckload: load cleaned CSV data into DuckDB and query it back.
#[derive(Parser, Debug, Clone)]
#[command(name = "duckload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Path to the DuckDB database file
    #[arg(short, long, env = "DUCKLOAD_DB_PATH", default_value = "./data/duckload.duckdb", global = true)]
    pub db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "DUCKLOAD_LOG_JSON", global = true)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/duckload.duckdb"),
            log_level: "info".into(),
            log_json: false,
        }
    }
}

/// Output format for query results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the schema and load a CSV file into it
    Init {
        /// CSV file to load
        #[arg(long)]
        csv: PathBuf,
        /// Target table name
        #[arg(short, long, default_value = DEFAULT_TABLE_NAME)]
        table: String,
        /// Truncate the table first (replace) or keep existing rows (append)
        #[arg(long, value_enum, default_value_t = IfExists::Replace)]
        if_exists: IfExists,
        /// SQL schema file (defaults to sql/create_transactions_table.sql)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
    /// Load a CSV file into an existing table
    Load {
        /// CSV file to load
        #[arg(long)]
        csv: PathBuf,
        /// Target table name
        #[arg(short, long)]
        table: String,
        /// Truncate the table first (replace) or keep existing rows (append)
        #[arg(long, value_enum, default_value_t = IfExists::Replace)]
        if_exists: IfExists,
        /// Only uppercase column names; skip the cleaning pipeline
        #[arg(long)]
        no_clean: bool,
        /// JSON file with cleaning options
        #[arg(long)]
        pipeline: Option<PathBuf>,
    },
    /// Run a SQL query and print the result
    Query {
        /// SQL statement
        sql: String,
        /// Decimal places for float columns
        #[arg(long, default_value_t = 2, conflicts_with = "no_round")]
        round: i32,
        /// Leave float columns unrounded
        #[arg(long)]
        no_round: bool,
        /// Column to sort by (repeatable)
        #[arg(long = "sort-by")]
        sort_by: Vec<String>,
        /// Sort in descending order
        #[arg(long)]
        descending: bool,
        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Execute a SQL file and print the last statement's result
    Exec {
        /// SQL file to execute
        file: PathBuf,
        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

/// Read a JSON cleaning profile.
pub fn load_clean_options(path: &Path) -> anyhow::Result<CleanOptions> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
