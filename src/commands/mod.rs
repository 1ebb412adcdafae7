//! Subcommand implementations.

pub mod init;
pub mod load;
pub mod query;

use anyhow::Result;
use duckload::config::OutputFormat;
use duckload::table::to_json_rows;
use duckload::Table;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
struct TableOutput {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
    total: usize,
}

/// Print a result table in the requested format.
pub fn print_table(table: &Table, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if table.num_columns() == 0 {
                println!("OK");
            } else {
                println!("{}", table.to_pretty_string()?);
                println!("{} row(s)", table.num_rows());
            }
        }
        OutputFormat::Json => {
            let output = TableOutput {
                columns: table.column_names().into_iter().map(String::from).collect(),
                rows: to_json_rows(table)?,
                total: table.num_rows(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
