//! Query and exec command implementations.

use anyhow::{Context, Result};
use duckload::config::OutputFormat;
use duckload::table::format_query_output;
use duckload::StorageGateway;
use std::path::Path;

use super::print_table;

pub fn run(
    gateway: &mut StorageGateway,
    sql: &str,
    round: Option<i32>,
    sort_by: &[String],
    ascending: bool,
    format: OutputFormat,
) -> Result<()> {
    let table = gateway.execute_query(sql, &[]).context("query failed")?;
    let table = format_query_output(table, round, sort_by, ascending)?;
    print_table(&table, format)
}

pub fn exec(gateway: &mut StorageGateway, file: &Path, format: OutputFormat) -> Result<()> {
    let table = gateway
        .execute_sql_file(file)
        .with_context(|| format!("failed to execute {}", file.display()))?;
    print_table(&table, format)
}
