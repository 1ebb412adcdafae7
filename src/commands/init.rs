//! Init command implementation.

use anyhow::{Context, Result};
use duckload::{IfExists, StorageGateway};
use std::path::Path;

pub fn run(
    gateway: &mut StorageGateway,
    csv: &Path,
    table: &str,
    if_exists: IfExists,
    schema: Option<&Path>,
) -> Result<()> {
    let rows = gateway
        .initialise_database(csv, table, if_exists, schema)
        .context("database initialisation failed")?;
    println!("Loaded {rows} row(s) into {table}");
    Ok(())
}
