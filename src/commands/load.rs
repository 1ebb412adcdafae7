//! Load command implementation.

use anyhow::{Context, Result};
use duckload::{IfExists, StorageGateway};
use std::path::Path;

pub fn run(
    gateway: &mut StorageGateway,
    csv: &Path,
    table: &str,
    if_exists: IfExists,
    clean: bool,
) -> Result<()> {
    let rows = gateway
        .load_csv_to_table(csv, table, if_exists, clean)
        .with_context(|| format!("failed to load {} into {table}", csv.display()))?;
    println!("Loaded {rows} row(s) into {table}");
    Ok(())
}
