//! Staging table used to move an in-memory table into DuckDB.
//!
//! A cleaned table is appended into a connection-local TEMP table through the
//! Arrow appender, copied into the target with `INSERT ... SELECT *`, then
//! dropped. TEMP tables live in the `temp` catalog, so tables in the database
//! file are never created or dropped here, and a crashed load leaves nothing
//! behind.

use duckdb::arrow::array::ArrayRef;
use duckdb::arrow::compute::cast;
use duckdb::arrow::datatypes::{DataType, Field, FieldRef, TimeUnit};
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::Connection;
use std::sync::Arc;

use super::{IfExists, StorageError};
use crate::table::{Table, TableError};

/// Name the cleaned table is registered under while loading.
pub const STAGING_TABLE: &str = "__duckload_staging";

/// Catalog and schema DuckDB keeps TEMP tables in.
const TEMP_CATALOG: &str = "temp";
const TEMP_SCHEMA: &str = "main";

/// Fully qualified name of the staging table.
fn staging_name() -> String {
    format!("{TEMP_CATALOG}.{TEMP_SCHEMA}.{}", quote_ident(STAGING_TABLE))
}

/// Quote an identifier for DuckDB.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for DuckDB.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// DuckDB column type for an Arrow type the appender can write.
fn duckdb_type(data_type: &DataType) -> Option<String> {
    let sql = match data_type {
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 => "TINYINT",
        DataType::Int16 => "SMALLINT",
        DataType::Int32 => "INTEGER",
        DataType::Int64 => "BIGINT",
        DataType::UInt8 => "UTINYINT",
        DataType::UInt16 => "USMALLINT",
        DataType::UInt32 => "UINTEGER",
        DataType::UInt64 => "UBIGINT",
        DataType::Float32 => "FLOAT",
        DataType::Float64 => "DOUBLE",
        DataType::Utf8 => "VARCHAR",
        DataType::Date32 => "DATE",
        DataType::Timestamp(TimeUnit::Microsecond, None) => "TIMESTAMP",
        DataType::Decimal128(precision, scale) => {
            return Some(format!("DECIMAL({precision}, {scale})"));
        }
        _ => return None,
    };
    Some(sql.to_string())
}

/// Cast columns into the subset of Arrow types [`duckdb_type`] maps.
fn staging_column(column: &ArrayRef) -> Result<ArrayRef, StorageError> {
    let target = match column.data_type() {
        DataType::LargeUtf8 | DataType::Utf8View | DataType::Null => DataType::Utf8,
        DataType::Date64 => DataType::Date32,
        DataType::Timestamp(unit, tz) if *unit != TimeUnit::Microsecond || tz.is_some() => {
            DataType::Timestamp(TimeUnit::Microsecond, None)
        }
        _ => return Ok(Arc::clone(column)),
    };
    Ok(cast(column, &target).map_err(TableError::from)?)
}

fn staging_batch(table: &Table) -> Result<RecordBatch, StorageError> {
    let batch = table.record_batch();
    let columns = batch
        .columns()
        .iter()
        .map(staging_column)
        .collect::<Result<Vec<_>, _>>()?;
    let fields: Vec<FieldRef> = batch
        .schema_ref()
        .fields()
        .iter()
        .zip(&columns)
        .map(|(field, column)| Arc::new(Field::new(field.name(), column.data_type().clone(), true)))
        .collect();
    let staged = Table::from_parts(fields, columns, batch.num_rows())?;
    Ok(staged.into_record_batch())
}

/// `CREATE OR REPLACE TEMP TABLE` statement matching the batch's schema.
fn create_staging_ddl(batch: &RecordBatch) -> Result<String, StorageError> {
    let columns = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|field| {
            let sql_type =
                duckdb_type(field.data_type()).ok_or_else(|| StorageError::UnsupportedType {
                    column: field.name().clone(),
                    data_type: field.data_type().to_string(),
                })?;
            Ok(format!("{} {sql_type}", quote_ident(field.name())))
        })
        .collect::<Result<Vec<_>, StorageError>>()?;
    Ok(format!(
        "CREATE OR REPLACE TEMP TABLE {} ({})",
        quote_ident(STAGING_TABLE),
        columns.join(", ")
    ))
}

/// Register `table` under [`STAGING_TABLE`].
pub fn register(conn: &Connection, table: &Table) -> Result<(), StorageError> {
    let batch = staging_batch(table)?;
    conn.execute_batch(&create_staging_ddl(&batch)?)?;
    if batch.num_rows() > 0 {
        let mut appender = conn.appender_to_catalog_and_db(STAGING_TABLE, TEMP_CATALOG, TEMP_SCHEMA)?;
        appender.append_record_batch(batch)?;
        appender.flush()?;
    }
    tracing::debug!(table = STAGING_TABLE, rows = table.num_rows(), "Registered staging table");
    Ok(())
}

/// Drop the staging table if it exists. Only the TEMP table is targeted.
pub fn unregister(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", staging_name()))?;
    Ok(())
}

/// Truncate (on replace) and fill `table_name` from the staging table.
pub fn copy_into(conn: &Connection, table_name: &str, if_exists: IfExists) -> Result<(), StorageError> {
    if if_exists == IfExists::Replace {
        conn.execute_batch(&format!("TRUNCATE TABLE {table_name}"))?;
        tracing::debug!(table = table_name, "Cleared existing data from table");
    }
    conn.execute_batch(&format!("INSERT INTO {table_name} SELECT * FROM {}", staging_name()))?;
    Ok(())
}

/// Register, copy and unregister `table` into `table_name`.
///
/// The staging table is dropped on failure too, so a later load starts clean.
pub fn load_table(
    conn: &Connection,
    table: &Table,
    table_name: &str,
    if_exists: IfExists,
) -> Result<(), StorageError> {
    let result = register(conn, table).and_then(|()| copy_into(conn, table_name, if_exists));
    let dropped = unregister(conn);
    result?;
    dropped
}
