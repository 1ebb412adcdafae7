//! Gateway owning one DuckDB connection.
//!
//! The connection is opened lazily on first use and released by
//! [`StorageGateway::close`], by dropping the gateway, or by dropping a
//! [`ScopedGateway`] guard.

use duckdb::types::{ToSql, Value};
use duckdb::{params_from_iter, Connection};
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::script::split_statements;
use super::staging::{self, quote_literal};
use super::{FileKind, StorageError};
use crate::table::{clean_input_data, normalise_columns, CleanOptions, Table};

/// Schema file used by [`StorageGateway::initialise_database`] when none is given.
pub const DEFAULT_SCHEMA_PATH: &str = "sql/create_transactions_table.sql";

/// Target table used by [`StorageGateway::initialise_database`] by default.
pub const DEFAULT_TABLE_NAME: &str = "TRANSACTIONS";

/// Text values the CSV reader treats as missing, in addition to empty fields.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Values bound to a statement's placeholders.
#[derive(Debug, Clone, Default)]
pub enum QueryParams {
    /// Bound in order to `?` or `$1`, `$2`, ... placeholders.
    Positional(Vec<Value>),
    /// Bound by name to `$name` placeholders. A leading `$` on a key is ignored.
    Named(Vec<(String, Value)>),
    #[default]
    None,
}

impl QueryParams {
    pub fn named<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Named(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<Vec<Value>> for QueryParams {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

/// What to do with rows already in the target table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IfExists {
    /// Truncate the table (keeping its structure) before inserting.
    #[default]
    Replace,
    /// Insert after the existing rows.
    Append,
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            _ => Err(format!("unknown if_exists mode: {s}")),
        }
    }
}

/// Owner of a single lazily opened DuckDB connection.
///
/// All operations take `&mut self`; one gateway serves one caller at a time.
pub struct StorageGateway {
    db_path: PathBuf,
    connection: Option<Connection>,
    clean_options: CleanOptions,
}

impl StorageGateway {
    /// Create a gateway for the database at `db_path`. Nothing is opened yet.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        let db_path = db_path.as_ref().to_path_buf();
        tracing::debug!(db_path = %db_path.display(), "Storage gateway created");
        Self {
            db_path,
            connection: None,
            clean_options: CleanOptions::default(),
        }
    }

    /// Replace the cleaning profile used by [`load_csv_to_table`](Self::load_csv_to_table).
    pub fn with_clean_options(mut self, options: CleanOptions) -> Self {
        self.clean_options = options;
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn clean_options(&self) -> &CleanOptions {
        &self.clean_options
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Return the open connection, opening it first if needed.
    ///
    /// Missing parent directories of the database file are created.
    pub fn connect(&mut self) -> Result<&Connection, StorageError> {
        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => self.open()?,
        };
        let conn: &Connection = self.connection.insert(conn);
        Ok(conn)
    }

    fn open(&self) -> Result<Connection, StorageError> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        tracing::debug!(db_path = %self.db_path.display(), "Connected to database");
        Ok(conn)
    }

    /// Close the connection if one is open.
    pub fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            if let Err((_, err)) = conn.close() {
                tracing::warn!(error = %err, "Error closing database connection");
            }
            tracing::debug!("Database connection closed");
        }
    }

    /// Connect now and close again when the returned guard drops.
    pub fn scoped(&mut self) -> Result<ScopedGateway<'_>, StorageError> {
        self.connect()?;
        Ok(ScopedGateway { gateway: self })
    }

    /// Run one statement and collect its full result.
    ///
    /// `params` bind positionally to `?` / `$n` placeholders.
    pub fn execute_query(&mut self, query: &str, params: &[Value]) -> Result<Table, StorageError> {
        let params = if params.is_empty() {
            QueryParams::None
        } else {
            QueryParams::Positional(params.to_vec())
        };
        self.execute_query_with(query, &params)
    }

    /// Run one statement with positional or named parameters.
    pub fn execute_query_with(&mut self, query: &str, params: &QueryParams) -> Result<Table, StorageError> {
        let conn = self.connect()?;
        match run_query(conn, query, params) {
            Ok(table) => {
                tracing::debug!(rows = table.num_rows(), "Query executed successfully");
                Ok(table)
            }
            Err(err) => {
                tracing::error!(error = %err, "Error executing query");
                tracing::error!(query, "Query");
                Err(err)
            }
        }
    }

    /// Run every statement in `script`, returning the last statement's result.
    pub fn execute_script(&mut self, script: &str) -> Result<Table, StorageError> {
        let statements = split_statements(script);
        let Some((last, leading)) = statements.split_last() else {
            return Ok(Table::empty());
        };

        let conn = self.connect()?;
        for statement in leading {
            if let Err(err) = conn.execute_batch(statement) {
                tracing::error!(error = %err, "Error executing query");
                tracing::error!(query = %statement, "Query");
                return Err(err.into());
            }
        }
        self.execute_query_with(last, &QueryParams::None)
    }

    /// Read a SQL file and execute it.
    pub fn execute_sql_file<P: AsRef<Path>>(&mut self, sql_file: P) -> Result<Table, StorageError> {
        let sql_path = sql_file.as_ref();
        if !sql_path.exists() {
            return Err(StorageError::NotFound {
                kind: FileKind::Sql,
                path: sql_path.to_path_buf(),
            });
        }

        let script = fs::read_to_string(sql_path)?;
        tracing::info!(path = %sql_path.display(), "Executing SQL file");
        self.execute_script(&script)
    }

    /// Create tables from a DDL schema file.
    pub fn create_table_from_schema<P: AsRef<Path>>(&mut self, schema_file: P) -> Result<(), StorageError> {
        let schema_path = schema_file.as_ref();
        if !schema_path.exists() {
            return Err(StorageError::NotFound {
                kind: FileKind::Schema,
                path: schema_path.to_path_buf(),
            });
        }

        tracing::info!(path = %schema_path.display(), "Creating table from schema");
        self.execute_sql_file(schema_path)?;
        Ok(())
    }

    /// Read a CSV file into a table through DuckDB's CSV reader.
    ///
    /// Fields matching [`MISSING_MARKERS`] are read as nulls.
    pub fn read_csv<P: AsRef<Path>>(&mut self, csv_path: P) -> Result<Table, StorageError> {
        let csv_path = csv_path.as_ref();
        if !csv_path.exists() {
            return Err(StorageError::NotFound {
                kind: FileKind::Csv,
                path: csv_path.to_path_buf(),
            });
        }
        let markers: Vec<String> = MISSING_MARKERS.iter().map(|m| quote_literal(m)).collect();
        let query = format!(
            "SELECT * FROM read_csv_auto({}, header = true, nullstr = [{}])",
            quote_literal(&csv_path.to_string_lossy()),
            markers.join(", ")
        );
        self.execute_query(&query, &[])
    }

    /// Load a CSV file into an existing table.
    ///
    /// With `clean_data` the gateway's [`CleanOptions`] are applied; without
    /// it only the column names are uppercased. The cleaned columns must
    /// line up with the target table. Returns the target's row count.
    pub fn load_csv_to_table<P: AsRef<Path>>(
        &mut self,
        csv_path: P,
        table_name: &str,
        if_exists: IfExists,
        clean_data: bool,
    ) -> Result<u64, StorageError> {
        let csv_path = csv_path.as_ref();
        let raw = self.read_csv(csv_path)?;

        let table = if clean_data {
            clean_input_data(raw, &self.clean_options)?
        } else {
            normalise_columns(raw, true)?
        };

        tracing::info!(csv = %csv_path.display(), table = table_name, "Loading CSV file into table");

        let conn = self.connect()?;
        let loaded = staging::load_table(conn, &table, table_name, if_exists).and_then(|()| {
            let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
                row.get(0)
            })?;
            Ok(count)
        });

        match loaded {
            Ok(count) => {
                let rows = u64::try_from(count).unwrap_or_default();
                tracing::info!(rows, table = table_name, "Loaded rows into table");
                Ok(rows)
            }
            Err(err) => {
                tracing::error!(error = %err, "Error loading CSV to table");
                Err(err)
            }
        }
    }

    /// Create the schema, then load `csv_file` into `table_name`.
    ///
    /// The schema defaults to [`DEFAULT_SCHEMA_PATH`]. It is applied before
    /// the CSV's existence is checked.
    pub fn initialise_database<P: AsRef<Path>>(
        &mut self,
        csv_file: P,
        table_name: &str,
        if_exists: IfExists,
        table_schema: Option<&Path>,
    ) -> Result<u64, StorageError> {
        tracing::info!(db_path = %self.db_path.display(), "Initialising database");

        let schema = table_schema.unwrap_or_else(|| Path::new(DEFAULT_SCHEMA_PATH));
        self.create_table_from_schema(schema)?;

        let csv_path = csv_file.as_ref();
        if !csv_path.exists() {
            tracing::error!(path = %csv_path.display(), "CSV file not found");
            return Err(StorageError::NotFound {
                kind: FileKind::Csv,
                path: csv_path.to_path_buf(),
            });
        }

        tracing::info!(path = %csv_path.display(), "Loading data");
        let rows = self.load_csv_to_table(csv_path, table_name, if_exists, true)?;
        tracing::info!(rows, "Database initialisation complete");
        Ok(rows)
    }
}

impl Drop for StorageGateway {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_query(conn: &Connection, query: &str, params: &QueryParams) -> Result<Table, StorageError> {
    let mut stmt = conn.prepare(query)?;
    let arrow = match params {
        QueryParams::None => stmt.query_arrow([])?,
        QueryParams::Positional(values) => stmt.query_arrow(params_from_iter(values.iter()))?,
        QueryParams::Named(pairs) => {
            let named: Vec<(&str, &dyn ToSql)> = pairs
                .iter()
                .map(|(name, value)| (name.trim_start_matches('$'), value as &dyn ToSql))
                .collect();
            stmt.query_arrow(named.as_slice())?
        }
    };
    let schema = arrow.get_schema();
    let batches: Vec<_> = arrow.collect();
    Ok(Table::from_batches(schema, &batches)?)
}

/// Guard that keeps a gateway connected for a block of work.
///
/// Dropping the guard closes the connection on every exit path.
pub struct ScopedGateway<'a> {
    gateway: &'a mut StorageGateway,
}

impl Deref for ScopedGateway<'_> {
    type Target = StorageGateway;

    fn deref(&self) -> &Self::Target {
        self.gateway
    }
}

impl DerefMut for ScopedGateway<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.gateway
    }
}

impl Drop for ScopedGateway<'_> {
    fn drop(&mut self) {
        self.gateway.close();
    }
}
