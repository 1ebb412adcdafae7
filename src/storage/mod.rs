//! DuckDB storage layer for Duckload.
//!
//! Provides:
//! - A gateway owning one lazily opened connection
//! - SQL script execution (schema files, query files)
//! - CSV loading through a staging table

pub mod gateway;
pub mod script;
pub mod staging;

pub use gateway::{
    IfExists, QueryParams, ScopedGateway, StorageGateway, DEFAULT_SCHEMA_PATH, DEFAULT_TABLE_NAME,
    MISSING_MARKERS,
};

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::table::TableError;

/// Kind of file a [`StorageError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Sql,
    Schema,
    Csv,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sql => "SQL",
            Self::Schema => "Schema",
            Self::Csv => "CSV",
        })
    }
}

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} file not found: {}", path.display())]
    NotFound { kind: FileKind, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Column {column} has no staging type for {data_type}")]
    UnsupportedType { column: String, data_type: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
