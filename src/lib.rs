//! Duckload: a thin convenience layer over DuckDB for CSV-driven analytics.
//!
//! Duckload connects to a DuckDB file, creates tables from SQL schema files,
//! loads CSV files into them after a light cleaning pass, and runs queries
//! that come back as in-memory Arrow tables.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`observability`]: Tracing setup
//! - [`storage`]: DuckDB gateway (connection, scripts, CSV loads)
//! - [`table`]: In-memory tables and the cleaning/formatting pipeline

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // table::TableError is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc,      // Panic docs can be verbose
    clippy::struct_excessive_bools   // Pipeline toggles are bools
)]

pub mod config;
pub mod observability;
pub mod storage;
pub mod table;

pub use storage::{IfExists, QueryParams, ScopedGateway, StorageError, StorageGateway};
pub use table::{CleanOptions, DType, DtypeMap, FillValue, MissingStrategy, Table, TableError};

/// Arrow re-export pinned to the version DuckDB was built against.
pub use duckdb::arrow;
