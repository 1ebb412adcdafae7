//! Observability infrastructure.
//!
//! Provides structured tracing setup for the CLI and tests.

pub mod tracing;
