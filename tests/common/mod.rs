//! Test utilities shared by the duckload integration tests.
//!
//! Provides:
//! - Temporary database fixtures
//! - Helpers for writing CSV and SQL inputs

#![allow(dead_code)]

use duckload::StorageGateway;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for the database and input files
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with a temporary database directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test.duckdb");
        Self { temp_dir, db_path }
    }

    /// Get the database path as a string.
    pub fn db_path_str(&self) -> &str {
        self.db_path.to_str().expect("invalid path")
    }

    /// Gateway over the fixture's database. Not connected yet.
    pub fn gateway(&self) -> StorageGateway {
        StorageGateway::new(&self.db_path)
    }

    /// Write `contents` to `name` inside the temp dir and return its path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("failed to write test file");
        path
    }

    /// Path inside the temp dir that is never created.
    pub fn missing_file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("missing").join(name)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema for the two-column table used by the load tests.
pub const SIMPLE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS T (ID BIGINT, NAME VARCHAR);";

/// CSV with a duplicate row and a row missing its name.
pub const SIMPLE_CSV: &str = "id,name\n1,a\n1,a\n2,b\n3,\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.temp_dir.path().exists());
        assert!(fixture.db_path_str().contains("test.duckdb"));
    }
}
