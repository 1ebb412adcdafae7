//! Gateway integration tests.
//!
//! Tests:
//! - Connection lifecycle against a file database
//! - Query, script and SQL file execution
//! - Missing file handling

mod common;

use common::TestFixture;
use duckload::observability::tracing::init_test_tracing;
use duckload::storage::FileKind;
use duckload::table::format_query_output;
use duckload::{QueryParams, StorageError};
use duckdb::arrow::datatypes::DataType;
use duckdb::types::Value;

#[test]
fn test_simple_select() {
    init_test_tracing();
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let table = gateway.execute_query("SELECT 1 AS X", &[]).unwrap();
    assert_eq!(table.column_names(), vec!["X"]);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.value_string("X", 0).unwrap(), "1");
    assert!(gateway.is_connected());
    assert!(fixture.db_path.exists());
}

#[test]
fn test_positional_parameters() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let table = gateway
        .execute_query(
            "SELECT ?::BIGINT + 1 AS N, ?::VARCHAR AS LABEL",
            &[Value::BigInt(41), Value::Text("answer".into())],
        )
        .unwrap();
    assert_eq!(table.value_string("N", 0).unwrap(), "42");
    assert_eq!(table.value_string("LABEL", 0).unwrap(), "answer");
}

#[test]
fn test_named_parameters() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let params = QueryParams::named([
        ("a", Value::BigInt(41)),
        ("$label", Value::Text("answer".into())),
    ]);
    let table = gateway
        .execute_query_with("SELECT $a::BIGINT + 1 AS N, $label::VARCHAR AS LABEL", &params)
        .unwrap();
    assert_eq!(table.value_string("N", 0).unwrap(), "42");
    assert_eq!(table.value_string("LABEL", 0).unwrap(), "answer");
}

#[test]
fn test_named_parameter_missing_value() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let params = QueryParams::named([("a", Value::BigInt(1))]);
    let err = gateway
        .execute_query_with("SELECT $a + $b AS N", &params)
        .unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));
}

#[test]
fn test_decimal_literals_are_rounded() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let table = gateway
        .execute_query("SELECT * FROM (VALUES (1.2345), (2.6789)) v(X)", &[])
        .unwrap();
    assert!(matches!(
        table.schema().field(0).data_type(),
        DataType::Decimal128(..)
    ));

    let rounded = format_query_output(table, Some(2), &[], true).unwrap();
    let values: Vec<String> = (0..2).map(|i| rounded.value_string("X", i).unwrap()).collect();
    assert_eq!(values, vec!["1.23", "2.68"]);
}

#[test]
fn test_query_error_propagates() {
    init_test_tracing();
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let err = gateway.execute_query("SELEC 1", &[]).unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));

    // The gateway stays usable after a failed statement.
    let table = gateway.execute_query("SELECT 2 AS Y", &[]).unwrap();
    assert_eq!(table.value_string("Y", 0).unwrap(), "2");
}

#[test]
fn test_script_returns_last_result() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let table = gateway
        .execute_script(
            "CREATE TABLE t (id INTEGER);\n\
             INSERT INTO t VALUES (1), (2), (3);\n\
             -- count them\n\
             SELECT COUNT(*) AS N FROM t;",
        )
        .unwrap();
    assert_eq!(table.value_string("N", 0).unwrap(), "3");
}

#[test]
fn test_empty_script_returns_empty_table() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let table = gateway.execute_script("-- nothing here\n").unwrap();
    assert_eq!(table.num_rows(), 0);
    assert_eq!(table.num_columns(), 0);
}

#[test]
fn test_execute_sql_file() {
    let fixture = TestFixture::new();
    let sql = fixture.write_file(
        "report.sql",
        "CREATE TABLE scores (name VARCHAR, score DOUBLE);\n\
         INSERT INTO scores VALUES ('a', 1.5), ('b', 2.5);\n\
         SELECT SUM(score) AS TOTAL FROM scores;\n",
    );
    let mut gateway = fixture.gateway();

    let table = gateway.execute_sql_file(&sql).unwrap();
    assert_eq!(table.value_string("TOTAL", 0).unwrap(), "4.0");
}

#[test]
fn test_missing_sql_file_does_not_connect() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let err = gateway
        .execute_sql_file(fixture.missing_file("nope.sql"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, StorageError::NotFound { kind: FileKind::Sql, .. }));
    assert!(err.to_string().starts_with("SQL file not found"));
    assert!(!gateway.is_connected());
}

#[test]
fn test_missing_schema_file() {
    let fixture = TestFixture::new();
    let mut gateway = fixture.gateway();

    let err = gateway
        .create_table_from_schema(fixture.missing_file("schema.sql"))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { kind: FileKind::Schema, .. }));
}

#[test]
fn test_data_persists_across_gateways() {
    let fixture = TestFixture::new();
    {
        let mut gateway = fixture.gateway();
        gateway
            .execute_script("CREATE TABLE kv (k VARCHAR, v INTEGER); INSERT INTO kv VALUES ('a', 1);")
            .unwrap();
    }

    let mut gateway = fixture.gateway();
    let table = gateway.execute_query("SELECT v FROM kv WHERE k = ?", &[Value::Text("a".into())]).unwrap();
    assert_eq!(table.value_string("v", 0).unwrap(), "1");
}
