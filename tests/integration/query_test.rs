//! Query execution integration tests.
//!
//! Tests SQL execution, error classification and result shaping on a real
//! DuckDB file.

use std::sync::Arc;

use duck_console::connection::ConnectionManager;
use duck_console::db::Value;
use duck_console::error::ConsoleError;
use duck_console::query::{CellKind, DisplayResult, QueryExecutor, MAX_DISPLAY_ROWS};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::{create_database, read_only_manager, CountingConnector};

const SETUP_SQL: &str = r#"
CREATE TABLE requests (
    id INTEGER PRIMARY KEY,
    path VARCHAR NOT NULL,
    payload VARCHAR,
    created_at TIMESTAMP
);
INSERT INTO requests VALUES
    (1, '/home', '{"user": "ada", "tags": ["a", "b"]}', TIMESTAMP '2024-01-01 12:30:00'),
    (2, '/about', NULL, TIMESTAMP '2024-01-02 08:00:00'),
    (3, '/home', 'not json', NULL);
CREATE TABLE events AS SELECT range AS id FROM range(500);
CREATE TABLE documents (id INTEGER, body JSON);
INSERT INTO documents VALUES (1, '{"kind": "invoice", "lines": [1, 2]}');
"#;

async fn connected_manager() -> (TempDir, ConnectionManager) {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "app.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);
    manager.connect(&path).await.unwrap();
    (dir, manager)
}

#[tokio::test]
async fn test_execute_simple_select() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .into_result()
        .unwrap();

    assert_eq!(outcome.result.columns, vec!["num", "greeting"]);
    assert_eq!(
        outcome.result.rows,
        vec![vec![Value::Int(1), Value::Text("hello".to_string())]]
    );
    assert_eq!(outcome.attempts, 1);

    manager.close().await;
}

#[tokio::test]
async fn test_every_row_matches_column_count() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT * FROM requests ORDER BY id")
        .await
        .into_result()
        .unwrap();

    assert_eq!(outcome.result.columns.len(), 4);
    assert_eq!(outcome.result.row_count(), 3);
    assert!(outcome.result.is_rectangular());
    for row in &outcome.result.rows {
        assert_eq!(row.len(), outcome.result.columns.len());
    }

    manager.close().await;
}

#[tokio::test]
async fn test_records_expose_named_values() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT id, path, created_at FROM requests WHERE id = 1")
        .await
        .into_result()
        .unwrap();

    let record = outcome.result.record(0).unwrap();
    assert_eq!(record.get("path"), Some(&Value::Text("/home".to_string())));
    assert_eq!(
        record.get("created_at").map(Value::to_display_string),
        Some("2024-01-01 12:30:00".to_string())
    );
    assert_eq!(record.get("missing"), None);

    manager.close().await;
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT id, path FROM requests WHERE id > 100")
        .await
        .into_result()
        .unwrap();

    assert_eq!(outcome.result.columns, vec!["id", "path"]);
    assert!(outcome.result.is_empty());
    assert_eq!(
        DisplayResult::from(&outcome).summary(),
        "0 rows".to_string()
    );

    manager.close().await;
}

#[tokio::test]
async fn test_missing_table_is_statement_error() {
    let (_dir, mut manager) = connected_manager().await;

    let result = QueryExecutor::new(&mut manager)
        .execute("SELECT * FROM nonexistent_table")
        .await;

    let err = result.error().unwrap();
    assert!(matches!(err, ConsoleError::Query(msg) if msg.contains("nonexistent_table")));
    assert!(!err.suggests_reset());
    // A statement failure never tears the connection down.
    assert!(manager.is_connected());

    manager.close().await;
}

#[tokio::test]
async fn test_syntax_error_is_statement_error() {
    let (_dir, mut manager) = connected_manager().await;

    let result = QueryExecutor::new(&mut manager).execute("SELEC 1").await;
    assert!(matches!(result.error(), Some(ConsoleError::Query(_))));

    manager.close().await;
}

#[tokio::test]
async fn test_write_on_read_only_file_is_rejected() {
    let (_dir, mut manager) = connected_manager().await;

    let result = QueryExecutor::new(&mut manager)
        .execute("CREATE TABLE scratch (x INTEGER)")
        .await;
    assert!(matches!(result.error(), Some(ConsoleError::Query(_))));

    manager.close().await;
}

#[tokio::test]
async fn test_whitespace_query_is_rejected() {
    let (_dir, mut manager) = connected_manager().await;

    let result = QueryExecutor::new(&mut manager).execute(" \n\t ").await;
    assert!(matches!(result.error(), Some(ConsoleError::EmptyQuery)));

    manager.close().await;
}

#[tokio::test]
async fn test_display_caps_large_results() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT id FROM events")
        .await
        .into_result()
        .unwrap();
    let display = DisplayResult::from(&outcome);

    assert_eq!(outcome.result.row_count(), 500);
    assert_eq!(display.rows.len(), MAX_DISPLAY_ROWS);
    assert_eq!(display.shown_rows, 100);
    assert_eq!(display.total_rows, 500);
    assert!(display.truncated);
    assert_eq!(display.summary(), "Showing 100 of 500 rows");

    manager.close().await;
}

#[tokio::test]
async fn test_display_classifies_cells() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT payload, [1, 2, 3] AS list FROM requests ORDER BY id")
        .await
        .into_result()
        .unwrap();
    let display = DisplayResult::from(&outcome);

    let kinds: Vec<Vec<CellKind>> = display
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.kind).collect())
        .collect();
    assert_eq!(
        kinds,
        vec![
            vec![CellKind::Json, CellKind::Json],
            vec![CellKind::Null, CellKind::Json],
            vec![CellKind::Scalar, CellKind::Json],
        ]
    );

    let list_cell = &display.rows[0][1];
    assert_eq!(list_cell.text.as_deref(), Some("[1,2,3]"));
    assert_eq!(display.rows[1][0].text, None);
    assert_eq!(display.summary(), "3 rows");

    manager.close().await;
}

#[tokio::test]
async fn test_json_column_is_json_cell() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT body FROM documents")
        .await
        .into_result()
        .unwrap();
    let display = DisplayResult::from(&outcome);

    assert_eq!(display.rows[0][0].kind, CellKind::Json);

    manager.close().await;
}

#[tokio::test]
async fn test_fixed_array_and_union_cells() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT [1, 2]::INTEGER[2] AS pair, union_value(num := 2) AS tagged")
        .await
        .into_result()
        .unwrap();

    assert_eq!(
        outcome.result.rows,
        vec![vec![Value::Json("[1,2]".to_string()), Value::Int(2)]]
    );

    manager.close().await;
}

#[tokio::test]
async fn test_bignum_renders_as_decimal_text() {
    let (_dir, mut manager) = connected_manager().await;

    let outcome = QueryExecutor::new(&mut manager)
        .execute("SELECT '-123456789012345678901234567890'::BIGNUM AS big")
        .await
        .into_result()
        .unwrap();

    assert_eq!(
        outcome.result.rows,
        vec![vec![Value::Text(
            "-123456789012345678901234567890".to_string()
        )]]
    );

    manager.close().await;
}

#[tokio::test]
async fn test_missing_external_file_is_statement_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "app.duckdb", SETUP_SQL);
    let connector = Arc::new(CountingConnector::default());
    let mut manager = ConnectionManager::new(connector.clone(), &path);
    manager.connect(&path).await.unwrap();

    let result = QueryExecutor::new(&mut manager)
        .execute("SELECT * FROM read_csv('/nonexistent/file.csv')")
        .await;

    let err = result.error().unwrap();
    assert!(matches!(err, ConsoleError::Query(msg) if msg.contains("IO Error")));
    assert_eq!(connector.opens(), 1);
    assert!(manager.is_connected());

    manager.close().await;
}
