//! Schema introspection integration tests.

use duck_console::db::Column;
use duck_console::error::ConsoleError;
use duck_console::query::QueryExecutor;
use pretty_assertions::assert_eq;

use super::{create_database, read_only_manager};

const SETUP_SQL: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    email VARCHAR NOT NULL,
    name VARCHAR
);
CREATE TABLE "Order Items" (sku VARCHAR, quantity INTEGER);
CREATE VIEW active_users AS SELECT id, email FROM users;
"#;

#[tokio::test]
async fn test_list_tables_alphabetical_with_views() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "schema.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);

    let tables = QueryExecutor::new(&mut manager).list_tables().await;

    assert!(!tables.is_degraded());
    assert_eq!(
        tables.value(),
        &vec![
            "Order Items".to_string(),
            "active_users".to_string(),
            "users".to_string()
        ]
    );

    manager.close().await;
}

#[tokio::test]
async fn test_describe_table_reports_constraints() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "schema.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);

    let columns = QueryExecutor::new(&mut manager).describe_table("users").await;

    assert!(!columns.is_degraded());
    let columns = columns.into_value();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "email", "name"]);

    assert!(columns[0].primary_key);
    assert_eq!(columns[0].data_type, "INTEGER");
    assert_eq!(columns[1], Column::new("email", "VARCHAR").not_null(true));
    assert_eq!(columns[2], Column::new("name", "VARCHAR"));

    manager.close().await;
}

#[tokio::test]
async fn test_describe_table_with_awkward_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "schema.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);

    let columns = QueryExecutor::new(&mut manager)
        .describe_table("Order Items")
        .await
        .into_value();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["sku", "quantity"]);

    manager.close().await;
}

#[tokio::test]
async fn test_describe_unknown_table_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "schema.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);

    let columns = QueryExecutor::new(&mut manager)
        .describe_table("no_such_table")
        .await;

    assert!(columns.is_degraded());
    assert!(matches!(columns.error(), Some(ConsoleError::Query(_))));
    assert!(columns.value().is_empty());
    assert_eq!(columns.degradation().unwrap().kind, "query_error");

    manager.close().await;
}

#[tokio::test]
async fn test_listing_on_missing_default_file_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = read_only_manager(&dir.path().join("absent.duckdb"));

    let tables = QueryExecutor::new(&mut manager).list_tables().await;

    assert!(tables.is_degraded());
    assert!(tables.value().is_empty());
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_load_schema_feeds_prompt_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = create_database(dir.path(), "schema.duckdb", SETUP_SQL);
    let mut manager = read_only_manager(&path);

    let schema = QueryExecutor::new(&mut manager).load_schema().await;
    assert!(!schema.is_degraded());

    let schema = schema.into_value();
    assert_eq!(schema.tables.len(), 3);
    assert_eq!(schema.table("users").unwrap().columns.len(), 3);

    let summary = schema.format_for_llm();
    assert!(summary.contains("users"));
    assert!(summary.contains("email"));
    assert!(summary.contains("Order Items"));

    manager.close().await;
}
