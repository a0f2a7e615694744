//! Database abstraction layer for duck-console.
//!
//! Provides a trait-based interface for the embedded engine so the connection
//! manager and query executor can run against DuckDB or an in-memory mock.

mod duck;
mod mock;
mod schema;
mod types;

pub use duck::{is_connection_failure, is_io_failure, DuckDbClient, DuckDbConnector};
pub use mock::{MockConnector, MockDatabaseClient, MockProbe};
pub use schema::{Column, Schema, Table};
pub use types::{QueryResult, Record, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait defining the interface for an open database handle.
///
/// Errors returned by `execute_query` are already classified: `Connection` for
/// a broken link, `Query` for a rejected statement, `Unexpected` otherwise.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Resolved path of the file this handle was opened on.
    fn path(&self) -> &Path;

    /// Whether the handle was opened read-only.
    fn is_read_only(&self) -> bool;

    /// Executes a SQL statement and materializes all rows.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the handle. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Opens database handles for a file path.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens `path`, failing with `OpenFailed` if the engine rejects the file.
    async fn open(&self, path: &Path) -> Result<Box<dyn DatabaseClient>>;
}
