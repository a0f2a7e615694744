//! Query execution with a single bounded retry.
//!
//! Runs user SQL against the managed handle and folds every failure into an
//! [`ExecutionResult`] so callers never have to handle a propagated error.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::connection::manager::LIVENESS_CHECK;
use crate::connection::ConnectionManager;
use crate::db::{is_io_failure, QueryResult};
use crate::error::{ConsoleError, Result};

/// Executes SQL through a [`ConnectionManager`].
///
/// The executor borrows the manager mutably for the whole call, so a switch
/// or reset requested elsewhere waits until the statement (and its retry)
/// has finished.
pub struct QueryExecutor<'a> {
    pub(crate) manager: &'a mut ConnectionManager,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(manager: &'a mut ConnectionManager) -> Self {
        Self { manager }
    }

    /// Executes `sql` and returns a rendering-safe result.
    ///
    /// Empty input is rejected without touching the connection. A
    /// connection-class failure triggers one reconnect and one retry; every
    /// other failure is returned as-is. An I/O failure on a handle that still
    /// answers `SELECT 1` belongs to the statement and is not retried.
    pub async fn execute(&mut self, sql: &str) -> ExecutionResult {
        if sql.trim().is_empty() {
            return ExecutionResult::Error(ConsoleError::EmptyQuery);
        }

        let start = Instant::now();

        if let Err(e) = self.manager.acquire().await {
            warn!(error = %e, "No database handle available");
            return ExecutionResult::Error(ConsoleError::connection(e.to_string()));
        }

        let first = match self.run_once(sql).await {
            Ok(result) => return ExecutionResult::Success(QueryOutcome::new(result, start, 1)),
            Err(e) => e,
        };

        if !first.is_connection_class() {
            debug!(error = %first, "Query failed without retry");
            return ExecutionResult::Error(Self::classify(first));
        }

        if let ConsoleError::Connection(message) = &first {
            if is_io_failure(message) && self.run_once(LIVENESS_CHECK).await.is_ok() {
                debug!(error = %first, "I/O failure on a live handle, not retrying");
                return ExecutionResult::Error(ConsoleError::query(message.clone()));
            }
        }

        warn!(error = %first, "Connection failure during query, reconnecting");
        if let Err(e) = self.manager.reconnect().await {
            warn!(error = %e, "Reconnect failed, giving up on query");
            return ExecutionResult::Error(ConsoleError::connection(e.to_string()));
        }

        match self.run_once(sql).await {
            Ok(result) => {
                info!("Query succeeded after reconnect");
                ExecutionResult::Success(QueryOutcome::new(result, start, 2))
            }
            Err(e) => {
                warn!(error = %e, "Query failed after reconnect");
                ExecutionResult::Error(Self::classify(e))
            }
        }
    }

    async fn run_once(&self, sql: &str) -> Result<QueryResult> {
        self.manager.handle()?.execute_query(sql).await
    }

    /// Narrows a handle error to the three failure classes callers see.
    fn classify(error: ConsoleError) -> ConsoleError {
        match error {
            ConsoleError::Connection(_) | ConsoleError::Query(_) | ConsoleError::Unexpected(_) => {
                error
            }
            other => ConsoleError::unexpected(other.to_string()),
        }
    }
}

/// Result of executing a query.
#[derive(Debug)]
pub enum ExecutionResult {
    /// Query executed successfully.
    Success(QueryOutcome),
    /// Query execution failed.
    Error(ConsoleError),
}

impl ExecutionResult {
    /// Returns true if the query succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&ConsoleError> {
        match self {
            Self::Success(_) => None,
            Self::Error(e) => Some(e),
        }
    }

    /// Converts into a plain `Result`.
    pub fn into_result(self) -> Result<QueryOutcome> {
        match self {
            Self::Success(outcome) => Ok(outcome),
            Self::Error(e) => Err(e),
        }
    }
}

/// Successful query execution outcome.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query result.
    pub result: QueryResult,
    /// How long the query took, including any reconnect.
    pub execution_time: Duration,
    /// Number of execution attempts (1, or 2 after a reconnect).
    pub attempts: u32,
}

impl QueryOutcome {
    fn new(result: QueryResult, start: Instant, attempts: u32) -> Self {
        Self {
            result,
            execution_time: start.elapsed(),
            attempts,
        }
    }
}
