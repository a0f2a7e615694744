//! Mock database client for testing.
//!
//! Provides an in-memory database implementation whose behaviour can be
//! scripted (canned results, injected failures, refused opens) and observed
//! through a shared [`MockProbe`].

use super::{Connector, DatabaseClient, QueryResult, Value};
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    opened: Vec<PathBuf>,
    closed: Vec<PathBuf>,
    executed: Vec<String>,
    reject_opens: bool,
    script: VecDeque<Option<ConsoleError>>,
    responses: Vec<(String, QueryResult)>,
}

/// Shared view into every handle a [`MockConnector`] has opened.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Paths opened so far, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.state().opened.clone()
    }

    /// Paths closed so far, in order.
    pub fn closed(&self) -> Vec<PathBuf> {
        self.state().closed.clone()
    }

    /// Every SQL string that reached a handle, including liveness probes.
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.state().opened.len()
    }

    /// Queues a failure returned by the next `execute_query` call on any handle.
    pub fn fail_next(&self, error: ConsoleError) {
        self.state().script.push_back(Some(error));
    }

    /// Queues a normal answer ahead of later scripted failures.
    pub fn succeed_next(&self) {
        self.state().script.push_back(None);
    }

    /// Makes subsequent opens fail with `OpenFailed`.
    pub fn reject_opens(&self, reject: bool) {
        self.state().reject_opens = reject;
    }

    /// Returns `result` for any statement containing `pattern` (case-insensitive).
    pub fn respond(&self, pattern: impl Into<String>, result: QueryResult) {
        self.state()
            .responses
            .push((pattern.into().to_lowercase(), result));
    }
}

/// A connector that hands out [`MockDatabaseClient`]s.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    probe: MockProbe,
}

impl MockConnector {
    /// Creates a new mock connector with a fresh probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the probe shared by all handles from this connector.
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, path: &Path) -> Result<Box<dyn DatabaseClient>> {
        let mut state = self.probe.state();
        if state.reject_opens {
            return Err(ConsoleError::open_failed(format!(
                "mock refused to open {}",
                path.display()
            )));
        }
        state.opened.push(path.to_path_buf());
        drop(state);

        Ok(Box::new(MockDatabaseClient::with_probe(
            path,
            self.probe.clone(),
        )))
    }
}

/// A mock database client that returns predefined results.
#[derive(Debug)]
pub struct MockDatabaseClient {
    path: PathBuf,
    probe: MockProbe,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    /// Creates a standalone mock client.
    pub fn new() -> Self {
        Self::with_probe(Path::new(":mock:"), MockProbe::default())
    }

    fn with_probe(path: &Path, probe: MockProbe) -> Self {
        Self {
            path: path.to_path_buf(),
            probe,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        if self.is_closed() {
            return Err(ConsoleError::connection("the connection was closed"));
        }

        let mut state = self.probe.state();
        state.executed.push(sql.to_string());

        if let Some(Some(error)) = state.script.pop_front() {
            return Err(error);
        }

        let sql_lower = sql.to_lowercase();
        if let Some((_, result)) = state
            .responses
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
        {
            return Ok(result.clone());
        }

        if sql_lower.trim_start().starts_with("select") {
            Ok(QueryResult::with_data(
                vec!["result".to_string()],
                vec![vec![Value::Text(format!("Mock result for: {}", sql))]],
            ))
        } else {
            Ok(QueryResult::new())
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.probe.state().closed.push(self.path.clone());
        }
        Ok(())
    }
}
