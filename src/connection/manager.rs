//! Connection manager for the database lifecycle and file switching.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{Connector, DatabaseClient};
use crate::error::{ConsoleError, Result};

/// Statement used to check that a handle is usable.
pub(crate) const LIVENESS_CHECK: &str = "SELECT 1";

/// The open handle together with the path it was opened on.
struct ActiveConnection {
    path: PathBuf,
    db: Box<dyn DatabaseClient>,
}

/// Lifecycle state of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

/// Snapshot of the manager, as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub path: PathBuf,
    pub read_only: bool,
}

/// Owns the single live database handle.
///
/// At most one handle is open at a time. Opening a new file closes the old
/// handle first, and a handle is never handed out after it has been closed.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    default_path: PathBuf,
    path: Option<PathBuf>,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    /// Creates an unconnected manager.
    ///
    /// `default_path` is used the first time a handle is needed and nothing
    /// has been connected explicitly.
    pub fn new(connector: Arc<dyn Connector>, default_path: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            default_path: default_path.into(),
            path: None,
            active: None,
        }
    }

    /// Opens `path`, replacing any current handle.
    ///
    /// A missing file fails with `NotFound` before the current handle is
    /// touched. If the engine then rejects the file the manager is left
    /// unconnected, but the previously configured path is kept so a later
    /// reconnect returns to it.
    pub async fn connect(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let requested = path.as_ref();
        let resolved = tokio::fs::canonicalize(requested)
            .await
            .map_err(|_| ConsoleError::NotFound(requested.to_path_buf()))?;

        if !tokio::fs::metadata(&resolved)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
        {
            return Err(ConsoleError::NotFound(requested.to_path_buf()));
        }

        self.close().await;

        let db = self.connector.open(&resolved).await.map_err(|e| {
            warn!(path = %resolved.display(), error = %e, "Failed to open database");
            e
        })?;

        info!(
            path = %resolved.display(),
            read_only = db.is_read_only(),
            "Connected to database"
        );
        self.path = Some(resolved.clone());
        self.active = Some(ActiveConnection { path: resolved, db });

        Ok(())
    }

    /// Closes the current handle and reopens the same file.
    ///
    /// The new handle must answer a liveness probe. Any failure leaves the
    /// manager unconnected and is reported as `ResetFailed`.
    pub async fn reconnect(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(ConsoleError::reset_failed(
                "no database has been connected yet",
            ));
        };

        info!(path = %path.display(), "Resetting database connection");
        self.close().await;

        if let Err(e) = self.connect(&path).await {
            warn!(path = %path.display(), error = %e, "Reconnect failed");
            return Err(ConsoleError::reset_failed(e.to_string()));
        }

        let probe = match self.active.as_ref() {
            Some(active) => active.db.execute_query(LIVENESS_CHECK).await,
            None => Err(ConsoleError::NoActiveConnection),
        };

        if let Err(e) = probe {
            warn!(path = %path.display(), error = %e, "Liveness probe failed after reconnect");
            self.close().await;
            return Err(ConsoleError::reset_failed(e.to_string()));
        }

        Ok(())
    }

    /// Closes the current handle. Closing an unconnected manager is a no-op.
    pub async fn close(&mut self) {
        if let Some(active) = self.active.take() {
            match active.db.close().await {
                Ok(()) => debug!(path = %active.path.display(), "Closed database connection"),
                Err(e) => warn!(
                    path = %active.path.display(),
                    error = %e,
                    "Error while closing database connection"
                ),
            }
        }
    }

    /// Returns the current handle.
    pub fn handle(&self) -> Result<&dyn DatabaseClient> {
        self.active
            .as_ref()
            .map(|active| active.db.as_ref())
            .ok_or(ConsoleError::NoActiveConnection)
    }

    /// Returns the current handle, connecting first if necessary.
    ///
    /// An unconnected manager opens the last configured path, or the default
    /// path when nothing has been configured.
    pub async fn acquire(&mut self) -> Result<&dyn DatabaseClient> {
        if self.active.is_none() {
            let path = self.target_path().to_path_buf();
            debug!(path = %path.display(), "Auto-connecting");
            self.connect(&path).await?;
        }
        self.handle()
    }

    /// Path the manager is (or would be) connected to.
    pub fn target_path(&self) -> &Path {
        self.path.as_deref().unwrap_or(&self.default_path)
    }

    /// Resolved path of the open handle, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|active| active.path.as_path())
    }

    /// Check if there's an active connection.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Unconnected
        }
    }

    /// Summarizes the manager for status reporting.
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.is_connected(),
            path: self.target_path().to_path_buf(),
            read_only: self
                .active
                .as_ref()
                .map(|active| active.db.is_read_only())
                .unwrap_or(true),
        }
    }
}
