//! Scratch storage for uploaded database files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};

/// File extensions accepted as database uploads.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["duckdb", "db"];

/// A scratch directory holding uploaded database files.
///
/// The directory and everything in it is removed when the store is dropped.
#[derive(Debug)]
pub struct UploadStore {
    dir: TempDir,
    /// Resolved form of `dir`, matching the paths the connection manager keeps.
    root: PathBuf,
    counter: AtomicU64,
}

impl UploadStore {
    /// Creates a fresh scratch directory under the system temp dir.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("duck-console-uploads-")
            .tempdir()
            .map_err(|e| ConsoleError::upload(format!("Failed to create upload directory: {e}")))?;
        let root = std::fs::canonicalize(dir.path())
            .map_err(|e| ConsoleError::upload(format!("Failed to resolve upload directory: {e}")))?;
        debug!(path = %root.display(), "Created upload directory");

        Ok(Self {
            dir,
            root,
            counter: AtomicU64::new(0),
        })
    }

    /// Location of the scratch directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lies inside the scratch directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root) || path.starts_with(self.dir.path())
    }

    /// Checks the extension of an uploaded file name and returns a safe version of it.
    ///
    /// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
    /// becomes `_`.
    pub fn sanitize_file_name(name: &str) -> Result<String> {
        let base = Path::new(name.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConsoleError::upload("No filename provided"))?;

        let extension = Path::new(base)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ConsoleError::upload(format!(
                "Unsupported file type '{}' (supported: .duckdb, .db)",
                base
            )));
        }

        let sanitized: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.starts_with('.') {
            return Err(ConsoleError::upload("File name has no stem"));
        }

        Ok(sanitized)
    }

    /// Writes an upload into the scratch directory and returns its path.
    ///
    /// Every upload gets a unique name, so re-uploading a file with the same
    /// name never overwrites one that may still be open.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let sanitized = Self::sanitize_file_name(file_name)?;
        if bytes.is_empty() {
            return Err(ConsoleError::upload("Uploaded file is empty"));
        }

        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.root.join(format!("{seq}_{sanitized}"));

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ConsoleError::upload(format!("Failed to save upload: {e}")))?;

        info!(path = %path.display(), bytes = bytes.len(), "Saved uploaded database");
        Ok(path)
    }

    /// Removes a previously saved upload, logging rather than failing.
    ///
    /// Paths outside the scratch directory are left alone.
    pub async fn discard(&self, path: &Path) {
        if !self.contains(path) {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}
