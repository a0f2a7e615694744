//! Error types for duck-console.
//!
//! Defines the error enum used throughout the console. Connection-manager
//! failures, statement failures and translator failures all share this type so
//! they can be folded into a single rendering-safe result.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for console operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The configured database file does not exist.
    #[error("Database file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The engine refused to open the file.
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    /// An operation needed a handle while nothing is connected.
    #[error("No active database connection")]
    NoActiveConnection,

    /// Closing and reopening the current file did not produce a live handle.
    #[error("Connection reset failed: {0}")]
    ResetFailed(String),

    /// The submitted SQL text was empty or whitespace.
    #[error("Please enter a SQL query")]
    EmptyQuery,

    /// The link to the engine is broken (I/O failure, closed or invalidated handle).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The engine rejected the statement (syntax, missing object, type mismatch).
    #[error("Query error: {0}")]
    Query(String),

    /// Anything the engine reported that fits neither class above.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Language-model API errors (missing key, rate limits, timeouts).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, bad values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database upload errors (bad extension, unreadable form data).
    #[error("Upload error: {0}")]
    Upload(String),

    /// Internal application errors (worker panics, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Creates an open-failed error with the given message.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Creates a reset-failed error with the given message.
    pub fn reset_failed(msg: impl Into<String>) -> Self {
        Self::ResetFailed(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an unexpected error with the given message.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an upload error with the given message.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::OpenFailed(_) => "Open Failed",
            Self::NoActiveConnection => "No Active Connection",
            Self::ResetFailed(_) => "Reset Failed",
            Self::EmptyQuery => "Empty Query",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Unexpected(_) => "Unexpected Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Upload(_) => "Upload Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns a stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::OpenFailed(_) => "open_failed",
            Self::NoActiveConnection => "no_active_connection",
            Self::ResetFailed(_) => "reset_failed",
            Self::EmptyQuery => "empty_query",
            Self::Connection(_) => "connection_error",
            Self::Query(_) => "query_error",
            Self::Unexpected(_) => "unexpected_error",
            Self::Llm(_) => "llm_error",
            Self::Config(_) => "config_error",
            Self::Upload(_) => "upload_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns true for failures where the link to the engine is unusable.
    ///
    /// These are the only failures the query executor retries after a reconnect.
    pub fn is_connection_class(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns true if the renderer should offer a manual connection reset.
    pub fn suggests_reset(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::NoActiveConnection | Self::ResetFailed(_)
        )
    }

    /// Returns the text shown to the user.
    ///
    /// Statement errors pass the engine message through verbatim so the SQL can
    /// be fixed; connection problems get a generic hint pointing at the reset action.
    pub fn user_message(&self) -> String {
        match self {
            Self::Query(msg) => msg.clone(),
            Self::Connection(msg) | Self::ResetFailed(msg) => {
                format!("Connection problem ({msg}). Try resetting the connection.")
            }
            Self::NoActiveConnection => {
                "Connection problem: no database is connected. Try resetting the connection."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;
