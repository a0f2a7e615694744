//! duck-console - a browser SQL console for a single DuckDB file.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod server;
