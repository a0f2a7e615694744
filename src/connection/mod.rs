//! Connection management for duck-console.
//!
//! Owns the single database handle and the switch/reset lifecycle around it.

pub mod manager;

pub use manager::{ConnectionManager, ConnectionState, ConnectionStatus};
