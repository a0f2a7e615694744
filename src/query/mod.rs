//! Query execution and result shaping for duck-console.
//!
//! Separates running SQL (with its reconnect-and-retry policy) from schema
//! introspection and from preparing results for display.

pub mod display;
pub mod executor;
pub mod introspect;

pub use display::{
    classify, looks_like_json, truncate_text, CellKind, DisplayCell, DisplayResult,
    MAX_DISPLAY_ROWS,
};
pub use executor::{ExecutionResult, QueryExecutor, QueryOutcome};
pub use introspect::{BestEffort, Degradation};
