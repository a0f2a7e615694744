//! Display shaping for query results.
//!
//! Caps the number of rows handed to the renderer, keeps the true total next
//! to the cap, and tags every cell as null, scalar or JSON-like.

use std::time::Duration;

use serde::Serialize;

use super::QueryOutcome;
use crate::db::{QueryResult, Value};

/// Maximum number of rows sent to the renderer.
pub const MAX_DISPLAY_ROWS: usize = 100;

/// Characters kept in the collapsed preview of a JSON cell.
pub const JSON_PREVIEW_CHARS: usize = 50;

/// Rendering class of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Null,
    Scalar,
    Json,
}

/// Classifies a cell, probing text with a strict JSON parse.
pub fn classify(value: &Value) -> CellKind {
    classify_with(value, looks_like_json)
}

/// Classifies a cell with a caller-supplied JSON probe.
///
/// Null cells never reach the probe.
pub fn classify_with(value: &Value, probe: impl Fn(&str) -> bool) -> CellKind {
    match value {
        Value::Null => CellKind::Null,
        Value::Json(_) => CellKind::Json,
        other => {
            if probe(&other.to_display_string()) {
                CellKind::Json
            } else {
                CellKind::Scalar
            }
        }
    }
}

/// Returns true if `text` is a JSON object or array.
///
/// The trimmed text must start and end with a matching `{}` or `[]` pair
/// before a full parse is attempted.
pub fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim();
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));

    bracketed && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// Truncates `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// One cell ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayCell {
    pub kind: CellKind,
    /// Full text of the value; `None` for NULL.
    pub text: Option<String>,
    /// Shortened text for collapsed JSON cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl DisplayCell {
    fn from_value(value: &Value) -> Self {
        let kind = classify(value);
        match kind {
            CellKind::Null => Self {
                kind,
                text: None,
                preview: None,
            },
            CellKind::Scalar => Self {
                kind,
                text: Some(value.to_display_string()),
                preview: None,
            },
            CellKind::Json => {
                let text = value.to_display_string();
                Self {
                    kind,
                    preview: Some(truncate_text(&text, JSON_PREVIEW_CHARS)),
                    text: Some(text),
                }
            }
        }
    }
}

/// A query result shaped for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<DisplayCell>>,
    /// Rows included in `rows`.
    pub shown_rows: usize,
    /// Rows the statement actually produced.
    pub total_rows: usize,
    pub truncated: bool,
    pub execution_ms: u128,
    pub attempts: u32,
}

impl DisplayResult {
    /// Shapes `result` with the default row cap.
    pub fn from_result(result: &QueryResult, execution_time: Duration) -> Self {
        Self::with_limit(result, execution_time, MAX_DISPLAY_ROWS)
    }

    /// Shapes `result`, keeping at most `limit` rows.
    pub fn with_limit(result: &QueryResult, execution_time: Duration, limit: usize) -> Self {
        let rows: Vec<Vec<DisplayCell>> = result
            .rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(DisplayCell::from_value).collect())
            .collect();

        let total_rows = result.row_count();
        Self {
            columns: result.columns.clone(),
            shown_rows: rows.len(),
            truncated: rows.len() < total_rows,
            total_rows,
            rows,
            execution_ms: execution_time.as_millis(),
            attempts: 1,
        }
    }

    /// Human-readable row count line.
    pub fn summary(&self) -> String {
        if self.columns.is_empty() {
            "Statement executed successfully".to_string()
        } else if self.truncated {
            format!("Showing {} of {} rows", self.shown_rows, self.total_rows)
        } else if self.total_rows == 1 {
            "1 row".to_string()
        } else {
            format!("{} rows", self.total_rows)
        }
    }
}

impl From<&QueryOutcome> for DisplayResult {
    fn from(outcome: &QueryOutcome) -> Self {
        Self {
            attempts: outcome.attempts,
            ..Self::from_result(&outcome.result, outcome.execution_time)
        }
    }
}
