//! Best-effort schema introspection.
//!
//! Table and column listings degrade to empty values when the engine cannot
//! answer, but the failure is kept alongside the value and logged so callers
//! can tell "no tables" apart from "could not list tables".

use serde::Serialize;
use tracing::warn;

use super::QueryExecutor;
use crate::db::{Column, QueryResult, Schema, Table};
use crate::error::ConsoleError;

const LIST_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_catalog = current_database() \
     AND table_schema = current_schema() \
     AND table_type IN ('BASE TABLE', 'VIEW') \
     ORDER BY table_name";

/// A value that may have been replaced by its default after a failure.
#[derive(Debug)]
pub struct BestEffort<T> {
    value: T,
    error: Option<ConsoleError>,
}

impl<T> BestEffort<T> {
    /// A value that was loaded normally.
    pub fn loaded(value: T) -> Self {
        Self { value, error: None }
    }

    /// A fallback value standing in for a failed load.
    pub fn degraded(value: T, error: ConsoleError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&ConsoleError> {
        self.error.as_ref()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Summary of a degraded load, as reported to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Degradation {
    pub kind: &'static str,
    pub message: String,
}

impl<T> BestEffort<T> {
    /// Describes the failure behind a degraded value.
    pub fn degradation(&self) -> Option<Degradation> {
        self.error.as_ref().map(|e| Degradation {
            kind: e.kind(),
            message: e.user_message(),
        })
    }
}

impl QueryExecutor<'_> {
    /// Lists table and view names in the current schema, alphabetically.
    pub async fn list_tables(&mut self) -> BestEffort<Vec<String>> {
        match self.execute(LIST_TABLES_SQL).await.into_result() {
            Ok(outcome) => BestEffort::loaded(table_names(&outcome.result)),
            Err(e) => {
                warn!(error = %e, "Listing tables failed, showing none");
                BestEffort::degraded(Vec::new(), e)
            }
        }
    }

    /// Lists the columns of `table` in declaration order.
    pub async fn describe_table(&mut self, table: &str) -> BestEffort<Vec<Column>> {
        let sql = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
        match self.execute(&sql).await.into_result() {
            Ok(outcome) => BestEffort::loaded(columns_from_table_info(&outcome.result)),
            Err(e) => {
                warn!(table, error = %e, "Describing table failed, showing no columns");
                BestEffort::degraded(Vec::new(), e)
            }
        }
    }

    /// Loads every table with its columns.
    ///
    /// The first failure is kept; tables that could not be described are
    /// included without columns.
    pub async fn load_schema(&mut self) -> BestEffort<Schema> {
        let tables = self.list_tables().await;
        let mut error = tables.error;
        let mut schema = Schema::new();

        for name in tables.value {
            let columns = self.describe_table(&name).await;
            if error.is_none() {
                error = columns.error;
            }
            schema.tables.push(Table::new(name).with_columns(columns.value));
        }

        BestEffort {
            value: schema,
            error,
        }
    }
}

fn table_names(result: &QueryResult) -> Vec<String> {
    result
        .records()
        .filter_map(|record| record.get("table_name").map(|v| v.to_display_string()))
        .collect()
}

/// Reads `PRAGMA table_info` rows (`cid, name, type, notnull, dflt_value, pk`).
fn columns_from_table_info(result: &QueryResult) -> Vec<Column> {
    result
        .records()
        .filter_map(|record| {
            let name = record.get("name")?.to_display_string();
            let data_type = record
                .get("type")
                .map(|v| v.to_display_string())
                .unwrap_or_default();
            let not_null = record
                .get("notnull")
                .and_then(|v| v.as_flag())
                .unwrap_or(false);
            let primary_key = record.get("pk").and_then(|v| v.as_flag()).unwrap_or(false);

            Some(
                Column::new(name, data_type)
                    .not_null(not_null)
                    .primary_key(primary_key),
            )
        })
        .collect()
}
