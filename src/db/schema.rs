//! Database schema types for duck-console.
//!
//! Represents the tables of the open database file and their columns, and
//! formats them as the schema summary handed to the SQL translator.

use serde::Serialize;

/// Represents the schema of the open database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    /// All tables in the schema, ordered by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the schema contains no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Formats the schema for inclusion in an LLM prompt.
    ///
    /// One block per table, one line per column with its declared type and
    /// nullability, e.g. `  - id: INTEGER (PK, NOT NULL)`.
    pub fn format_for_llm(&self) -> String {
        if self.tables.is_empty() {
            return "Database Schema:\n\n(no tables)\n".to_string();
        }

        let tables_text = self
            .tables
            .iter()
            .map(Self::format_table_for_llm)
            .collect::<Vec<_>>()
            .join("");

        format!("Database Schema:\n\n{}", tables_text)
    }

    fn format_table_for_llm(table: &Table) -> String {
        let column_lines = table
            .columns
            .iter()
            .map(Self::format_column_line)
            .collect::<Vec<_>>()
            .join("");

        format!("Table: {}\n{}\n", table.name, column_lines)
    }

    fn format_column_line(column: &Column) -> String {
        let annotations = [
            column.primary_key.then_some("PK"),
            column.not_null.then_some("NOT NULL"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        if annotations.is_empty() {
            format!("  - {}: {}\n", column.name, column.data_type)
        } else {
            format!(
                "  - {}: {} ({})\n",
                column.name,
                column.data_type,
                annotations.join(", ")
            )
        }
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Sets the table's columns.
    pub fn with_columns(self, columns: Vec<Column>) -> Self {
        Self { columns, ..self }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (e.g., "INTEGER", "VARCHAR").
    pub data_type: String,

    /// Whether the column is declared NOT NULL.
    pub not_null: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Creates a new nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            not_null: false,
            primary_key: false,
        }
    }

    /// Sets whether the column is declared NOT NULL.
    pub fn not_null(self, not_null: bool) -> Self {
        Self { not_null, ..self }
    }

    /// Sets whether the column is part of the primary key.
    pub fn primary_key(self, primary_key: bool) -> Self {
        Self {
            primary_key,
            ..self
        }
    }
}
