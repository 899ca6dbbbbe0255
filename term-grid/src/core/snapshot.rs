//! Read-only row store view handed to the engine for one operation.

use super::Row;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Describes one column of the grid schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, unique within the schema
    pub name: String,
    /// Whether the column is currently shown
    pub is_visible: bool,
    /// Whether searches may target the column
    #[serde(default = "default_true")]
    pub is_searchable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnDescriptor {
    /// A visible, searchable column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_visible: true,
            is_searchable: true,
        }
    }

    /// A hidden column.
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            is_visible: false,
            ..Self::new(name)
        }
    }

    /// Marks the column as excluded from search targets.
    pub fn not_searchable(mut self) -> Self {
        self.is_searchable = false;
        self
    }
}

/// An immutable snapshot of rows and their column schema.
///
/// Cloning is cheap: rows and columns are shared behind `Arc`, which is what
/// lets concurrent batch workers read the same snapshot without copying it.
#[derive(Debug, Clone, Default)]
pub struct RowSnapshot {
    rows: Arc<[Row]>,
    columns: Arc<[ColumnDescriptor]>,
}

impl RowSnapshot {
    /// Creates a snapshot, rejecting duplicate column names.
    pub fn new(rows: Vec<Row>, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EngineError::configuration(format!(
                    "duplicate column '{}' in schema",
                    column.name
                )));
            }
        }
        Ok(Self {
            rows: rows.into(),
            columns: columns.into(),
        })
    }

    /// Creates a snapshot whose columns are all visible and searchable.
    pub fn with_visible_columns<I, S>(rows: Vec<Row>, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(rows, names.into_iter().map(ColumnDescriptor::new).collect())
    }

    /// Parses rows from a JSON array of objects.
    pub fn from_json(json: &str, columns: Vec<ColumnDescriptor>) -> Result<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Self::new(rows, columns)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a column descriptor by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns `ColumnNotFound` unless `name` is in the schema.
    pub fn require_column(&self, name: &str) -> Result<&ColumnDescriptor> {
        self.column(name)
            .ok_or_else(|| EngineError::column_not_found(name))
    }

    /// Fails with `NotInitialized` when no column schema was supplied.
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(EngineError::NotInitialized(
                "no column schema attached to the row snapshot".to_string(),
            ));
        }
        Ok(())
    }
}
