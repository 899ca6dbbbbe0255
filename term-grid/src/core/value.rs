//! Cell values and rows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single cell value as held by the grid's row store.
///
/// Deserializes untagged, so a JSON row such as
/// `{"id": 7, "name": "Ada", "active": true, "note": null}` maps directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Returns true for `Null` and for text that is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the value as a number when it is numeric or numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the display text, or `None` for `Null`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

static NULL: CellValue = CellValue::Null;

/// One row of the grid: column name to cell value.
///
/// Columns missing from the map read as [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: HashMap<String, CellValue>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs.
    ///
    /// ```rust
    /// use term_grid::core::{CellValue, Row};
    ///
    /// let row = Row::from_pairs([("id", CellValue::from(1)), ("name", "Ada".into())]);
    /// assert_eq!(row.get("name").to_string(), "Ada");
    /// assert!(row.get("missing").is_blank());
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of `column`, or `Null` when absent.
    pub fn get(&self, column: &str) -> &CellValue {
        self.values.get(column).unwrap_or(&NULL)
    }

    /// Sets the value of `column`.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Builder-style variant of [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Number of populated columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
