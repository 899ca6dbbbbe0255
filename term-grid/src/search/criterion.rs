//! What to search for.

use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A search request.
///
/// ```rust
/// use term_grid::search::SearchCriterion;
///
/// let criterion = SearchCriterion::new("ada")
///     .with_whole_word(true)
///     .with_target_columns(["name", "email"]);
/// assert!(criterion.is_valid());
/// assert!(!SearchCriterion::new("   ").is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriterion {
    pub term: String,
    #[serde(default)]
    pub case_sensitive: bool,
    /// Interpret `term` as a regular expression
    #[serde(default)]
    pub regex: bool,
    #[serde(default)]
    pub whole_word: bool,
    /// Restrict the search to these columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_columns: Option<BTreeSet<String>>,
}

impl SearchCriterion {
    /// Case-insensitive substring search for `term` across all columns.
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            case_sensitive: false,
            regex: false,
            whole_word: false,
            target_columns: None,
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    pub fn with_whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn with_target_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// A criterion is valid when its term is not blank.
    pub fn is_valid(&self) -> bool {
        !self.term.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(EngineError::configuration("Search term cannot be empty"))
        }
    }
}
