//! Validation pipeline.
//!
//! Two independent passes over a snapshot:
//!
//! - **Row validation** ([`RowValidator`]): cell rules per column, a row is
//!   valid iff every applicable rule passes.
//! - **Cross-row validation** ([`CrossRowValidator`]): uniqueness, dependency
//!   and custom constraints that see the whole row set.
//!
//! The engine never merges the two; [`RowValidationSummary::combine_with`] is
//! there for callers that want a single verdict per row.
//!
//! ```rust
//! use term_grid::core::{Row, RowSnapshot};
//! use term_grid::validation::{RowValidator, RuleDefinition};
//!
//! let snapshot = RowSnapshot::with_visible_columns(
//!     vec![Row::new().with("email", "ada@example.com"), Row::new().with("email", "nope")],
//!     ["email"],
//! )?;
//! let validator = RowValidator::new(&snapshot, vec![RuleDefinition::email("email")], Default::default())?;
//! assert!(validator.validate_row(0, &snapshot.rows()[0]).is_valid);
//! assert!(!validator.validate_row(1, &snapshot.rows()[1]).is_valid);
//! # Ok::<(), term_grid::error::EngineError>(())
//! ```

mod cross_row;
mod row;
mod rules;

pub use cross_row::{
    ConstraintViolation, CrossRowCheck, CrossRowConstraint, CrossRowConstraintKind,
    CrossRowOutcome, CrossRowPredicate, CrossRowValidator,
};
pub use row::RowValidator;
pub use rules::{RuleDefinition, RuleKind, ValuePredicate};

use crate::core::{BatchRunSummary, RowOutcome, RowResult};
use std::collections::BTreeMap;

/// Summary of a row validation run.
pub type RowValidationSummary = BatchRunSummary<RowOutcome>;

/// Summary of a cross-row validation run.
pub type CrossRowSummary = BatchRunSummary<CrossRowOutcome>;

impl BatchRunSummary<RowOutcome> {
    /// Per-row verdict across both passes, keyed by row index.
    ///
    /// A row is valid iff it passed every pass that processed it; rows that
    /// neither run processed are absent.
    pub fn combine_with(&self, cross_row: &CrossRowSummary) -> BTreeMap<usize, bool> {
        let mut combined = BTreeMap::new();
        for outcome in &self.per_row_outcomes {
            combined.insert(outcome.row_index, outcome.is_success());
        }
        for outcome in &cross_row.per_row_outcomes {
            combined
                .entry(outcome.row_index)
                .and_modify(|valid| *valid &= outcome.is_success())
                .or_insert_with(|| outcome.is_success());
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellOutcome, RunStatus};
    use chrono::Utc;

    #[test]
    fn test_combine_with_ands_both_passes() {
        let rows = RowValidationSummary::from_outcomes(
            3,
            vec![
                RowOutcome::from_cells(0, vec![CellOutcome::valid("id", "required")]),
                RowOutcome::from_cells(1, vec![CellOutcome::invalid("id", "required", "missing")]),
                RowOutcome::from_cells(2, vec![]),
            ],
            RunStatus::Completed,
            Vec::new(),
            Utc::now(),
        );
        let cross = CrossRowSummary::from_outcomes(
            3,
            vec![
                CrossRowOutcome {
                    row_index: 0,
                    violations: vec![],
                },
                CrossRowOutcome {
                    row_index: 2,
                    violations: vec![ConstraintViolation {
                        constraint_name: "unique_id".to_string(),
                        kind: CrossRowConstraintKind::Unique,
                        column_name: "id".to_string(),
                        severity: Default::default(),
                        message: "id must be unique".to_string(),
                        conflicting_rows: vec![0],
                    }],
                },
            ],
            RunStatus::Completed,
            Vec::new(),
            Utc::now(),
        );

        let combined = rows.combine_with(&cross);
        assert_eq!(combined.get(&0), Some(&true));
        assert_eq!(combined.get(&1), Some(&false));
        assert_eq!(combined.get(&2), Some(&false));
    }
}
