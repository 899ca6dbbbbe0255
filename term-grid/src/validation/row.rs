//! Row-level validation: every applicable cell rule, ANDed per row.

use super::RuleDefinition;
use crate::core::{CellOutcome, Row, RowOutcome, RowSnapshot, RowWorker};
use crate::prelude::*;
use std::collections::HashSet;

/// Applies cell rules to rows, column by column in schema order.
///
/// Built once per run: rule columns are checked against the schema up front
/// and rules on skipped columns are dropped.
#[derive(Debug)]
pub struct RowValidator {
    /// (column, rules for that column) in schema order
    columns: Vec<(String, Vec<RuleDefinition>)>,
}

impl RowValidator {
    /// Groups `rules` by column in schema order.
    ///
    /// Fails with `ColumnNotFound` when a rule names a column outside the
    /// schema. Columns in `skipped_columns` are ignored even if rules target
    /// them.
    pub fn new(
        snapshot: &RowSnapshot,
        rules: Vec<RuleDefinition>,
        skipped_columns: HashSet<String>,
    ) -> Result<Self> {
        for rule in &rules {
            snapshot.require_column(&rule.column_name)?;
        }

        let columns = snapshot
            .columns()
            .iter()
            .filter(|column| !skipped_columns.contains(&column.name))
            .filter_map(|column| {
                let applicable: Vec<_> = rules
                    .iter()
                    .filter(|rule| rule.column_name == column.name)
                    .cloned()
                    .collect();
                (!applicable.is_empty()).then(|| (column.name.clone(), applicable))
            })
            .collect();

        Ok(Self { columns })
    }

    /// Number of rules that will run per row.
    pub fn rule_count(&self) -> usize {
        self.columns.iter().map(|(_, rules)| rules.len()).sum()
    }

    /// Validates a single row outside of a batch run.
    pub fn validate_row(&self, row_index: usize, row: &Row) -> RowOutcome {
        let cells = self
            .columns
            .iter()
            .flat_map(|(column, rules)| {
                let value = row.get(column);
                rules.iter().map(move |rule| rule.check(value))
            })
            .collect();
        RowOutcome::from_cells(row_index, cells)
    }
}

impl RowWorker for RowValidator {
    type Outcome = RowOutcome;

    fn name(&self) -> &str {
        "row_validation"
    }

    fn evaluate(&self, row_index: usize, row: &Row) -> RowOutcome {
        self.validate_row(row_index, row)
    }

    fn fault_outcome(&self, row_index: usize, message: &str) -> RowOutcome {
        let column = self
            .columns
            .first()
            .map(|(column, _)| column.as_str())
            .unwrap_or_default();
        RowOutcome::from_cells(row_index, vec![CellOutcome::invalid(column, "row", message)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnDescriptor;

    fn snapshot() -> RowSnapshot {
        RowSnapshot::new(
            vec![
                Row::new().with("id", "1").with("email", "a@example.com"),
                Row::new().with("email", "broken"),
            ],
            vec![
                ColumnDescriptor::new("id"),
                ColumnDescriptor::new("email"),
                ColumnDescriptor::new("Actions"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = RowValidator::new(
            &snapshot(),
            vec![RuleDefinition::required("missing")],
            HashSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_row_is_valid_only_if_all_cells_pass() {
        let snapshot = snapshot();
        let validator = RowValidator::new(
            &snapshot,
            vec![
                RuleDefinition::email("email"),
                RuleDefinition::required("id"),
            ],
            HashSet::new(),
        )
        .unwrap();

        let first = validator.validate_row(0, &snapshot.rows()[0]);
        assert!(first.is_valid);
        // schema order: id before email
        assert_eq!(first.cell_outcomes[0].column_name, "id");

        let second = validator.validate_row(1, &snapshot.rows()[1]);
        assert!(!second.is_valid);
        assert_eq!(second.errors().count(), 2);
    }

    #[test]
    fn test_skipped_columns_are_ignored() {
        let snapshot = snapshot();
        let validator = RowValidator::new(
            &snapshot,
            vec![RuleDefinition::required("Actions")],
            HashSet::from(["Actions".to_string()]),
        )
        .unwrap();
        assert_eq!(validator.rule_count(), 0);
        assert!(validator.validate_row(1, &snapshot.rows()[1]).is_valid);
    }
}
