//! Constraints that look at a row in the context of the whole row set.
//!
//! Uniqueness constraints are answered from an index built once per run
//! (display text → row indices), so a row never rescans the snapshot.

use crate::core::{panic_message, Row, RowResult, RowSnapshot, RowWorker, Severity};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Caller predicate for `Custom` (and optionally `Hierarchical`) constraints.
///
/// Receives the row index, the row and every row of the snapshot.
pub type CrossRowPredicate = Arc<dyn Fn(usize, &Row, &[Row]) -> CrossRowCheck + Send + Sync>;

/// Kinds of cross-row constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRowConstraintKind {
    /// Non-blank values of one column must not repeat
    Unique,
    /// The tuple of the comparison columns must not repeat
    CompositeUnique,
    /// The column must stay blank while its dependency column is blank
    Dependency,
    /// Parent/child relationships; only checked through a custom predicate
    Hierarchical,
    /// Caller predicate
    Custom,
}

impl CrossRowConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::CompositeUnique => "composite_unique",
            Self::Dependency => "dependency",
            Self::Hierarchical => "hierarchical",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for CrossRowConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a custom cross-row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossRowCheck {
    pub passed: bool,
    /// Overrides the constraint's error message when set
    pub message: Option<String>,
}

impl CrossRowCheck {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// A constraint evaluated per row against all other rows.
///
/// # Examples
///
/// ```rust
/// use term_grid::core::Severity;
/// use term_grid::validation::CrossRowConstraint;
///
/// let unique = CrossRowConstraint::unique("unique_id", "id");
/// let per_region = CrossRowConstraint::composite_unique(
///     "one_code_per_region",
///     "code",
///     ["region", "code"],
/// )?
/// .with_severity(Severity::Warning);
/// assert_eq!(per_region.comparison_columns, vec!["region", "code"]);
///
/// // composite constraints need something to compare
/// assert!(CrossRowConstraint::composite_unique("bad", "code", Vec::<String>::new()).is_err());
/// # Ok::<(), term_grid::error::EngineError>(())
/// ```
#[derive(Clone)]
pub struct CrossRowConstraint {
    pub name: String,
    pub kind: CrossRowConstraintKind,
    /// Column the violation is reported against
    pub column_name: String,
    pub comparison_columns: Vec<String>,
    pub severity: Severity,
    pub error_message: String,
    pub custom_predicate: Option<CrossRowPredicate>,
}

impl fmt::Debug for CrossRowConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossRowConstraint")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("column_name", &self.column_name)
            .field("comparison_columns", &self.comparison_columns)
            .field("severity", &self.severity)
            .field("custom_predicate", &self.custom_predicate.is_some())
            .finish()
    }
}

impl CrossRowConstraint {
    /// Builds a constraint, checking that it is well formed.
    ///
    /// Composite and dependency constraints need at least one comparison
    /// column and custom constraints need a predicate.
    pub fn new(
        name: impl Into<String>,
        kind: CrossRowConstraintKind,
        column_name: impl Into<String>,
        comparison_columns: Vec<String>,
        custom_predicate: Option<CrossRowPredicate>,
    ) -> Result<Self> {
        let name = name.into();
        let column_name = column_name.into();
        if name.trim().is_empty() {
            return Err(EngineError::configuration(
                "Cross-row constraint name cannot be empty",
            ));
        }
        match kind {
            CrossRowConstraintKind::CompositeUnique | CrossRowConstraintKind::Dependency
                if comparison_columns.is_empty() =>
            {
                return Err(EngineError::configuration(format!(
                    "Constraint '{name}' ({kind}) requires at least one comparison column"
                )));
            }
            CrossRowConstraintKind::Custom if custom_predicate.is_none() => {
                return Err(EngineError::configuration(format!(
                    "Constraint '{name}' is custom but has no predicate"
                )));
            }
            _ => {}
        }

        let error_message = default_message(kind, &column_name, &comparison_columns);
        Ok(Self {
            name,
            kind,
            column_name,
            comparison_columns,
            severity: Severity::default(),
            error_message,
            custom_predicate,
        })
    }

    pub fn unique(name: impl Into<String>, column_name: impl Into<String>) -> Self {
        let column_name = column_name.into();
        Self {
            name: name.into(),
            kind: CrossRowConstraintKind::Unique,
            error_message: default_message(CrossRowConstraintKind::Unique, &column_name, &[]),
            column_name,
            comparison_columns: Vec::new(),
            severity: Severity::default(),
            custom_predicate: None,
        }
    }

    pub fn composite_unique<I, S>(
        name: impl Into<String>,
        column_name: impl Into<String>,
        comparison_columns: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            CrossRowConstraintKind::CompositeUnique,
            column_name,
            comparison_columns.into_iter().map(Into::into).collect(),
            None,
        )
    }

    /// `column_name` must be blank whenever `depends_on` is blank.
    pub fn dependency(
        name: impl Into<String>,
        column_name: impl Into<String>,
        depends_on: impl Into<String>,
    ) -> Self {
        let column_name = column_name.into();
        let comparison_columns = vec![depends_on.into()];
        Self {
            name: name.into(),
            kind: CrossRowConstraintKind::Dependency,
            error_message: default_message(
                CrossRowConstraintKind::Dependency,
                &column_name,
                &comparison_columns,
            ),
            column_name,
            comparison_columns,
            severity: Severity::default(),
            custom_predicate: None,
        }
    }

    pub fn custom<F>(name: impl Into<String>, column_name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(usize, &Row, &[Row]) -> CrossRowCheck + Send + Sync + 'static,
    {
        let column_name = column_name.into();
        Self {
            name: name.into(),
            kind: CrossRowConstraintKind::Custom,
            error_message: default_message(CrossRowConstraintKind::Custom, &column_name, &[]),
            column_name,
            comparison_columns: Vec::new(),
            severity: Severity::default(),
            custom_predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = error_message.into();
        self
    }

    /// Columns the constraint reads.
    fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.column_name.as_str())
            .chain(self.comparison_columns.iter().map(String::as_str))
    }
}

fn default_message(kind: CrossRowConstraintKind, column: &str, comparison: &[String]) -> String {
    match kind {
        CrossRowConstraintKind::Unique => format!("{column} must be unique"),
        CrossRowConstraintKind::CompositeUnique => {
            format!("The combination of {} must be unique", comparison.join(", "))
        }
        CrossRowConstraintKind::Dependency => {
            let dependency = comparison.first().map(String::as_str).unwrap_or_default();
            format!("{column} requires {dependency} to be set")
        }
        CrossRowConstraintKind::Hierarchical | CrossRowConstraintKind::Custom => {
            format!("{column} failed a cross-row check")
        }
    }
}

/// One failed constraint on one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint_name: String,
    pub kind: CrossRowConstraintKind,
    pub column_name: String,
    pub severity: Severity,
    pub message: String,
    /// Other rows involved in the violation, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicting_rows: Vec<usize>,
}

/// Cross-row outcome of one row; valid when no constraint failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRowOutcome {
    pub row_index: usize,
    pub violations: Vec<ConstraintViolation>,
}

impl CrossRowOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Highest severity among the violations, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}

impl RowResult for CrossRowOutcome {
    fn row_index(&self) -> usize {
        self.row_index
    }

    fn is_success(&self) -> bool {
        self.is_valid()
    }
}

/// Lookup precomputed for a uniqueness constraint.
#[derive(Debug, Default)]
struct ValueIndex {
    rows_by_key: HashMap<Vec<String>, Vec<usize>>,
}

impl ValueIndex {
    fn build(rows: &[Row], columns: &[String]) -> Self {
        let mut rows_by_key: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (row_index, row) in rows.iter().enumerate() {
            if let Some(key) = key_for(row, columns) {
                rows_by_key.entry(key).or_default().push(row_index);
            }
        }
        Self { rows_by_key }
    }

    /// Rows other than `row_index` sharing the row's key.
    fn conflicts(&self, row_index: usize, row: &Row, columns: &[String]) -> Vec<usize> {
        key_for(row, columns)
            .and_then(|key| self.rows_by_key.get(&key))
            .map(|rows| rows.iter().copied().filter(|&i| i != row_index).collect())
            .unwrap_or_default()
    }
}

/// Display-text key of a row, or `None` when any component is blank.
fn key_for(row: &Row, columns: &[String]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| {
            let value = row.get(column);
            (!value.is_blank()).then(|| value.to_string())
        })
        .collect()
}

/// A constraint bound to the snapshot it was prepared for.
#[derive(Debug)]
struct PreparedConstraint {
    constraint: CrossRowConstraint,
    /// Columns forming the uniqueness key
    key_columns: Vec<String>,
    index: Option<ValueIndex>,
}

/// Evaluates cross-row constraints for the snapshot it was built from.
#[derive(Debug)]
pub struct CrossRowValidator {
    snapshot: RowSnapshot,
    constraints: Vec<PreparedConstraint>,
}

impl CrossRowValidator {
    /// Checks every referenced column and builds the uniqueness indexes.
    pub fn new(snapshot: &RowSnapshot, constraints: Vec<CrossRowConstraint>) -> Result<Self> {
        for constraint in &constraints {
            for column in constraint.referenced_columns() {
                snapshot.require_column(column)?;
            }
        }

        let constraints: Vec<_> = constraints
            .into_iter()
            .map(|constraint| {
                let key_columns = match constraint.kind {
                    CrossRowConstraintKind::Unique => vec![constraint.column_name.clone()],
                    CrossRowConstraintKind::CompositeUnique => constraint.comparison_columns.clone(),
                    _ => Vec::new(),
                };
                let index = (!key_columns.is_empty())
                    .then(|| ValueIndex::build(snapshot.rows(), &key_columns));
                PreparedConstraint {
                    constraint,
                    key_columns,
                    index,
                }
            })
            .collect();

        debug!(
            constraints.count = constraints.len(),
            constraints.indexed = constraints.iter().filter(|c| c.index.is_some()).count(),
            rows.total = snapshot.len(),
            "Prepared cross-row constraints"
        );

        Ok(Self {
            snapshot: snapshot.clone(),
            constraints,
        })
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Validates one row of the prepared snapshot.
    pub fn validate_row(&self, row_index: usize, row: &Row) -> CrossRowOutcome {
        let violations = self
            .constraints
            .iter()
            .filter_map(|prepared| self.check(prepared, row_index, row))
            .collect();
        CrossRowOutcome {
            row_index,
            violations,
        }
    }

    fn check(
        &self,
        prepared: &PreparedConstraint,
        row_index: usize,
        row: &Row,
    ) -> Option<ConstraintViolation> {
        let constraint = &prepared.constraint;
        match constraint.kind {
            CrossRowConstraintKind::Unique | CrossRowConstraintKind::CompositeUnique => {
                let conflicts = prepared
                    .index
                    .as_ref()?
                    .conflicts(row_index, row, &prepared.key_columns);
                (!conflicts.is_empty())
                    .then(|| violation(constraint, constraint.error_message.clone(), conflicts))
            }
            CrossRowConstraintKind::Dependency => {
                let dependency = constraint.comparison_columns.first()?;
                let broken =
                    row.get(dependency).is_blank() && !row.get(&constraint.column_name).is_blank();
                broken.then(|| violation(constraint, constraint.error_message.clone(), Vec::new()))
            }
            CrossRowConstraintKind::Hierarchical | CrossRowConstraintKind::Custom => {
                let predicate = constraint.custom_predicate.as_ref()?;
                let rows = self.snapshot.rows();
                match catch_unwind(AssertUnwindSafe(|| predicate(row_index, row, rows))) {
                    Ok(check) if check.passed => None,
                    Ok(check) => Some(violation(
                        constraint,
                        check.message.unwrap_or_else(|| constraint.error_message.clone()),
                        Vec::new(),
                    )),
                    Err(payload) => Some(violation(
                        constraint,
                        format!("Rule evaluation failed: {}", panic_message(payload.as_ref())),
                        Vec::new(),
                    )),
                }
            }
        }
    }
}

fn violation(
    constraint: &CrossRowConstraint,
    message: String,
    conflicting_rows: Vec<usize>,
) -> ConstraintViolation {
    ConstraintViolation {
        constraint_name: constraint.name.clone(),
        kind: constraint.kind,
        column_name: constraint.column_name.clone(),
        severity: constraint.severity,
        message,
        conflicting_rows,
    }
}

impl RowWorker for CrossRowValidator {
    type Outcome = CrossRowOutcome;

    fn name(&self) -> &str {
        "cross_row_validation"
    }

    fn evaluate(&self, row_index: usize, row: &Row) -> CrossRowOutcome {
        self.validate_row(row_index, row)
    }

    fn fault_outcome(&self, row_index: usize, message: &str) -> CrossRowOutcome {
        let violations = self
            .constraints
            .first()
            .map(|prepared| violation(&prepared.constraint, message.to_string(), Vec::new()))
            .into_iter()
            .collect();
        CrossRowOutcome {
            row_index,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rows: Vec<Row>) -> RowSnapshot {
        RowSnapshot::with_visible_columns(rows, ["id", "region", "code", "parent", "child"])
            .unwrap()
    }

    fn run(snapshot: &RowSnapshot, constraint: CrossRowConstraint) -> Vec<CrossRowOutcome> {
        let validator = CrossRowValidator::new(snapshot, vec![constraint]).unwrap();
        snapshot
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| validator.validate_row(i, row))
            .collect()
    }

    #[test]
    fn test_unique_flags_every_duplicate() {
        let snapshot = snapshot(vec![
            Row::new().with("id", "A"),
            Row::new().with("id", "A"),
            Row::new().with("id", "B"),
        ]);
        let outcomes = run(&snapshot, CrossRowConstraint::unique("unique_id", "id"));

        assert_eq!(outcomes[0].violations[0].conflicting_rows, vec![1]);
        assert_eq!(outcomes[1].violations[0].conflicting_rows, vec![0]);
        assert!(outcomes[2].is_valid());
    }

    #[test]
    fn test_unique_is_case_sensitive_and_ignores_blanks() {
        let snapshot = snapshot(vec![
            Row::new().with("id", "a"),
            Row::new().with("id", "A"),
            Row::new(),
            Row::new().with("id", ""),
        ]);
        let outcomes = run(&snapshot, CrossRowConstraint::unique("unique_id", "id"));
        assert!(outcomes.iter().all(CrossRowOutcome::is_valid));
    }

    #[test]
    fn test_composite_unique() {
        let snapshot = snapshot(vec![
            Row::new().with("region", "EU").with("code", 1),
            Row::new().with("region", "US").with("code", 1),
            Row::new().with("region", "EU").with("code", 1),
            Row::new().with("code", 1),
        ]);
        let constraint =
            CrossRowConstraint::composite_unique("region_code", "code", ["region", "code"])
                .unwrap();
        let outcomes = run(&snapshot, constraint);

        assert_eq!(outcomes[0].violations[0].conflicting_rows, vec![2]);
        assert!(outcomes[1].is_valid());
        assert_eq!(outcomes[2].violations[0].conflicting_rows, vec![0]);
        // blank component: skipped
        assert!(outcomes[3].is_valid());
    }

    #[test]
    fn test_dependency() {
        let snapshot = snapshot(vec![
            Row::new().with("parent", "p").with("child", "c"),
            Row::new().with("child", "c"),
            Row::new(),
        ]);
        let outcomes = run(
            &snapshot,
            CrossRowConstraint::dependency("child_needs_parent", "child", "parent")
                .with_severity(Severity::Warning),
        );
        assert!(outcomes[0].is_valid());
        assert_eq!(outcomes[1].max_severity(), Some(Severity::Warning));
        assert!(outcomes[2].is_valid());
    }

    #[test]
    fn test_hierarchical_without_predicate_passes() {
        let snapshot = snapshot(vec![Row::new().with("parent", "missing")]);
        let constraint = CrossRowConstraint::new(
            "tree",
            CrossRowConstraintKind::Hierarchical,
            "parent",
            Vec::new(),
            None,
        )
        .unwrap();
        assert!(run(&snapshot, constraint)[0].is_valid());
    }

    #[test]
    fn test_custom_sees_all_rows_and_panics_are_contained() {
        let snapshot = snapshot(vec![
            Row::new().with("id", 1),
            Row::new().with("id", 2),
            Row::new().with("id", 3),
        ]);
        let constraint = CrossRowConstraint::custom("last_is_max", "id", |index, _row, rows| {
            if index == 1 {
                panic!("custom check exploded");
            }
            if index + 1 == rows.len() {
                CrossRowCheck::pass()
            } else {
                CrossRowCheck::fail("not the last row")
            }
        });
        let outcomes = run(&snapshot, constraint);

        assert_eq!(outcomes[0].violations[0].message, "not the last row");
        assert!(outcomes[1].violations[0]
            .message
            .starts_with("Rule evaluation failed"));
        assert!(outcomes[2].is_valid());
    }

    #[test]
    fn test_invalid_constraints_are_rejected() {
        let missing_predicate = CrossRowConstraint::new(
            "custom",
            CrossRowConstraintKind::Custom,
            "id",
            Vec::new(),
            None,
        );
        assert!(missing_predicate.unwrap_err().is_configuration());

        let missing_column = CrossRowValidator::new(
            &snapshot(vec![]),
            vec![CrossRowConstraint::unique("u", "nope")],
        );
        assert!(matches!(
            missing_column.unwrap_err(),
            EngineError::ColumnNotFound { .. }
        ));
    }
}
