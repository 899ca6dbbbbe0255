//! The unit of work the batch executor runs against each row.

use super::{Row, RowResult};
use std::fmt::Debug;

/// A rule set reduced to a pure function of one row.
///
/// Validation rule sets, cross-row constraint sets and search matchers all
/// implement this trait, which is the only thing the
/// [`BatchExecutor`](crate::executor::BatchExecutor) knows about them.
/// Implementations must be stateless with respect to rows: the executor calls
/// [`evaluate`](RowWorker::evaluate) from several tasks at once and in any
/// order.
///
/// # Examples
///
/// ```rust
/// use term_grid::core::{CellOutcome, Row, RowOutcome, RowWorker};
///
/// #[derive(Debug)]
/// struct HasId;
///
/// impl RowWorker for HasId {
///     type Outcome = RowOutcome;
///
///     fn name(&self) -> &str {
///         "has_id"
///     }
///
///     fn evaluate(&self, row_index: usize, row: &Row) -> RowOutcome {
///         let cell = if row.get("id").is_blank() {
///             CellOutcome::invalid("id", "required", "id is required")
///         } else {
///             CellOutcome::valid("id", "required")
///         };
///         RowOutcome::from_cells(row_index, vec![cell])
///     }
///
///     fn fault_outcome(&self, row_index: usize, message: &str) -> RowOutcome {
///         RowOutcome::from_cells(row_index, vec![CellOutcome::invalid("id", "required", message)])
///     }
/// }
/// ```
pub trait RowWorker: Debug + Send + Sync + 'static {
    /// Per-row result type.
    type Outcome: RowResult + Send + 'static;

    /// Name used in logs and progress messages.
    fn name(&self) -> &str;

    /// Evaluates one row.
    fn evaluate(&self, row_index: usize, row: &Row) -> Self::Outcome;

    /// Outcome recorded for a row whose evaluation panicked.
    fn fault_outcome(&self, row_index: usize, message: &str) -> Self::Outcome;

    /// Upper bound on the summed [`RowResult::weight`] worth collecting.
    ///
    /// Once reached, scanning stops and the merged outcomes are trimmed to the
    /// budget. `None` means every row is evaluated.
    fn outcome_budget(&self) -> Option<usize> {
        None
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
