//! Result types produced by bulk operations.
//!
//! Everything here is created fresh per operation and handed to the caller;
//! the engine keeps no reference to it afterwards.

use crate::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Common view over per-row outcomes so the executor can merge and count them.
pub trait RowResult {
    /// Index of the row in the snapshot.
    fn row_index(&self) -> usize;

    /// Whether the row counts towards `success_count`.
    fn is_success(&self) -> bool;

    /// How much of the worker's [`outcome_budget`](crate::core::RowWorker::outcome_budget) the row consumes.
    fn weight(&self) -> usize {
        1
    }
}

/// Outcome of one rule against one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellOutcome {
    pub column_name: String,
    /// Short name of the rule kind that produced the outcome
    pub rule: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CellOutcome {
    pub fn valid(column_name: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            rule: rule.into(),
            is_valid: true,
            error_message: None,
        }
    }

    pub fn invalid(
        column_name: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            rule: rule.into(),
            is_valid: false,
            error_message: Some(message.into()),
        }
    }
}

/// Aggregated validation outcome of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_index: usize,
    pub is_valid: bool,
    pub cell_outcomes: Vec<CellOutcome>,
}

impl RowOutcome {
    /// Builds a row outcome; the row is valid iff every cell outcome is.
    pub fn from_cells(row_index: usize, cell_outcomes: Vec<CellOutcome>) -> Self {
        Self {
            row_index,
            is_valid: cell_outcomes.iter().all(|c| c.is_valid),
            cell_outcomes,
        }
    }

    /// Failing cell outcomes only.
    pub fn errors(&self) -> impl Iterator<Item = &CellOutcome> {
        self.cell_outcomes.iter().filter(|c| !c.is_valid)
    }
}

impl RowResult for RowOutcome {
    fn row_index(&self) -> usize {
        self.row_index
    }

    fn is_success(&self) -> bool {
        self.is_valid
    }
}

/// One search hit inside a cell.
///
/// `match_start` and `match_length` count chars of the cell's display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub row_index: usize,
    pub column_name: String,
    pub match_start: usize,
    pub match_length: usize,
    pub matched_text: String,
}

/// Progress of a running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn new(processed: usize, total: usize, message: impl Into<String>) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            processed as f64 / total as f64 * 100.0
        };
        Self {
            processed,
            total,
            percentage,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Terminal status of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    /// Stopped cooperatively; completed rows are kept
    Cancelled,
    /// Stopped by a fault that escaped row-level isolation
    Faulted(String),
}

/// Kind of fault contained to one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFaultKind {
    /// The batch hit its deadline; remaining rows were not processed
    Timeout,
    /// The batch task died; its rows were not processed
    Panicked(String),
}

/// A fault that aborted (part of) one batch without touching the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFault {
    pub batch_index: usize,
    /// First row of the batch
    pub start_row: usize,
    /// One past the last row of the batch
    pub end_row: usize,
    /// Rows of the batch that never got evaluated
    pub unprocessed_rows: usize,
    pub kind: BatchFaultKind,
}

/// Summary of one bulk run over a snapshot.
///
/// `per_row_outcomes` is always ascending by row index and its length is
/// `processed_rows`, no matter in which order batches finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunSummary<O> {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub per_row_outcomes: Vec<O>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<BatchFault>,
}

impl<O: RowResult> BatchRunSummary<O> {
    /// Builds a summary from merged outcomes, counting successes.
    pub fn from_outcomes(
        total_rows: usize,
        mut per_row_outcomes: Vec<O>,
        status: RunStatus,
        faults: Vec<BatchFault>,
        start_time: DateTime<Utc>,
    ) -> Self {
        per_row_outcomes.sort_by_key(|o| o.row_index());
        let success_count = per_row_outcomes.iter().filter(|o| o.is_success()).count();
        let processed_rows = per_row_outcomes.len();
        Self {
            total_rows,
            processed_rows,
            success_count,
            failure_count: processed_rows - success_count,
            start_time,
            end_time: Utc::now(),
            per_row_outcomes,
            status,
            faults,
        }
    }

    /// An empty summary for a run that never evaluated a row.
    pub fn empty(total_rows: usize, status: RunStatus) -> Self {
        Self::from_outcomes(total_rows, Vec::new(), status, Vec::new(), Utc::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// True when every processed row succeeded and nothing was skipped.
    pub fn all_succeeded(&self) -> bool {
        self.is_completed() && self.processed_rows == self.total_rows && self.failure_count == 0
    }

    /// Outcomes of rows that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &O> {
        self.per_row_outcomes.iter().filter(|o| !o.is_success())
    }

    /// Looks up the outcome of one row.
    pub fn outcome_for(&self, row_index: usize) -> Option<&O> {
        self.per_row_outcomes
            .binary_search_by_key(&row_index, |o| o.row_index())
            .ok()
            .map(|i| &self.per_row_outcomes[i])
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time).to_std().unwrap_or_default()
    }
}

impl<O: Serialize> BatchRunSummary<O> {
    /// Serializes the summary for export.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
