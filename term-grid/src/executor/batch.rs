//! Evaluation of a single batch of rows.

use crate::core::{panic_message, CancellationToken, RowResult, RowSnapshot, RowWorker};
use crate::log_row_detail;
use crate::logging::LogConfig;
use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::warn;

/// Why a batch stopped evaluating rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchStop {
    /// Every row in the range was evaluated
    Finished,
    /// The batch token was cancelled before the range was exhausted
    Cancelled,
    /// The batch deadline passed before the range was exhausted
    TimedOut,
    /// The worker's outcome budget was reached inside this batch
    BudgetReached,
}

/// What a batch hands back to the merging owner.
#[derive(Debug)]
pub(crate) struct BatchReport<O> {
    pub batch_index: usize,
    pub range: Range<usize>,
    pub outcomes: Vec<O>,
    pub stop: BatchStop,
}

impl<O> BatchReport<O> {
    pub fn unprocessed_rows(&self) -> usize {
        self.range.len() - self.outcomes.len()
    }
}

/// Everything a batch needs, owned so it can move into a spawned task.
pub(crate) struct BatchJob<W> {
    pub worker: Arc<W>,
    pub snapshot: RowSnapshot,
    pub batch_index: usize,
    pub range: Range<usize>,
    pub cancellation: CancellationToken,
    pub deadline: Instant,
    pub budget: Option<usize>,
    pub yield_every: usize,
    pub log: LogConfig,
}

impl<W: RowWorker> BatchJob<W> {
    /// Evaluates the rows of the batch in index order.
    ///
    /// Cancellation and the deadline are checked before every row. A row whose
    /// evaluation panics is recorded through [`RowWorker::fault_outcome`] and
    /// the batch carries on with the next row.
    pub async fn run(self) -> BatchReport<W::Outcome> {
        let mut outcomes = Vec::with_capacity(self.range.len());
        let mut spent = 0usize;
        let mut stop = BatchStop::Finished;

        for (offset, row_index) in self.range.clone().enumerate() {
            if self.cancellation.is_cancelled() {
                stop = BatchStop::Cancelled;
                break;
            }
            if Instant::now() >= self.deadline {
                stop = BatchStop::TimedOut;
                break;
            }

            let row = &self.snapshot.rows()[row_index];
            let worker = &self.worker;
            let outcome = match catch_unwind(AssertUnwindSafe(|| worker.evaluate(row_index, row)))
            {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        worker = %worker.name(),
                        row.index = row_index,
                        error = %message,
                        "Row evaluation panicked"
                    );
                    worker.fault_outcome(row_index, &format!("Rule evaluation failed: {message}"))
                }
            };

            log_row_detail!(
                self.log,
                worker = %worker.name(),
                row.index = row_index,
                row.success = outcome.is_success(),
                "Row evaluated"
            );
            spent += outcome.weight();
            outcomes.push(outcome);

            if self.budget.is_some_and(|budget| spent >= budget) {
                stop = BatchStop::BudgetReached;
                break;
            }
            if self.yield_every > 0 && (offset + 1) % self.yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        BatchReport {
            batch_index: self.batch_index,
            range: self.range,
            outcomes,
            stop,
        }
    }
}

/// Splits `0..total` into contiguous ranges of at most `batch_size` rows.
pub(crate) fn partition(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}
