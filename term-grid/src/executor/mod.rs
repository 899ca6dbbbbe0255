//! Bounded-concurrency batch execution.
//!
//! The [`BatchExecutor`] runs a [`RowWorker`] over every row of a
//! [`RowSnapshot`]:
//!
//! - inputs smaller than one batch run sequentially, row by row;
//! - larger inputs are cut into contiguous batches and up to
//!   `max_concurrency` of them run at once as tokio tasks;
//! - each batch gets a child cancellation token and its own deadline, so a
//!   stuck batch only loses its own remaining rows;
//! - finished batches are merged by a single owner and the outcomes come back
//!   ascending by row index, whatever order the batches completed in.
//!
//! ```rust
//! use std::sync::Arc;
//! use term_grid::config::ExecutorConfig;
//! use term_grid::core::{CancellationToken, Row, RowSnapshot};
//! use term_grid::executor::BatchExecutor;
//! use term_grid::validation::{RowValidator, RuleDefinition};
//!
//! # async fn example() -> term_grid::prelude::Result<()> {
//! let snapshot = RowSnapshot::with_visible_columns(
//!     vec![Row::new().with("id", "A"), Row::new()],
//!     ["id"],
//! )?;
//! let validator = RowValidator::new(&snapshot, vec![RuleDefinition::required("id")], Default::default())?;
//!
//! let executor = BatchExecutor::new(ExecutorConfig::default())
//!     .on_progress(|p| println!("{:.0}%", p.percentage));
//! let summary = executor
//!     .execute(&snapshot, Arc::new(validator), &CancellationToken::new())
//!     .await;
//! assert_eq!(summary.failure_count, 1);
//! # Ok(())
//! # }
//! ```

mod batch;

use crate::config::ExecutorConfig;
use crate::core::{
    BatchFault, BatchFaultKind, BatchRunSummary, CancellationToken, ProgressSnapshot, RowResult,
    RowSnapshot, RowWorker, RunStatus,
};
use crate::logging::LogConfig;
use crate::{log_batch_op, perf_debug};
use batch::{partition, BatchJob, BatchReport, BatchStop};
use chrono::Utc;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Type alias for progress callback function.
pub type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Runs row workers over snapshots in batches.
#[derive(Clone)]
pub struct BatchExecutor {
    config: ExecutorConfig,
    log: LogConfig,
    on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("config", &self.config)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl BatchExecutor {
    /// Creates an executor. A zero `batch_size` or `max_concurrency` is
    /// raised to 1.
    pub fn new(mut config: ExecutorConfig) -> Self {
        config.batch_size = config.batch_size.max(1);
        config.max_concurrency = config.max_concurrency.max(1);
        Self {
            config,
            log: LogConfig::default(),
            on_progress: None,
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Sets a callback invoked after every completed batch.
    ///
    /// Within one run `processed` never decreases.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Sets an already shared progress callback.
    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.on_progress = callback;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log
    }

    /// Evaluates `worker` against every row of `snapshot`.
    ///
    /// Never fails: cancellation, batch timeouts and panicking rows are all
    /// reported inside the returned summary.
    #[instrument(skip_all, fields(
        worker = %worker.name(),
        rows.total = snapshot.len(),
        batch.size = self.config.batch_size,
        batch.max_concurrency = self.config.max_concurrency
    ))]
    pub async fn execute<W: RowWorker>(
        &self,
        snapshot: &RowSnapshot,
        worker: Arc<W>,
        cancellation: &CancellationToken,
    ) -> BatchRunSummary<W::Outcome> {
        let total = snapshot.len();
        let summary = if total < self.config.batch_size {
            self.run_sequential(snapshot, worker, cancellation).await
        } else {
            self.run_parallel(snapshot, worker, cancellation).await
        };

        info!(
            rows.total = summary.total_rows,
            rows.processed = summary.processed_rows,
            rows.succeeded = summary.success_count,
            rows.failed = summary.failure_count,
            batch.faults = summary.faults.len(),
            run.status = ?summary.status,
            run.duration_ms = summary.duration().as_millis() as u64,
            "Batch run finished"
        );
        summary
    }

    async fn run_sequential<W: RowWorker>(
        &self,
        snapshot: &RowSnapshot,
        worker: Arc<W>,
        cancellation: &CancellationToken,
    ) -> BatchRunSummary<W::Outcome> {
        let start_time = Utc::now();
        let total = snapshot.len();
        perf_debug!(self.log, rows.total = total, "Running rows sequentially");

        let budget = worker.outcome_budget();
        let name = worker.name().to_string();
        let report = self
            .job(worker, snapshot, 0, 0..total, cancellation.child_token(), budget)
            .run()
            .await;

        let mut merge = MergeState::new(total, 1, budget);
        merge.absorb(report);
        self.report_progress(&name, &merge);
        merge.finish(cancellation, start_time)
    }

    async fn run_parallel<W: RowWorker>(
        &self,
        snapshot: &RowSnapshot,
        worker: Arc<W>,
        cancellation: &CancellationToken,
    ) -> BatchRunSummary<W::Outcome> {
        let start_time = Utc::now();
        let total = snapshot.len();
        let batches = partition(total, self.config.batch_size);
        let budget = worker.outcome_budget();
        let name = worker.name().to_string();
        debug!(batch.count = batches.len(), "Running rows in parallel batches");

        let gate = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (usize, Range<usize>)> = HashMap::new();
        let mut merge = MergeState::new(total, batches.len(), budget);

        'admission: for (batch_index, range) in batches.into_iter().enumerate() {
            // Admit the next batch once a slot frees up, merging finished
            // batches while we wait so progress is reported promptly.
            let permit = loop {
                if cancellation.is_cancelled() || merge.budget_reached {
                    break 'admission;
                }
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => break 'admission,
                    Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                        self.settle(joined, &mut in_flight, &mut merge, &name);
                    }
                    permit = Arc::clone(&gate).acquire_owned() => match permit {
                        Ok(permit) => break permit,
                        Err(_) => break 'admission,
                    },
                }
            };

            log_batch_op!(
                self.log,
                batch.index = batch_index,
                batch.start = range.start,
                batch.end = range.end,
                "Admitting batch"
            );
            let job = self.job(
                Arc::clone(&worker),
                snapshot,
                batch_index,
                range.clone(),
                cancellation.child_token(),
                budget,
            );
            let handle = tasks.spawn(async move {
                let report = job.run().await;
                drop(permit);
                report
            });
            in_flight.insert(handle.id(), (batch_index, range));
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            self.settle(joined, &mut in_flight, &mut merge, &name);
        }

        merge.finish(cancellation, start_time)
    }

    fn job<W: RowWorker>(
        &self,
        worker: Arc<W>,
        snapshot: &RowSnapshot,
        batch_index: usize,
        range: Range<usize>,
        cancellation: CancellationToken,
        budget: Option<usize>,
    ) -> BatchJob<W> {
        BatchJob {
            worker,
            snapshot: snapshot.clone(),
            batch_index,
            range,
            cancellation,
            deadline: Instant::now() + self.config.batch_timeout,
            budget,
            yield_every: self.config.yield_every,
            log: self.log.clone(),
        }
    }

    /// Folds one finished batch task into the merge state.
    fn settle<O: RowResult>(
        &self,
        joined: Result<(tokio::task::Id, BatchReport<O>), JoinError>,
        in_flight: &mut HashMap<tokio::task::Id, (usize, Range<usize>)>,
        merge: &mut MergeState<O>,
        name: &str,
    ) {
        match joined {
            Ok((id, report)) => {
                in_flight.remove(&id);
                log_batch_op!(
                    self.log,
                    batch.index = report.batch_index,
                    batch.rows = report.outcomes.len(),
                    batch.stop = ?report.stop,
                    "Batch settled"
                );
                merge.absorb(report);
            }
            Err(err) => {
                let Some((batch_index, range)) = in_flight.remove(&err.id()) else {
                    return;
                };
                let message = if err.is_panic() {
                    crate::core::panic_message(err.into_panic().as_ref())
                } else {
                    "batch task was aborted".to_string()
                };
                warn!(
                    batch.index = batch_index,
                    batch.start = range.start,
                    batch.end = range.end,
                    error = %message,
                    "Batch task failed; its rows are left unprocessed"
                );
                merge.faults.push(BatchFault {
                    batch_index,
                    start_row: range.start,
                    end_row: range.end,
                    unprocessed_rows: range.len(),
                    kind: BatchFaultKind::Panicked(message),
                });
                merge.batches_settled += 1;
            }
        }
        self.report_progress(name, merge);
    }

    fn report_progress<O>(&self, name: &str, merge: &MergeState<O>) {
        if let Some(callback) = &self.on_progress {
            callback(ProgressSnapshot::new(
                merge.processed,
                merge.total,
                format!(
                    "{name}: {} of {} batches",
                    merge.batches_settled, merge.batch_count
                ),
            ));
        }
    }
}

/// Accumulator owned by the executor while batches settle.
struct MergeState<O> {
    total: usize,
    batch_count: usize,
    batches_settled: usize,
    processed: usize,
    budget: Option<usize>,
    budget_reached: bool,
    cancelled: bool,
    outcomes: Vec<O>,
    faults: Vec<BatchFault>,
}

impl<O: RowResult> MergeState<O> {
    fn new(total: usize, batch_count: usize, budget: Option<usize>) -> Self {
        Self {
            total,
            batch_count,
            batches_settled: 0,
            processed: 0,
            budget,
            budget_reached: false,
            cancelled: false,
            outcomes: Vec::with_capacity(total),
            faults: Vec::new(),
        }
    }

    fn absorb(&mut self, report: BatchReport<O>) {
        self.batches_settled += 1;
        self.processed += report.outcomes.len();
        match report.stop {
            BatchStop::Finished => {}
            BatchStop::Cancelled => self.cancelled = true,
            // Later batches can only add outcomes beyond the budget.
            BatchStop::BudgetReached => self.budget_reached = true,
            BatchStop::TimedOut => {
                warn!(
                    batch.index = report.batch_index,
                    batch.unprocessed = report.unprocessed_rows(),
                    "Batch timed out; remaining rows left unprocessed"
                );
                self.faults.push(BatchFault {
                    batch_index: report.batch_index,
                    start_row: report.range.start,
                    end_row: report.range.end,
                    unprocessed_rows: report.unprocessed_rows(),
                    kind: BatchFaultKind::Timeout,
                });
            }
        }
        self.outcomes.extend(report.outcomes);
    }

    fn finish(
        mut self,
        cancellation: &CancellationToken,
        start_time: chrono::DateTime<Utc>,
    ) -> BatchRunSummary<O> {
        let status = if self.cancelled || (cancellation.is_cancelled() && self.processed < self.total)
        {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        self.outcomes.sort_by_key(|o| o.row_index());
        if let Some(budget) = self.budget {
            let mut spent = 0usize;
            let keep = self
                .outcomes
                .iter()
                .position(|o| {
                    spent += o.weight();
                    spent >= budget
                })
                .map_or(self.outcomes.len(), |i| i + 1);
            self.outcomes.truncate(keep);
        }
        self.faults.sort_by_key(|f| f.batch_index);

        BatchRunSummary::from_outcomes(self.total, self.outcomes, status, self.faults, start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellOutcome, Row, RowOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct EvenRowsValid {
        calls: AtomicUsize,
    }

    impl RowWorker for EvenRowsValid {
        type Outcome = RowOutcome;

        fn name(&self) -> &str {
            "even_rows_valid"
        }

        fn evaluate(&self, row_index: usize, _row: &Row) -> RowOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let cell = if row_index % 2 == 0 {
                CellOutcome::valid("n", "custom")
            } else {
                CellOutcome::invalid("n", "custom", "odd")
            };
            RowOutcome::from_cells(row_index, vec![cell])
        }

        fn fault_outcome(&self, row_index: usize, message: &str) -> RowOutcome {
            RowOutcome::from_cells(row_index, vec![CellOutcome::invalid("n", "custom", message)])
        }
    }

    fn snapshot(rows: usize) -> RowSnapshot {
        RowSnapshot::with_visible_columns(vec![Row::new(); rows], ["n"]).unwrap()
    }

    fn executor(batch_size: usize, max_concurrency: usize) -> BatchExecutor {
        BatchExecutor::new(
            ExecutorConfig::default()
                .with_batch_size(batch_size)
                .with_max_concurrency(max_concurrency),
        )
    }

    #[tokio::test]
    async fn test_sequential_path_for_small_input() {
        let worker = Arc::new(EvenRowsValid::default());
        let summary = executor(100, 4)
            .execute(&snapshot(7), Arc::clone(&worker), &CancellationToken::new())
            .await;

        assert!(summary.is_completed());
        assert_eq!(summary.processed_rows, 7);
        assert_eq!(summary.success_count, 4);
        assert_eq!(summary.failure_count, 3);
        assert_eq!(worker.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_path_preserves_order() {
        let summary = executor(10, 3)
            .execute(&snapshot(95), Arc::new(EvenRowsValid::default()), &CancellationToken::new())
            .await;

        assert_eq!(summary.processed_rows, 95);
        let indices: Vec<_> = summary.per_row_outcomes.iter().map(|o| o.row_index).collect();
        assert_eq!(indices, (0..95).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_final() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let summary = executor(10, 2)
            .on_progress(move |p| sink.lock().unwrap().push(p.processed))
            .execute(&snapshot(45), Arc::new(EvenRowsValid::default()), &CancellationToken::new())
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5, "one report per batch");
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), summary.processed_rows);
    }

    #[tokio::test]
    async fn test_zero_sizes_still_process_every_row() {
        let executor = executor(0, 0);
        assert_eq!(executor.config().batch_size, 1);
        assert_eq!(executor.config().max_concurrency, 1);

        let worker = Arc::new(EvenRowsValid::default());
        let summary = executor
            .execute(&snapshot(10), Arc::clone(&worker), &CancellationToken::new())
            .await;

        assert!(summary.is_completed());
        assert_eq!(summary.processed_rows, 10);
        assert_eq!(summary.per_row_outcomes.len(), 10);
        assert_eq!(worker.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_keeps_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let summary = executor(10, 2)
            .execute(&snapshot(50), Arc::new(EvenRowsValid::default()), &token)
            .await;

        assert!(summary.is_cancelled());
        assert_eq!(summary.processed_rows, 0);
        assert_eq!(summary.total_rows, 50);
    }

    #[derive(Debug)]
    struct SlowRows;

    impl RowWorker for SlowRows {
        type Outcome = RowOutcome;

        fn name(&self) -> &str {
            "slow_rows"
        }

        fn evaluate(&self, row_index: usize, _row: &Row) -> RowOutcome {
            std::thread::sleep(Duration::from_millis(5));
            RowOutcome::from_cells(row_index, vec![])
        }

        fn fault_outcome(&self, row_index: usize, _message: &str) -> RowOutcome {
            RowOutcome::from_cells(row_index, vec![])
        }
    }

    #[tokio::test]
    async fn test_batch_timeout_records_faults() {
        let executor = BatchExecutor::new(
            ExecutorConfig::default()
                .with_batch_size(5)
                .with_max_concurrency(2)
                .with_batch_timeout(Duration::from_millis(1)),
        );
        let summary = executor
            .execute(&snapshot(10), Arc::new(SlowRows), &CancellationToken::new())
            .await;

        assert!(summary.is_completed());
        assert_eq!(summary.faults.len(), 2);
        assert!(summary
            .faults
            .iter()
            .all(|f| f.kind == BatchFaultKind::Timeout));
        let unprocessed: usize = summary.faults.iter().map(|f| f.unprocessed_rows).sum();
        assert_eq!(summary.processed_rows + unprocessed, 10);
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let summary = executor(10, 2)
            .execute(&snapshot(0), Arc::new(EvenRowsValid::default()), &CancellationToken::new())
            .await;
        assert!(summary.is_completed());
        assert_eq!(summary.processed_rows, 0);
        assert!(summary.all_succeeded());
    }
}
