//! The engine facade held by the host grid.
//!
//! [`GridEngine`] ties the pieces together: it validates inputs up front,
//! takes the coordinator's slot, runs the matching worker through the batch
//! executor and reports progress, completion and history changes to its
//! [`EngineObserver`]s.
//!
//! ```rust
//! use term_grid::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = GridEngine::new(EngineConfig::default())?;
//! let snapshot = RowSnapshot::with_visible_columns(
//!     vec![Row::new().with("id", "A"), Row::new().with("id", "A")],
//!     ["id"],
//! )?;
//!
//! let summary = engine
//!     .validate_cross_row(
//!         &snapshot,
//!         vec![CrossRowConstraint::unique("unique_id", "id")],
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! assert_eq!(summary.failure_count, 2);
//!
//! let outcome = engine
//!     .search(
//!         SearchCriterion::new("a"),
//!         &snapshot,
//!         None,
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! assert_eq!(outcome.results().map(|r| r.len()), Some(2));
//! assert_eq!(engine.history().len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::config::{EngineConfig, SearchOptions};
use crate::coordinator::{OperationCoordinator, OperationGuard, OperationKind, OperationState};
use crate::core::{
    BatchRunSummary, CancellationToken, ProgressSnapshot, RowResult, RowSnapshot, RowWorker,
    RunStatus,
};
use crate::executor::BatchExecutor;
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::search::{
    DebounceDecision, Debouncer, HistoryEntry, SearchCriterion, SearchHistory, SearchResultSet,
    SearchWorker,
};
use crate::validation::{
    CrossRowConstraint, CrossRowSummary, CrossRowValidator, RowValidationSummary, RowValidator,
    RuleDefinition,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

/// Receives engine notifications. Every method defaults to a no-op.
///
/// Callbacks run on the task executing the operation and should return
/// quickly.
pub trait EngineObserver: Send + Sync {
    /// After every completed batch; `processed` never decreases within an
    /// operation.
    fn on_progress(&self, _progress: &ProgressSnapshot) {}

    /// Once per admitted operation, whatever its status.
    fn on_completed(&self, _event: &CompletionEvent) {}

    /// Whenever the search history changes; entries are most recent first.
    fn on_history_changed(&self, _history: &[HistoryEntry]) {}
}

/// Final notification of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub operation: OperationKind,
    pub status: RunStatus,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Number of matches, for searches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl CompletionEvent {
    fn from_summary<O: RowResult>(operation: OperationKind, summary: &BatchRunSummary<O>) -> Self {
        Self {
            operation,
            status: summary.status.clone(),
            total_rows: summary.total_rows,
            processed_rows: summary.processed_rows,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            match_count: None,
            duration_ms: millis(summary.duration()),
            completed_at: Utc::now(),
        }
    }

    fn from_search(results: &SearchResultSet) -> Self {
        Self {
            operation: OperationKind::Search,
            status: results.status.clone(),
            total_rows: results.total_rows,
            processed_rows: results.rows_scanned,
            success_count: results.rows_scanned,
            failure_count: 0,
            match_count: Some(results.len()),
            duration_ms: millis(results.duration),
            completed_at: Utc::now(),
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

/// Result of [`GridEngine::search`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(SearchResultSet),
    /// A later request for the same term replaced this one during the
    /// debounce window; nothing ran
    Superseded,
}

impl SearchOutcome {
    pub fn results(&self) -> Option<&SearchResultSet> {
        match self {
            SearchOutcome::Completed(results) => Some(results),
            SearchOutcome::Superseded => None,
        }
    }

    pub fn into_results(self) -> Option<SearchResultSet> {
        match self {
            SearchOutcome::Completed(results) => Some(results),
            SearchOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, SearchOutcome::Superseded)
    }
}

/// Bulk rule-evaluation engine for one grid.
pub struct GridEngine {
    config: EngineConfig,
    coordinator: OperationCoordinator,
    history: Mutex<SearchHistory>,
    debouncer: Debouncer,
    observers: Vec<Arc<dyn EngineObserver>>,
}

impl fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GridEngine {
    /// Creates an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: Mutex::new(SearchHistory::new(config.history.capacity)),
            debouncer: Debouncer::new(config.history.debounce_delay),
            coordinator: OperationCoordinator::new(),
            observers: Vec::new(),
            config,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the cell rules over every row.
    ///
    /// Fails with `Busy` instead of waiting when another operation runs.
    #[instrument(skip_all, fields(
        operation.kind = "row_validation",
        rows.total = snapshot.len(),
        rules.count = rules.len()
    ))]
    pub async fn validate_rows(
        &self,
        snapshot: &RowSnapshot,
        rules: Vec<RuleDefinition>,
        cancellation: &CancellationToken,
    ) -> Result<RowValidationSummary> {
        snapshot.ensure_initialized()?;
        let validator = RowValidator::new(
            snapshot,
            rules,
            self.config.executor.skipped_columns.clone(),
        )?;
        let guard = self
            .coordinator
            .try_begin(OperationKind::RowValidation, cancellation)?;

        let summary = self.run_worker(&guard, snapshot, Arc::new(validator)).await;
        guard.finish(&summary.status);
        self.notify_completed(&CompletionEvent::from_summary(
            OperationKind::RowValidation,
            &summary,
        ));
        Ok(summary)
    }

    /// Runs cross-row constraints over every row.
    ///
    /// Fails with `Busy` instead of waiting when another operation runs.
    #[instrument(skip_all, fields(
        operation.kind = "cross_row_validation",
        rows.total = snapshot.len(),
        constraints.count = constraints.len()
    ))]
    pub async fn validate_cross_row(
        &self,
        snapshot: &RowSnapshot,
        constraints: Vec<CrossRowConstraint>,
        cancellation: &CancellationToken,
    ) -> Result<CrossRowSummary> {
        snapshot.ensure_initialized()?;
        let validator = CrossRowValidator::new(snapshot, constraints)?;
        let guard = self
            .coordinator
            .try_begin(OperationKind::CrossRowValidation, cancellation)?;

        let summary = self.run_worker(&guard, snapshot, Arc::new(validator)).await;
        guard.finish(&summary.status);
        self.notify_completed(&CompletionEvent::from_summary(
            OperationKind::CrossRowValidation,
            &summary,
        ));
        Ok(summary)
    }

    /// Searches the snapshot.
    ///
    /// `options` of `None` uses the engine's configured search options.
    /// Repeating the previous term is debounced and may resolve as
    /// [`SearchOutcome::Superseded`]. Otherwise the search waits for any
    /// running operation to finish before it starts.
    #[instrument(skip_all, fields(
        operation.kind = "search",
        search.term = %truncate_field(&criterion.term, self.config.logging.max_field_length),
        rows.total = snapshot.len()
    ))]
    pub async fn search(
        &self,
        criterion: SearchCriterion,
        snapshot: &RowSnapshot,
        options: Option<&SearchOptions>,
        cancellation: &CancellationToken,
    ) -> Result<SearchOutcome> {
        self.ensure_live()?;
        snapshot.ensure_initialized()?;
        let options = options.unwrap_or(&self.config.search);
        let worker = Arc::new(SearchWorker::new(snapshot, &criterion, options)?);

        if self.debouncer.admit(&criterion.term).await == DebounceDecision::Superseded {
            return Ok(SearchOutcome::Superseded);
        }
        self.ensure_live()?;

        let entries = {
            let mut history = self.history_lock();
            history.record(criterion.clone());
            history.entries()
        };
        self.notify_history(&entries);

        let guard = self
            .coordinator
            .begin(OperationKind::Search, cancellation)
            .await?;
        let strategy = worker.strategy();
        let results = match guard
            .supervise(self.executor().execute(snapshot, Arc::clone(&worker), guard.token()))
            .await
        {
            Ok(summary) => SearchResultSet::from_run(&criterion, &worker, summary),
            Err(message) => {
                error!(operation.kind = "search", error = %message, "Operation faulted");
                SearchResultSet::faulted(&criterion, strategy, snapshot.len(), message)
            }
        };
        guard.finish(&results.status);

        let entries = {
            let mut history = self.history_lock();
            history.enrich(&criterion.term, results.len(), results.duration);
            history.entries()
        };
        self.notify_history(&entries);
        self.notify_completed(&CompletionEvent::from_search(&results));

        info!(
            search.strategy = %results.strategy,
            search.matches = results.len(),
            search.truncated = results.truncated,
            search.pattern_timeouts = results.pattern_timeouts,
            "Search finished"
        );
        Ok(SearchOutcome::Completed(results))
    }

    /// Cancels the running operation, if any.
    pub fn cancel(&self) {
        self.coordinator.cancel();
    }

    pub fn state(&self) -> OperationState {
        self.coordinator.state()
    }

    /// Receiver observing coordinator state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<OperationState> {
        self.coordinator.subscribe()
    }

    /// Recent searches, most recent first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history_lock().entries()
    }

    pub fn clear_history(&self) {
        self.history_lock().clear();
        self.notify_history(&[]);
    }

    pub fn is_disposed(&self) -> bool {
        self.coordinator.is_disposed()
    }

    /// Cancels and awaits the running operation, then drops pending debounced
    /// searches and the history. Every later call fails with `Disposed`.
    pub async fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.coordinator.dispose().await;
        self.debouncer.reset();
        self.history_lock().clear();
        self.notify_history(&[]);
        debug!("Grid engine disposed");
    }

    async fn run_worker<W: RowWorker>(
        &self,
        guard: &OperationGuard<'_>,
        snapshot: &RowSnapshot,
        worker: Arc<W>,
    ) -> BatchRunSummary<W::Outcome> {
        let executor = self.executor();
        match guard
            .supervise(executor.execute(snapshot, worker, guard.token()))
            .await
        {
            Ok(summary) => summary,
            Err(message) => {
                error!(
                    operation.kind = %guard.kind(),
                    error = %message,
                    "Operation faulted"
                );
                BatchRunSummary::empty(snapshot.len(), RunStatus::Faulted(message))
            }
        }
    }

    /// Executor forwarding progress to the observers.
    fn executor(&self) -> BatchExecutor {
        let executor = BatchExecutor::new(self.config.executor.clone())
            .with_log_config(self.config.logging.clone());
        if self.observers.is_empty() {
            return executor;
        }
        let observers = self.observers.clone();
        executor.on_progress(move |progress| {
            for observer in &observers {
                observer.on_progress(&progress);
            }
        })
    }

    fn notify_completed(&self, event: &CompletionEvent) {
        for observer in &self.observers {
            observer.on_completed(event);
        }
    }

    fn notify_history(&self, entries: &[HistoryEntry]) {
        for observer in &self.observers {
            observer.on_history_changed(entries);
        }
    }

    fn history_lock(&self) -> MutexGuard<'_, SearchHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }
}
