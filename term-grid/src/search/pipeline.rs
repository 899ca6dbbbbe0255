//! Search as a row worker, plus the result set it assembles into.

use super::matcher::{build_matcher, CellMatcher, CellScan, SearchStrategy};
use super::SearchCriterion;
use crate::config::{duration_ms, SearchOptions};
use crate::core::{
    BatchFault, BatchRunSummary, CancellationToken, MatchOutcome, Row, RowResult, RowSnapshot,
    RowWorker, RunStatus,
};
use crate::executor::BatchExecutor;
use crate::logging::truncate_field;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Matches found in one row, column-major in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMatches {
    pub row_index: usize,
    pub matches: Vec<MatchOutcome>,
}

impl RowResult for RowMatches {
    fn row_index(&self) -> usize {
        self.row_index
    }

    fn is_success(&self) -> bool {
        !self.matches.is_empty()
    }

    fn weight(&self) -> usize {
        self.matches.len()
    }
}

/// Columns a criterion searches, in schema order.
///
/// Searchable columns that are visible (or any visibility with
/// `include_hidden_columns`), narrowed to the criterion's target columns when
/// it names some. Naming a column outside the schema is an error.
pub fn target_columns(
    snapshot: &RowSnapshot,
    criterion: &SearchCriterion,
    options: &SearchOptions,
) -> Result<Vec<String>> {
    if let Some(targets) = &criterion.target_columns {
        for column in targets {
            snapshot.require_column(column)?;
        }
    }
    Ok(snapshot
        .columns()
        .iter()
        .filter(|column| column.is_searchable)
        .filter(|column| column.is_visible || options.include_hidden_columns)
        .filter(|column| {
            criterion
                .target_columns
                .as_ref()
                .map_or(true, |targets| targets.contains(&column.name))
        })
        .map(|column| column.name.clone())
        .collect())
}

/// Applies one matcher to the target cells of each row.
#[derive(Debug)]
pub struct SearchWorker {
    matcher: Arc<dyn CellMatcher>,
    columns: Vec<String>,
    max_results: usize,
    pattern_timeouts: AtomicUsize,
    /// A row hit the ceiling with matches dropped or cells left unscanned
    cut_short: AtomicBool,
}

impl SearchWorker {
    /// Compiles the matcher and resolves target columns once for the run.
    pub fn new(
        snapshot: &RowSnapshot,
        criterion: &SearchCriterion,
        options: &SearchOptions,
    ) -> Result<Self> {
        criterion.validate()?;
        options.validate()?;
        Ok(Self {
            matcher: build_matcher(criterion, options)?,
            columns: target_columns(snapshot, criterion, options)?,
            max_results: options.max_results,
            pattern_timeouts: AtomicUsize::new(0),
            cut_short: AtomicBool::new(false),
        })
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.matcher.strategy()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cells that ran out of pattern time so far.
    pub fn pattern_timeouts(&self) -> usize {
        self.pattern_timeouts.load(Ordering::Relaxed)
    }
}

impl RowWorker for SearchWorker {
    type Outcome = RowMatches;

    fn name(&self) -> &str {
        "search"
    }

    fn evaluate(&self, row_index: usize, row: &Row) -> RowMatches {
        let mut matches = Vec::new();
        for (position, column) in self.columns.iter().enumerate() {
            let text = row.get(column).to_string();
            if text.is_empty() {
                continue;
            }
            match self.matcher.scan(&text) {
                CellScan::Matches(found) => {
                    matches.extend(found.into_iter().map(|m| MatchOutcome {
                        row_index,
                        column_name: column.clone(),
                        match_start: m.start,
                        match_length: m.length,
                        matched_text: m.text,
                    }));
                }
                CellScan::TimedOut => {
                    self.pattern_timeouts.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        row.index = row_index,
                        column = %column,
                        "Pattern exceeded its time budget; cell skipped"
                    );
                }
            }
            if matches.len() >= self.max_results {
                if matches.len() > self.max_results || position + 1 < self.columns.len() {
                    self.cut_short.store(true, Ordering::Relaxed);
                }
                matches.truncate(self.max_results);
                break;
            }
        }
        RowMatches {
            row_index,
            matches,
        }
    }

    fn fault_outcome(&self, row_index: usize, _message: &str) -> RowMatches {
        RowMatches {
            row_index,
            matches: Vec::new(),
        }
    }

    fn outcome_budget(&self) -> Option<usize> {
        Some(self.max_results)
    }
}

/// Outcome of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultSet {
    pub term: String,
    pub strategy: SearchStrategy,
    /// Row-major, then column-major in schema order
    pub matches: Vec<MatchOutcome>,
    pub rows_scanned: usize,
    pub total_rows: usize,
    /// The match ceiling dropped matches or stopped the scan before every
    /// target cell was examined
    pub truncated: bool,
    pub pattern_timeouts: usize,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<BatchFault>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl SearchResultSet {
    /// Flattens a finished run, capping matches at `max_results`.
    ///
    /// Exactly `max_results` matches with every target cell scanned is not
    /// truncated.
    pub fn from_run(
        criterion: &SearchCriterion,
        worker: &SearchWorker,
        summary: BatchRunSummary<RowMatches>,
    ) -> Self {
        let duration = summary.duration();
        let mut matches: Vec<MatchOutcome> = summary
            .per_row_outcomes
            .into_iter()
            .flat_map(|row| row.matches)
            .collect();
        let truncated = matches.len() > worker.max_results
            || (matches.len() == worker.max_results
                && (summary.processed_rows < summary.total_rows
                    || worker.cut_short.load(Ordering::Relaxed)));
        matches.truncate(worker.max_results);

        Self {
            term: criterion.term.clone(),
            strategy: worker.strategy(),
            matches,
            rows_scanned: summary.processed_rows,
            total_rows: summary.total_rows,
            truncated,
            pattern_timeouts: worker.pattern_timeouts(),
            status: summary.status,
            faults: summary.faults,
            duration,
        }
    }

    /// A result set for a run that never produced a summary.
    pub fn faulted(
        criterion: &SearchCriterion,
        strategy: SearchStrategy,
        total_rows: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            term: criterion.term.clone(),
            strategy,
            matches: Vec::new(),
            rows_scanned: 0,
            total_rows,
            truncated: false,
            pattern_timeouts: 0,
            status: RunStatus::Faulted(message.into()),
            faults: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs a search over `snapshot` with `executor`.
///
/// Input problems (blank term, bad pattern, unknown target column, empty
/// schema) are returned as errors before any row is scanned.
#[instrument(skip_all, fields(
    search.term = %truncate_field(&criterion.term, executor.log_config().max_field_length),
    search.regex = criterion.regex,
    rows.total = snapshot.len()
))]
pub async fn run_search(
    executor: &BatchExecutor,
    snapshot: &RowSnapshot,
    criterion: &SearchCriterion,
    options: &SearchOptions,
    cancellation: &CancellationToken,
) -> Result<SearchResultSet> {
    snapshot.ensure_initialized()?;
    let worker = Arc::new(SearchWorker::new(snapshot, criterion, options)?);
    let summary = executor
        .execute(snapshot, Arc::clone(&worker), cancellation)
        .await;
    let results = SearchResultSet::from_run(criterion, &worker, summary);

    info!(
        search.strategy = %results.strategy,
        search.matches = results.len(),
        search.truncated = results.truncated,
        search.pattern_timeouts = results.pattern_timeouts,
        rows.scanned = results.rows_scanned,
        "Search finished"
    );
    Ok(results)
}
