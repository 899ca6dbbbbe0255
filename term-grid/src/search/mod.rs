//! Search pipeline.
//!
//! A [`SearchCriterion`] is turned into one [`CellMatcher`] per run (regex,
//! fuzzy or standard) and applied by a [`SearchWorker`] through the batch
//! executor. Results come back row-major, then column-major, capped at
//! `max_results`; regex cells that overrun their time budget are skipped and
//! counted.
//!
//! The engine layers a [`SearchHistory`] and a [`Debouncer`] on top so that
//! keystroke-driven searches coalesce.
//!
//! ```rust
//! use term_grid::config::{ExecutorConfig, SearchOptions};
//! use term_grid::core::{CancellationToken, Row, RowSnapshot};
//! use term_grid::executor::BatchExecutor;
//! use term_grid::search::{run_search, SearchCriterion};
//!
//! # async fn example() -> term_grid::prelude::Result<()> {
//! let snapshot = RowSnapshot::with_visible_columns(
//!     vec![Row::new().with("name", "Ada Lovelace"), Row::new().with("name", "Grace Hopper")],
//!     ["name"],
//! )?;
//! let results = run_search(
//!     &BatchExecutor::new(ExecutorConfig::default()),
//!     &snapshot,
//!     &SearchCriterion::new("hopper"),
//!     &SearchOptions::default(),
//!     &CancellationToken::new(),
//! )
//! .await?;
//! assert_eq!(results.matches[0].row_index, 1);
//! assert_eq!(results.matches[0].match_start, 6);
//! # Ok(())
//! # }
//! ```

mod criterion;
mod debounce;
mod history;
mod levenshtein;
mod matcher;
mod pattern;
mod pipeline;

pub use criterion::SearchCriterion;
pub use debounce::{DebounceDecision, Debouncer};
pub use history::{HistoryEntry, SearchHistory};
pub use levenshtein::{levenshtein, similarity};
pub use matcher::{
    build_matcher, CellMatcher, CellScan, FuzzyMatcher, RegexMatcher, SearchStrategy,
    StandardMatcher, TextMatch,
};
pub use pattern::{compile_pattern, validate_pattern, MAX_PATTERN_LENGTH};
pub use pipeline::{run_search, target_columns, RowMatches, SearchResultSet, SearchWorker};
