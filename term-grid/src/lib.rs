//! # term-grid - Bulk rule evaluation for interactive data grids
//!
//! term-grid is the row-processing core underneath a tabular data control. It
//! evaluates user-defined rules across large in-memory row collections and
//! hands back ordered, aggregated results while the host stays responsive to
//! edits and keystrokes.
//!
//! ## Overview
//!
//! Three kinds of rules run through the same machinery:
//!
//! - **Validation rules**: required, pattern, e-mail, range, length and custom
//!   checks per cell, ANDed per row
//! - **Cross-row constraints**: uniqueness (single and composite), dependency
//!   and custom checks that see every row
//! - **Search**: literal, whole-word, regex or fuzzy matching per cell, capped
//!   at a maximum number of matches
//!
//! ## Quick Start
//!
//! ```rust
//! use term_grid::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let snapshot = RowSnapshot::with_visible_columns(
//!     vec![
//!         Row::new().with("id", "C1").with("email", "ada@example.com").with("age", 36),
//!         Row::new().with("id", "C1").with("email", "grace@").with("age", 210),
//!     ],
//!     ["id", "email", "age"],
//! )?;
//!
//! let engine = GridEngine::new(EngineConfig::default())?;
//! let cancellation = CancellationToken::new();
//!
//! let rows = engine
//!     .validate_rows(
//!         &snapshot,
//!         vec![
//!             RuleDefinition::required("id"),
//!             RuleDefinition::email("email"),
//!             RuleDefinition::range("age", Some(0.0), Some(130.0)),
//!         ],
//!         &cancellation,
//!     )
//!     .await?;
//! assert_eq!(rows.failure_count, 1);
//!
//! let cross = engine
//!     .validate_cross_row(
//!         &snapshot,
//!         vec![CrossRowConstraint::unique("unique_id", "id")],
//!         &cancellation,
//!     )
//!     .await?;
//! assert_eq!(cross.failure_count, 2);
//!
//! let found = engine
//!     .search(SearchCriterion::new("grace"), &snapshot, None, &cancellation)
//!     .await?;
//! assert_eq!(found.results().map(|r| r.len()), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution model
//!
//! - Inputs smaller than `batch_size` run sequentially; larger inputs are
//!   split into batches and up to `max_concurrency` batches run at once
//! - Results always come back ascending by row index
//! - Cancellation is cooperative and keeps the rows already processed
//! - A panicking rule or a slow regex only affects its own cell; a stuck batch
//!   only loses its own rows
//! - One bulk operation runs per engine at a time; validation is rejected
//!   with [`EngineError::Busy`](error::EngineError::Busy) while search queues
//!   and repeated search terms are debounced
//!
//! ## Architecture
//!
//! - **`core`**: snapshots, cell values, outcomes, the `RowWorker` trait and
//!   cancellation tokens
//! - **`executor`**: the bounded-concurrency batch executor
//! - **`validation`**: cell rules, row validation and cross-row constraints
//! - **`search`**: criteria, matchers, the search worker, history and debounce
//! - **`coordinator`**: single-flight admission and operation state
//! - **`engine`**: the `GridEngine` facade and its observer trait
//! - **`config`**, **`logging`**, **`error`**: the ambient pieces
//!
//! ## Logging
//!
//! The engine emits `tracing` spans and events; install a subscriber with
//! [`logging::setup::init_logging`] or your own.

pub mod config;
pub mod coordinator;
pub mod core;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod prelude;
pub mod search;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
