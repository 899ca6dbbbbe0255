//! Core data model shared by every pipeline.
//!
//! ## Overview
//!
//! - **[`RowSnapshot`]**: the read-only rows and column schema of one operation
//! - **[`RowWorker`]**: a rule set reduced to a per-row pure function
//! - **[`BatchRunSummary`]**: the ordered, aggregated outcome of a bulk run
//! - **[`CancellationToken`]**: cooperative cancellation with parent/child links
//!
//! ```text
//! RowSnapshot ──► BatchExecutor ──► RowWorker::evaluate (per row)
//!                      │
//!                      └──► BatchRunSummary<RowWorker::Outcome>
//! ```

mod cancellation;
mod outcome;
mod severity;
mod snapshot;
mod value;
mod worker;

pub use cancellation::CancellationToken;
pub use outcome::{
    BatchFault, BatchFaultKind, BatchRunSummary, CellOutcome, MatchOutcome, ProgressSnapshot,
    RowOutcome, RowResult, RunStatus,
};
pub use severity::Severity;
pub use snapshot::{ColumnDescriptor, RowSnapshot};
pub use value::{CellValue, Row};
pub use worker::RowWorker;

pub(crate) use worker::panic_message;
