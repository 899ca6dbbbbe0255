//! Prelude for commonly used types and traits in term-grid.

pub use crate::config::{EngineConfig, ExecutorConfig, HistoryConfig, SearchOptions};
pub use crate::core::{
    BatchRunSummary, CancellationToken, CellValue, ColumnDescriptor, ProgressSnapshot, Row,
    RowSnapshot, RunStatus, Severity,
};
pub use crate::engine::{CompletionEvent, EngineObserver, GridEngine, SearchOutcome};
pub use crate::error::{EngineError, Result};
pub use crate::logging::LogConfig;
pub use crate::search::SearchCriterion;
pub use crate::validation::{CrossRowConstraint, RuleDefinition};
