//! Engine configuration.
//!
//! Every section has a `Default`, consuming `with_*` builders and a
//! `validate()` that reports bad values as [`EngineError::Configuration`].
//! All sections round-trip through serde so hosts can keep them in JSON;
//! durations are written as whole milliseconds.

use crate::logging::LogConfig;
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration of the batch executor and the row validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Rows per batch; inputs smaller than this run sequentially
    pub batch_size: usize,
    /// Maximum batches evaluated at once
    pub max_concurrency: usize,
    /// Deadline for a single batch
    #[serde(with = "duration_ms")]
    pub batch_timeout: Duration,
    /// Rows between cooperative yields to the runtime
    pub yield_every: usize,
    /// Columns that never carry data (e.g. action buttons) and are skipped by
    /// row validation
    pub skipped_columns: HashSet<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrency: num_cpus::get().max(1),
            batch_timeout: Duration::from_secs(30),
            yield_every: 64,
            skipped_columns: HashSet::new(),
        }
    }
}

impl ExecutorConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_yield_every(mut self, rows: usize) -> Self {
        self.yield_every = rows;
        self
    }

    /// Adds a column that row validation should ignore.
    pub fn with_skipped_column(mut self, column: impl Into<String>) -> Self {
        self.skipped_columns.insert(column.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::configuration("batch_size must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(EngineError::configuration(
                "max_concurrency must be at least 1",
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(EngineError::configuration(
                "batch_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Per-call search options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Match ceiling; scanning stops once reached
    pub max_results: usize,
    /// Time budget for pattern matching in a single cell
    #[serde(with = "duration_ms")]
    pub pattern_timeout: Duration,
    /// Whether criteria may request regular-expression matching
    pub enable_regex: bool,
    /// Whether fuzzy matching is available
    pub enable_fuzzy: bool,
    /// Use fuzzy matching when the criterion does not ask for regex
    pub fuzzy_by_default: bool,
    /// Accepted dissimilarity, 0.0 (exact) to 1.0 (anything)
    pub fuzzy_tolerance: f64,
    /// Search hidden columns too
    pub include_hidden_columns: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 1000,
            pattern_timeout: Duration::from_millis(100),
            enable_regex: true,
            enable_fuzzy: false,
            fuzzy_by_default: false,
            fuzzy_tolerance: 0.3,
            include_hidden_columns: false,
        }
    }
}

impl SearchOptions {
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_pattern_timeout(mut self, timeout: Duration) -> Self {
        self.pattern_timeout = timeout;
        self
    }

    pub fn with_regex(mut self, enabled: bool) -> Self {
        self.enable_regex = enabled;
        self
    }

    /// Enables fuzzy matching as the default strategy with the given tolerance.
    pub fn with_fuzzy(mut self, tolerance: f64) -> Self {
        self.enable_fuzzy = true;
        self.fuzzy_by_default = true;
        self.fuzzy_tolerance = tolerance;
        self
    }

    pub fn with_hidden_columns(mut self, include: bool) -> Self {
        self.include_hidden_columns = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(EngineError::configuration("max_results must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_tolerance) {
            let tolerance = self.fuzzy_tolerance;
            return Err(EngineError::configuration(format!(
                "fuzzy_tolerance must be within 0.0..=1.0, got {tolerance}"
            )));
        }
        if self.pattern_timeout.is_zero() {
            return Err(EngineError::configuration(
                "pattern_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Search history and debounce settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained history entries
    pub capacity: usize,
    /// Delay applied to a request repeating the previous term
    #[serde(with = "duration_ms")]
    pub debounce_delay: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            debounce_delay: Duration::from_millis(300),
        }
    }
}

impl HistoryConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }
}

/// Top-level configuration of a [`GridEngine`](crate::engine::GridEngine).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executor: ExecutorConfig,
    pub search: SearchOptions,
    pub history: HistoryConfig,
    pub logging: LogConfig,
}

impl EngineConfig {
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.executor.validate()?;
        self.search.validate()
    }

    /// Parses a configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert!(config.max_concurrency >= 1);
        assert_eq!(config.batch_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_executor_rejects_zero_values() {
        assert!(ExecutorConfig::default()
            .with_batch_size(0)
            .validate()
            .is_err());
        assert!(ExecutorConfig::default()
            .with_max_concurrency(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_search_tolerance_range() {
        assert!(SearchOptions::default().with_fuzzy(0.2).validate().is_ok());
        let err = SearchOptions::default().with_fuzzy(1.5).validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_engine_config_from_json() {
        let config = EngineConfig::from_json(
            r#"{
                "executor": {"batch_size": 250, "batch_timeout": 1500, "skipped_columns": ["Actions"]},
                "search": {"max_results": 10, "pattern_timeout": 20},
                "history": {"capacity": 5, "debounce_delay": 50}
            }"#,
        )
        .unwrap();
        assert_eq!(config.executor.batch_size, 250);
        assert_eq!(config.executor.batch_timeout, Duration::from_millis(1500));
        assert!(config.executor.skipped_columns.contains("Actions"));
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.pattern_timeout, Duration::from_millis(20));
        assert_eq!(config.history.debounce_delay, Duration::from_millis(50));
        // unspecified fields fall back to defaults
        assert!(config.search.enable_regex);
    }

    #[test]
    fn test_engine_config_from_json_rejects_invalid() {
        let err = EngineConfig::from_json(r#"{"executor": {"batch_size": 0}}"#).unwrap_err();
        assert!(err.is_configuration());
    }
}
