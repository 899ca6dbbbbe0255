//! Logging utilities and configuration for term-grid.
//!
//! Row evaluation runs in tight loops, so everything here is about keeping
//! structured logging cheap when it is switched off.

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Logging configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base log level for engine components
    #[serde(with = "level_name")]
    pub base_level: Level,
    /// Whether to log individual row and cell outcomes
    pub log_row_details: bool,
    /// Whether to log batch scheduling (admission, completion, merge)
    pub log_batch_operations: bool,
    /// Maximum length for logged cell values and search terms
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_row_details: false,
            log_batch_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_row_details: true,
            log_batch_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_row_details: false,
            log_batch_operations: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }
}

mod level_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

/// Macro for performance-sensitive debug logging.
///
/// Arguments are only evaluated when the configured level admits debug output.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional per-row logging.
#[macro_export]
macro_rules! log_row_detail {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_row_details {
            tracing::trace!($($arg)*);
        }
    };
}

/// Macro for conditional batch scheduling logging.
#[macro_export]
macro_rules! log_batch_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_batch_operations {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
///
/// Cuts on a char boundary so multi-byte cell text never panics.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &value[..end];
    format!("{truncated}...(truncated)")
}

/// Utilities for installing a `tracing-subscriber` for the engine.
pub mod setup {
    use tracing::Level;

    /// Configuration for the logging subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for term-grid components specifically
        pub engine_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                engine_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                engine_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                engine_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for engine components.
        pub fn with_engine_level(mut self, level: Level) -> Self {
            self.engine_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},term_grid={}",
                    self.level.as_str().to_lowercase(),
                    self.engine_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber for the engine's logs.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_grid::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_row_details);
        assert!(config.log_batch_operations);
        assert_eq!(config.max_field_length, 256);
    }

    #[test]
    fn test_log_config_production() {
        let config = LogConfig::production();
        assert_eq!(config.base_level, Level::WARN);
        assert!(!config.log_row_details);
        assert!(!config.log_batch_operations);
        assert_eq!(config.max_field_length, 128);
    }

    #[test]
    fn test_log_config_serde_level() {
        let json = serde_json::to_string(&LogConfig::verbose()).unwrap();
        assert!(json.contains("\"DEBUG\""));
        let back: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_level, Level::DEBUG);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
    }

    #[test]
    fn test_truncate_field_char_boundary() {
        // "é" is two bytes; cutting at 1 must back off to 0
        assert_eq!(truncate_field("éé", 1), "...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = setup::LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,term_grid=debug");
        let custom = config.with_env_filter("term_grid=trace");
        assert_eq!(custom.env_filter(), "term_grid=trace");
    }
}
