//! Severity of a cross-row constraint violation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a constraint violation is.
///
/// Ordered by severity: `Error > Warning > Info`. The engine only records the
/// severity on each violation; deciding whether a warning blocks a save is
/// left to the host grid.
///
/// ```rust
/// use term_grid::core::Severity;
///
/// assert!(Severity::Error > Severity::Warning);
/// assert!(Severity::Warning.is_at_least(Severity::Info));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; shown but never blocking
    Info = 0,
    /// Should be reviewed
    Warning = 1,
    /// Must be fixed
    #[default]
    Error = 2,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Checks if this severity is at least as serious as another.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(!Severity::Info.is_at_least(Severity::Warning));
    }

    #[test]
    fn test_severity_serde() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"error\"");
        let severity: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(severity, Severity::Warning);
    }
}
