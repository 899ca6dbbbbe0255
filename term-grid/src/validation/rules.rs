//! Cell-level rule definitions.

use crate::core::{panic_message, CellOutcome, CellValue};
use crate::prelude::*;
use crate::search::compile_pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Caller-supplied cell predicate; `true` means the value is valid.
pub type ValuePredicate = Arc<dyn Fn(&CellValue) -> bool + Send + Sync>;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Compile-time constant pattern, known to be valid
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("Hard-coded email pattern should be valid")
});

/// What a [`RuleDefinition`] checks.
///
/// Every kind except `Required` treats a blank value as valid, so whether a
/// cell must be filled in is decided by `Required` alone.
#[derive(Clone)]
pub enum RuleKind {
    /// Value must not be null, empty or whitespace
    Required,
    /// Display text must match the regex
    Pattern(Regex),
    /// Display text must look like an e-mail address
    Email,
    /// Value must be numeric and within the inclusive bounds
    Range { min: Option<f64>, max: Option<f64> },
    /// Display text length in chars must be within the inclusive bounds
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Caller predicate
    Custom(ValuePredicate),
}

impl RuleKind {
    /// Short name used in outcomes and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Pattern(_) => "pattern",
            RuleKind::Email => "email",
            RuleKind::Range { .. } => "range",
            RuleKind::Length { .. } => "length",
            RuleKind::Custom(_) => "custom",
        }
    }

    fn accepts(&self, value: &CellValue) -> bool {
        match self {
            RuleKind::Required => !value.is_blank(),
            _ if value.is_blank() => true,
            RuleKind::Pattern(regex) => regex.is_match(&value.to_string()),
            RuleKind::Email => EMAIL_REGEX.is_match(value.to_string().trim()),
            RuleKind::Range { min, max } => value.as_f64().is_some_and(|n| {
                min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max)
            }),
            RuleKind::Length { min, max } => {
                let len = value.to_string().chars().count();
                min.map_or(true, |min| len >= min) && max.map_or(true, |max| len <= max)
            }
            RuleKind::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            RuleKind::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            RuleKind::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// A validation rule bound to one column.
///
/// Rules are stateless and shared by every row of a run.
///
/// # Examples
///
/// ```rust
/// use term_grid::core::CellValue;
/// use term_grid::validation::RuleDefinition;
///
/// let rule = RuleDefinition::range("age", Some(0.0), Some(130.0));
/// assert!(rule.check(&CellValue::from(42)).is_valid);
/// assert!(!rule.check(&CellValue::from(-1)).is_valid);
/// // blank values are left to `required`
/// assert!(rule.check(&CellValue::Null).is_valid);
/// ```
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    pub column_name: String,
    pub kind: RuleKind,
    pub error_message: String,
}

impl RuleDefinition {
    pub fn new(
        column_name: impl Into<String>,
        kind: RuleKind,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            kind,
            error_message: error_message.into(),
        }
    }

    pub fn required(column_name: impl Into<String>) -> Self {
        let column_name = column_name.into();
        let message = format!("{column_name} is required");
        Self::new(column_name, RuleKind::Required, message)
    }

    /// Pattern rule; the regex is validated and compiled here, once.
    pub fn pattern(column_name: impl Into<String>, pattern: &str) -> Result<Self> {
        let column_name = column_name.into();
        let regex = compile_pattern(pattern, true)?;
        let message = format!("{column_name} does not match the expected format");
        Ok(Self::new(column_name, RuleKind::Pattern(regex), message))
    }

    pub fn email(column_name: impl Into<String>) -> Self {
        let column_name = column_name.into();
        let message = format!("{column_name} must be a valid e-mail address");
        Self::new(column_name, RuleKind::Email, message)
    }

    pub fn range(column_name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let column_name = column_name.into();
        let message = match (min, max) {
            (Some(min), Some(max)) => format!("{column_name} must be between {min} and {max}"),
            (Some(min), None) => format!("{column_name} must be at least {min}"),
            (None, Some(max)) => format!("{column_name} must be at most {max}"),
            (None, None) => format!("{column_name} must be a number"),
        };
        Self::new(column_name, RuleKind::Range { min, max }, message)
    }

    pub fn length(column_name: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        let column_name = column_name.into();
        let message = match (min, max) {
            (Some(min), Some(max)) => {
                format!("{column_name} must be between {min} and {max} characters")
            }
            (Some(min), None) => format!("{column_name} must be at least {min} characters"),
            (None, Some(max)) => format!("{column_name} must be at most {max} characters"),
            (None, None) => format!("{column_name} has an invalid length"),
        };
        Self::new(column_name, RuleKind::Length { min, max }, message)
    }

    pub fn custom<F>(
        column_name: impl Into<String>,
        predicate: F,
        error_message: impl Into<String>,
    ) -> Self
    where
        F: Fn(&CellValue) -> bool + Send + Sync + 'static,
    {
        Self::new(column_name, RuleKind::Custom(Arc::new(predicate)), error_message)
    }

    /// Replaces the default error message.
    pub fn with_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = error_message.into();
        self
    }

    /// Checks one value.
    ///
    /// A predicate that panics yields an invalid outcome carrying the panic
    /// message; the panic never escapes.
    pub fn check(&self, value: &CellValue) -> CellOutcome {
        let rule = self.kind.name();
        match catch_unwind(AssertUnwindSafe(|| self.kind.accepts(value))) {
            Ok(true) => CellOutcome::valid(&self.column_name, rule),
            Ok(false) => CellOutcome::invalid(&self.column_name, rule, &self.error_message),
            Err(payload) => CellOutcome::invalid(
                &self.column_name,
                rule,
                format!("Rule evaluation failed: {}", panic_message(payload.as_ref())),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let rule = RuleDefinition::required("name");
        assert!(rule.check(&"Ada".into()).is_valid);
        let outcome = rule.check(&"  ".into());
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_message.as_deref(), Some("name is required"));
        assert_eq!(outcome.rule, "required");
    }

    #[test]
    fn test_pattern() {
        let rule = RuleDefinition::pattern("phone", r"^\d{3}-\d{4}$").unwrap();
        assert!(rule.check(&"555-1234".into()).is_valid);
        assert!(!rule.check(&"5551234".into()).is_valid);
        assert!(RuleDefinition::pattern("phone", "(").is_err());
    }

    #[test]
    fn test_pattern_shares_search_size_limit() {
        let oversized = r"\w{1000}";
        assert!(matches!(
            compile_pattern(oversized, true),
            Err(EngineError::InvalidPattern(_))
        ));
        let err = RuleDefinition::pattern("code", oversized).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPattern(_)));
    }

    #[test]
    fn test_email() {
        let rule = RuleDefinition::email("email");
        assert!(rule.check(&"ada@example.com".into()).is_valid);
        assert!(!rule.check(&"not-an-email".into()).is_valid);
    }

    #[test]
    fn test_range_rejects_non_numeric() {
        let rule = RuleDefinition::range("age", Some(0.0), None);
        assert!(rule.check(&"12".into()).is_valid);
        assert!(!rule.check(&"twelve".into()).is_valid);
        assert!(!rule.check(&CellValue::from(true)).is_valid);
    }

    #[test]
    fn test_length_counts_chars() {
        let rule = RuleDefinition::length("code", Some(2), Some(3));
        assert!(rule.check(&"éé".into()).is_valid);
        assert!(!rule.check(&"é".into()).is_valid);
        assert!(!rule.check(&"abcd".into()).is_valid);
    }

    #[test]
    fn test_panicking_predicate_becomes_failure() {
        let rule = RuleDefinition::custom("x", |_| panic!("predicate exploded"), "bad x");
        let outcome = rule.check(&"1".into());
        assert!(!outcome.is_valid);
        let message = outcome.error_message.unwrap();
        assert!(message.starts_with("Rule evaluation failed"));
        assert!(message.contains("predicate exploded"));
    }

    #[test]
    fn test_with_message() {
        let rule = RuleDefinition::required("id").with_message("ID missing");
        assert_eq!(
            rule.check(&CellValue::Null).error_message.as_deref(),
            Some("ID missing")
        );
    }
}
