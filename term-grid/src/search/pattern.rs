//! Safety checks and compilation for user-supplied regular expressions.

use crate::prelude::*;
use regex::{Regex, RegexBuilder};

/// Longest pattern accepted, in chars.
pub const MAX_PATTERN_LENGTH: usize = 1000;

/// Upper bound on the compiled program and lazy DFA cache.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Rejects patterns that are too long or contain NUL.
///
/// This only screens the text; compiling happens in [`compile_pattern`].
///
/// ```rust
/// use term_grid::search::validate_pattern;
///
/// assert!(validate_pattern(r"^\d+$").is_ok());
/// assert!(validate_pattern("a\0b").is_err());
/// assert!(validate_pattern(&"a".repeat(1001)).is_err());
/// ```
pub fn validate_pattern(pattern: &str) -> Result<&str> {
    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return Err(EngineError::InvalidPattern(format!(
            "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
        )));
    }
    if pattern.contains('\0') {
        return Err(EngineError::InvalidPattern(
            "Regex pattern cannot contain null bytes".to_string(),
        ));
    }
    Ok(pattern)
}

/// Validates and compiles a pattern with bounded size.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    let regex = RegexBuilder::new(validate_pattern(pattern)?)
        .case_insensitive(!case_sensitive)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_SIZE_LIMIT)
        .build()?;
    Ok(regex)
}
