//! Matching strategies applied to one cell's display text.
//!
//! Exactly one strategy is chosen per search, with precedence
//! regex → fuzzy → standard (see [`build_matcher`]). Offsets in the returned
//! [`TextMatch`]es count chars, not bytes.

use super::levenshtein::similarity;
use super::pattern::compile_pattern;
use super::SearchCriterion;
use crate::config::SearchOptions;
use crate::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Strategy used by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Substring scan, optionally whole-word
    Standard,
    Regex,
    Fuzzy,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchStrategy::Standard => "standard",
            SearchStrategy::Regex => "regex",
            SearchStrategy::Fuzzy => "fuzzy",
        })
    }
}

/// A hit inside one text, in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub start: usize,
    pub length: usize,
    pub text: String,
}

/// Result of scanning one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellScan {
    Matches(Vec<TextMatch>),
    /// The pattern ran past its time budget; the cell yields nothing
    TimedOut,
}

impl CellScan {
    fn none() -> Self {
        CellScan::Matches(Vec::new())
    }
}

/// Finds matches of one search term inside cell text.
pub trait CellMatcher: fmt::Debug + Send + Sync {
    fn strategy(&self) -> SearchStrategy;

    /// Scans `text`; `text` is never empty.
    fn scan(&self, text: &str) -> CellScan;
}

/// Picks and builds the matcher for a criterion.
///
/// Regex wins when the criterion asks for it and regex is enabled; otherwise
/// fuzzy when it is enabled as the default; otherwise standard. A regex
/// criterion with regex disabled is searched for literally.
pub fn build_matcher(
    criterion: &SearchCriterion,
    options: &SearchOptions,
) -> Result<Arc<dyn CellMatcher>> {
    if criterion.regex && options.enable_regex {
        return Ok(Arc::new(RegexMatcher::new(
            &criterion.term,
            criterion.case_sensitive,
            options.pattern_timeout,
        )?));
    }
    if options.enable_fuzzy && options.fuzzy_by_default {
        return Ok(Arc::new(FuzzyMatcher::new(
            &criterion.term,
            criterion.case_sensitive,
            options.fuzzy_tolerance,
        )));
    }
    Ok(Arc::new(StandardMatcher::new(
        &criterion.term,
        criterion.case_sensitive,
        criterion.whole_word,
        options.pattern_timeout,
    )?))
}

/// Literal search, with an escaped regex for case-insensitive or whole-word
/// matching.
#[derive(Debug)]
pub struct StandardMatcher {
    term: String,
    /// Set unless the scan is a plain case-sensitive substring search
    regex: Option<Regex>,
    timeout: Duration,
}

impl StandardMatcher {
    pub fn new(
        term: &str,
        case_sensitive: bool,
        whole_word: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let regex = if case_sensitive && !whole_word {
            None
        } else {
            let escaped = regex::escape(term);
            let pattern = if whole_word {
                format!(r"\b{escaped}\b")
            } else {
                escaped
            };
            Some(
                RegexBuilder::new(&pattern)
                    .case_insensitive(!case_sensitive)
                    .build()?,
            )
        };
        Ok(Self {
            term: term.to_string(),
            regex,
            timeout,
        })
    }
}

impl CellMatcher for StandardMatcher {
    fn strategy(&self) -> SearchStrategy {
        SearchStrategy::Standard
    }

    fn scan(&self, text: &str) -> CellScan {
        match &self.regex {
            Some(regex) => timed_scan(regex, text, self.timeout),
            None => {
                let mut offsets = CharOffsets::new(text);
                CellScan::Matches(
                    text.match_indices(self.term.as_str())
                        .map(|(start, found)| offsets.text_match(start, start + found.len()))
                        .collect(),
                )
            }
        }
    }
}

/// User regex, compiled once and shared by every cell.
#[derive(Debug)]
pub struct RegexMatcher {
    regex: Regex,
    timeout: Duration,
}

impl RegexMatcher {
    pub fn new(pattern: &str, case_sensitive: bool, timeout: Duration) -> Result<Self> {
        Ok(Self {
            regex: compile_pattern(pattern, case_sensitive)?,
            timeout,
        })
    }
}

impl CellMatcher for RegexMatcher {
    fn strategy(&self) -> SearchStrategy {
        SearchStrategy::Regex
    }

    fn scan(&self, text: &str) -> CellScan {
        timed_scan(&self.regex, text, self.timeout)
    }
}

/// Whole-cell similarity match.
#[derive(Debug)]
pub struct FuzzyMatcher {
    term: String,
    case_sensitive: bool,
    min_similarity: f64,
}

impl FuzzyMatcher {
    /// `tolerance` is the accepted dissimilarity, so a cell qualifies when
    /// its similarity is at least `1 - tolerance`.
    pub fn new(term: &str, case_sensitive: bool, tolerance: f64) -> Self {
        Self {
            term: term.to_string(),
            case_sensitive,
            min_similarity: 1.0 - tolerance.clamp(0.0, 1.0),
        }
    }
}

impl CellMatcher for FuzzyMatcher {
    fn strategy(&self) -> SearchStrategy {
        SearchStrategy::Fuzzy
    }

    fn scan(&self, text: &str) -> CellScan {
        let score = similarity(&self.term, text, self.case_sensitive);
        if score + f64::EPSILON < self.min_similarity {
            return CellScan::none();
        }
        CellScan::Matches(vec![TextMatch {
            start: 0,
            length: text.chars().count(),
            text: text.to_string(),
        }])
    }
}

/// Runs `regex` over `text`, checking the time budget between matches.
///
/// Empty matches are skipped.
fn timed_scan(regex: &Regex, text: &str, budget: Duration) -> CellScan {
    let started = Instant::now();
    let mut offsets = CharOffsets::new(text);
    let mut matches = Vec::new();
    for found in regex.find_iter(text) {
        if started.elapsed() > budget {
            return CellScan::TimedOut;
        }
        if found.is_empty() {
            continue;
        }
        matches.push(offsets.text_match(found.start(), found.end()));
    }
    if started.elapsed() > budget {
        return CellScan::TimedOut;
    }
    CellScan::Matches(matches)
}

/// Converts ascending byte offsets into char offsets in one pass.
struct CharOffsets<'t> {
    text: &'t str,
    byte: usize,
    chars: usize,
}

impl<'t> CharOffsets<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    fn advance_to(&mut self, byte: usize) -> usize {
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }

    fn text_match(&mut self, start: usize, end: usize) -> TextMatch {
        let start_chars = self.advance_to(start);
        let end_chars = self.advance_to(end);
        TextMatch {
            start: start_chars,
            length: end_chars - start_chars,
            text: self.text[start..end].to_string(),
        }
    }
}
