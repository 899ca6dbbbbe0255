//! Bounded recent-search history.

use super::SearchCriterion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// One remembered search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub criterion: SearchCriterion,
    pub searched_at: DateTime<Utc>,
    /// Filled in once the search finished
    pub result_count: Option<usize>,
    pub duration_ms: Option<u64>,
}

impl HistoryEntry {
    fn new(criterion: SearchCriterion) -> Self {
        Self {
            criterion,
            searched_at: Utc::now(),
            result_count: None,
            duration_ms: None,
        }
    }

    pub fn term(&self) -> &str {
        &self.criterion.term
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// Most-recent-first list of searches, deduplicated by term ignoring case.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Moves `criterion` to the front, replacing any entry with the same term.
    ///
    /// The oldest entries fall off once `capacity` is exceeded.
    pub fn record(&mut self, criterion: SearchCriterion) {
        let key = criterion.term.to_lowercase();
        self.entries.retain(|entry| entry.term().to_lowercase() != key);
        self.entries.push_front(HistoryEntry::new(criterion));
        self.entries.truncate(self.capacity);
    }

    /// Attaches the result of a finished search to its entry.
    ///
    /// Returns false when the entry has since been evicted.
    pub fn enrich(&mut self, term: &str, result_count: usize, duration: Duration) -> bool {
        let key = term.to_lowercase();
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.term().to_lowercase() == key)
        {
            Some(entry) => {
                entry.result_count = Some(result_count);
                entry.duration_ms = Some(duration.as_millis().try_into().unwrap_or(u64::MAX));
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(history: &SearchHistory) -> Vec<String> {
        history.entries().iter().map(|e| e.term().to_string()).collect()
    }

    #[test]
    fn test_most_recent_first_with_eviction() {
        let mut history = SearchHistory::new(2);
        history.record(SearchCriterion::new("a"));
        history.record(SearchCriterion::new("b"));
        history.record(SearchCriterion::new("c"));
        assert_eq!(terms(&history), vec!["c", "b"]);
    }

    #[test]
    fn test_dedup_ignores_case() {
        let mut history = SearchHistory::new(5);
        history.record(SearchCriterion::new("Ada"));
        history.record(SearchCriterion::new("grace"));
        history.record(SearchCriterion::new("ADA"));
        assert_eq!(terms(&history), vec!["ADA", "grace"]);
    }

    #[test]
    fn test_enrich() {
        let mut history = SearchHistory::new(5);
        history.record(SearchCriterion::new("ada"));
        assert!(history.enrich("Ada", 3, Duration::from_millis(12)));
        let entry = history.latest().unwrap();
        assert_eq!(entry.result_count, Some(3));
        assert_eq!(entry.duration(), Some(Duration::from_millis(12)));
        assert!(!history.enrich("missing", 1, Duration::ZERO));
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = SearchHistory::new(0);
        history.record(SearchCriterion::new("a"));
        assert!(history.is_empty());
    }
}
