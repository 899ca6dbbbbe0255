//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use term_grid::core::{ColumnDescriptor, ProgressSnapshot, Row, RowSnapshot};
use term_grid::engine::{CompletionEvent, EngineObserver};
use term_grid::search::HistoryEntry;

/// `rows` customers with unique ids `C0`, `C1`, ... and a hidden actions
/// column.
pub fn customers(rows: usize) -> RowSnapshot {
    let rows = (0..rows)
        .map(|i| {
            Row::new()
                .with("id", format!("C{i}"))
                .with("name", format!("customer {i}"))
                .with("email", format!("customer{i}@example.com"))
                .with("age", (20 + i % 50) as i64)
                .with("actions", "edit")
        })
        .collect();
    RowSnapshot::new(
        rows,
        vec![
            ColumnDescriptor::new("id"),
            ColumnDescriptor::new("name"),
            ColumnDescriptor::new("email"),
            ColumnDescriptor::new("age"),
            ColumnDescriptor::hidden("actions").not_searchable(),
        ],
    )
    .unwrap()
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub progress: Mutex<Vec<ProgressSnapshot>>,
    pub completions: Mutex<Vec<CompletionEvent>>,
    pub histories: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl Recorder {
    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.completions.lock().unwrap().clone()
    }

    pub fn processed(&self) -> Vec<usize> {
        self.progress.lock().unwrap().iter().map(|p| p.processed).collect()
    }
}

impl EngineObserver for Recorder {
    fn on_progress(&self, progress: &ProgressSnapshot) {
        self.progress.lock().unwrap().push(progress.clone());
    }

    fn on_completed(&self, event: &CompletionEvent) {
        self.completions.lock().unwrap().push(event.clone());
    }

    fn on_history_changed(&self, history: &[HistoryEntry]) {
        self.histories.lock().unwrap().push(history.to_vec());
    }
}
