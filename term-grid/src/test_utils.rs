//! Test utilities for the term-grid engine.
//!
//! Synthetic customer grids at a few fixed sizes plus an observer that records
//! every notification, for unit tests, integration tests and benches.

use crate::core::{ColumnDescriptor, ProgressSnapshot, Row, RowSnapshot};
use crate::engine::{CompletionEvent, EngineObserver};
use crate::search::HistoryEntry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Sizes of generated grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSize {
    /// 100 rows
    Small,
    /// 10,000 rows
    Medium,
    /// 100,000 rows
    Large,
}

impl GridSize {
    pub fn rows(&self) -> usize {
        match self {
            GridSize::Small => 100,
            GridSize::Medium => 10_000,
            GridSize::Large => 100_000,
        }
    }
}

const FIRST_NAMES: [&str; 8] = [
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "Ken",
];
const LAST_NAMES: [&str; 8] = [
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson",
];
const REGIONS: [&str; 5] = ["AFRICA", "AMERICA", "ASIA", "EUROPE", "MIDDLE EAST"];

/// Columns of the generated customer grid; `actions` is a hidden,
/// non-searchable UI column.
pub fn customer_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id"),
        ColumnDescriptor::new("name"),
        ColumnDescriptor::new("email"),
        ColumnDescriptor::new("age"),
        ColumnDescriptor::new("region"),
        ColumnDescriptor::hidden("actions").not_searchable(),
    ]
}

/// A clean customer grid: unique ids, valid e-mails, ages in 18..=90.
pub fn customer_snapshot(rows: usize) -> RowSnapshot {
    let rows = (0..rows).map(customer_row).collect();
    RowSnapshot::new(rows, customer_columns()).expect("customer columns are unique")
}

fn customer_row(i: usize) -> Row {
    let first = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
    Row::new()
        .with("id", format!("C{i:06}"))
        .with("name", format!("{first} {last}"))
        .with(
            "email",
            format!("{}.{}{i}@example.com", first.to_lowercase(), last.to_lowercase()),
        )
        .with("age", 18 + (i % 73) as i64)
        .with("region", REGIONS[i % REGIONS.len()])
        .with("actions", "edit")
}

/// A customer grid with seeded defects: roughly `defect_rate` of the rows get
/// a blank id, a malformed e-mail, an out-of-range age or a duplicated id.
pub fn noisy_customer_snapshot(rows: usize, defect_rate: f64, seed: u64) -> RowSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..rows)
        .map(|i| {
            let mut row = customer_row(i);
            if rng.random_bool(defect_rate.clamp(0.0, 1.0)) {
                match rng.random_range(0..4) {
                    0 => row.set("id", ""),
                    1 => row.set("email", "not-an-email"),
                    2 => row.set("age", -1),
                    _ => row.set("id", format!("C{:06}", i / 2)),
                }
            }
            row
        })
        .collect();
    RowSnapshot::new(rows, customer_columns()).expect("customer columns are unique")
}

/// Observer that keeps every notification for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    progress: Mutex<Vec<ProgressSnapshot>>,
    completions: Mutex<Vec<CompletionEvent>>,
    history: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl RecordingObserver {
    pub fn progress(&self) -> Vec<ProgressSnapshot> {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of history notifications received.
    pub fn history_changes(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The most recently announced history.
    pub fn last_history(&self) -> Option<Vec<HistoryEntry>> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl EngineObserver for RecordingObserver {
    fn on_progress(&self, progress: &ProgressSnapshot) {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(progress.clone());
    }

    fn on_completed(&self, event: &CompletionEvent) {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn on_history_changed(&self, history: &[HistoryEntry]) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(history.to_vec());
    }
}
