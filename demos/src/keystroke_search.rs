//! Search-as-you-type example.
//!
//! Simulates a user typing into a grid's search box: every keystroke issues a
//! search, a repeated term inside the debounce window is coalesced, and the
//! engine keeps a most-recent-first history.
//!
//! Run with:
//! ```bash
//! cargo run --example keystroke_search
//! ```

use std::sync::Arc;
use std::time::Duration;
use term_grid::prelude::*;
use term_grid::search::HistoryEntry;
use term_grid::test_utils::{customer_snapshot, GridSize};
use tracing::info;

struct HistoryPrinter;

impl EngineObserver for HistoryPrinter {
    fn on_history_changed(&self, history: &[HistoryEntry]) {
        let terms: Vec<_> = history.iter().map(HistoryEntry::term).collect();
        info!(history = ?terms, "History changed");
    }
}

async fn type_term(
    engine: &GridEngine,
    snapshot: &RowSnapshot,
    options: &SearchOptions,
    term: &str,
) -> Result<()> {
    let cancellation = CancellationToken::new();
    match engine
        .search(SearchCriterion::new(term), snapshot, Some(options), &cancellation)
        .await?
    {
        SearchOutcome::Completed(results) => println!(
            "{term:>12}: {:>5} matches in {} of {} rows ({:?}, {} ms{})",
            results.len(),
            results.rows_scanned,
            results.total_rows,
            results.strategy,
            results.duration.as_millis(),
            if results.truncated { ", truncated" } else { "" }
        ),
        SearchOutcome::Superseded => println!("{term:>12}: superseded"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let snapshot = customer_snapshot(GridSize::Medium.rows());
    let engine = GridEngine::new(
        EngineConfig::default()
            .with_history(HistoryConfig::default().with_debounce_delay(Duration::from_millis(150))),
    )?
    .with_observer(Arc::new(HistoryPrinter));
    let options = SearchOptions::default().with_max_results(500);

    println!("Typing a query one keystroke at a time:");
    for term in ["g", "gr", "gra", "grac", "grace"] {
        type_term(&engine, &snapshot, &options, term).await?;
    }

    println!("\nHitting enter twice quickly:");
    let (first, second) = tokio::join!(
        type_term(&engine, &snapshot, &options, "grace"),
        type_term(&engine, &snapshot, &options, "grace"),
    );
    first?;
    second?;

    println!("\nFuzzy lookup for a misspelled region:");
    type_term(&engine, &snapshot, &options.clone().with_fuzzy(0.25), "EUORPE").await?;

    println!("\nRegex lookup for ids ending in 42:");
    let regex = engine
        .search(
            SearchCriterion::new(r"^C\d{4}42$").with_regex(true),
            &snapshot,
            Some(&options),
            &CancellationToken::new(),
        )
        .await?;
    if let Some(results) = regex.results() {
        for found in results.matches.iter().take(5) {
            println!("  row {}: {}", found.row_index, found.matched_text);
        }
    }

    println!("\nRecent searches:");
    for entry in engine.history() {
        println!(
            "  {:<16} {:>5} results",
            entry.term(),
            entry.result_count.map_or("-".to_string(), |n| n.to_string())
        );
    }

    engine.dispose().await;
    Ok(())
}
