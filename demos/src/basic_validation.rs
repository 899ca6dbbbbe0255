//! Basic validation example demonstrating term-grid's core functionality.
//!
//! This example shows how to:
//! - Validate every row of a grid against cell rules
//! - Check uniqueness and dependencies across rows
//! - Combine both passes into one verdict per row
//!
//! Run with:
//! ```bash
//! cargo run --example basic_validation
//! ```

use std::sync::Arc;
use term_grid::logging::setup::{init_logging, LoggingConfig};
use term_grid::prelude::*;

/// Prints a line whenever an operation finishes.
struct ConsoleObserver;

impl EngineObserver for ConsoleObserver {
    fn on_completed(&self, event: &CompletionEvent) {
        println!(
            "  [{}] {:?}: {} of {} rows, {} failed, {} ms",
            event.operation,
            event.status,
            event.processed_rows,
            event.total_rows,
            event.failure_count,
            event.duration_ms
        );
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default().with_engine_level(tracing::Level::INFO))?;

    let json = r#"[
        {"customer_id": "C1", "name": "Alice Johnson", "email": "alice@example.com", "age": 28, "country": "NL", "state": null},
        {"customer_id": "C2", "name": "Bob Smith", "email": "bob@example.com", "age": 35, "country": "US", "state": "CA"},
        {"customer_id": "C3", "name": "Carol Davis", "email": "carol@example", "age": 42, "country": "US", "state": "NY"},
        {"customer_id": "C4", "name": "David Wilson", "email": "david@example.com", "age": 131, "country": "DE", "state": null},
        {"customer_id": "C2", "name": "Eve Brown", "email": "eve@example.com", "age": 26, "country": null, "state": "TX"},
        {"customer_id": null, "name": "Frank Miller", "email": "", "age": 38, "country": "FR", "state": null}
    ]"#;
    let snapshot = RowSnapshot::from_json(
        json,
        vec![
            ColumnDescriptor::new("customer_id"),
            ColumnDescriptor::new("name"),
            ColumnDescriptor::new("email"),
            ColumnDescriptor::new("age"),
            ColumnDescriptor::new("country"),
            ColumnDescriptor::new("state"),
            ColumnDescriptor::hidden("actions").not_searchable(),
        ],
    )?;

    let engine = GridEngine::new(
        EngineConfig::default()
            .with_executor(ExecutorConfig::default().with_skipped_column("actions")),
    )?
    .with_observer(Arc::new(ConsoleObserver));
    let cancellation = CancellationToken::new();

    println!("Running row validation...");
    let rows = engine
        .validate_rows(
            &snapshot,
            vec![
                RuleDefinition::required("customer_id"),
                RuleDefinition::required("name"),
                RuleDefinition::email("email"),
                RuleDefinition::range("age", Some(0.0), Some(120.0))
                    .with_message("Age must be between 0 and 120"),
            ],
            &cancellation,
        )
        .await?;

    for outcome in rows.failures() {
        for cell in outcome.errors() {
            println!(
                "  row {} / {}: {}",
                outcome.row_index,
                cell.column_name,
                cell.error_message.as_deref().unwrap_or("invalid")
            );
        }
    }

    println!("\nRunning cross-row validation...");
    let cross = engine
        .validate_cross_row(
            &snapshot,
            vec![
                CrossRowConstraint::unique("unique_customer_id", "customer_id"),
                CrossRowConstraint::dependency("state_needs_country", "state", "country")
                    .with_severity(Severity::Warning),
            ],
            &cancellation,
        )
        .await?;

    for outcome in cross.failures() {
        for violation in &outcome.violations {
            println!(
                "  row {} [{}] {}: {} (conflicts: {:?})",
                outcome.row_index,
                violation.severity,
                violation.constraint_name,
                violation.message,
                violation.conflicting_rows
            );
        }
    }

    println!("\nCombined verdict:");
    for (row_index, valid) in rows.combine_with(&cross) {
        println!("  row {row_index}: {}", if valid { "valid" } else { "invalid" });
    }

    engine.dispose().await;
    Ok(())
}
