//! Benchmarks for the batch executor under row and cross-row validation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use std::sync::Arc;
use term_grid::config::ExecutorConfig;
use term_grid::core::{CancellationToken, ColumnDescriptor, Row, RowSnapshot};
use term_grid::executor::BatchExecutor;
use term_grid::validation::{CrossRowConstraint, CrossRowValidator, RowValidator, RuleDefinition};

/// Creates a customer grid where roughly 5% of the cells are broken.
fn create_test_data(rows: usize) -> RowSnapshot {
    let mut rng = StdRng::seed_from_u64(7);
    let rows = (0..rows)
        .map(|i| {
            let email = if rng.random_range(0..100) < 95 {
                format!("user{i}@example.com")
            } else {
                "invalid-email".to_string()
            };
            let id = if rng.random_range(0..100) < 98 {
                format!("C{i}")
            } else {
                format!("C{}", i / 2)
            };
            Row::new()
                .with("id", id)
                .with("email", email)
                .with("age", rng.random_range(0i64..120))
                .with("name", format!("user {i}"))
        })
        .collect();
    RowSnapshot::new(
        rows,
        vec![
            ColumnDescriptor::new("id"),
            ColumnDescriptor::new("email"),
            ColumnDescriptor::new("age"),
            ColumnDescriptor::new("name"),
        ],
    )
    .unwrap()
}

fn rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::required("id"),
        RuleDefinition::email("email"),
        RuleDefinition::range("age", Some(18.0), Some(99.0)),
        RuleDefinition::length("name", Some(1), Some(64)),
    ]
}

/// Benchmark row validation across batch sizes
fn bench_row_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_validation");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let size = 100_000;
    let snapshot = create_test_data(size);
    group.throughput(Throughput::Elements(size as u64));

    for batch_size in [500, 1_000, 5_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                let executor =
                    BatchExecutor::new(ExecutorConfig::default().with_batch_size(batch_size));
                b.to_async(&runtime).iter(|| async {
                    let validator =
                        RowValidator::new(&snapshot, rules(), Default::default()).unwrap();
                    std::hint::black_box(
                        executor
                            .execute(&snapshot, Arc::new(validator), &CancellationToken::new())
                            .await,
                    )
                });
            },
        );
    }

    group.finish();
}

/// Benchmark indexed uniqueness against sequential execution
fn bench_cross_row_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_row_unique");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for size in [10_000, 100_000] {
        let snapshot = create_test_data(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            let executor = BatchExecutor::new(ExecutorConfig::default());
            b.to_async(&runtime).iter(|| async {
                let validator = CrossRowValidator::new(
                    snapshot,
                    vec![CrossRowConstraint::unique("unique_id", "id")],
                )
                .unwrap();
                std::hint::black_box(
                    executor
                        .execute(snapshot, Arc::new(validator), &CancellationToken::new())
                        .await,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_row_validation, bench_cross_row_unique);
criterion_main!(benches);
