//! Benchmarks for the search strategies.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use rand::prelude::*;
use term_grid::config::{ExecutorConfig, SearchOptions};
use term_grid::core::{CancellationToken, Row, RowSnapshot};
use term_grid::executor::BatchExecutor;
use term_grid::search::{levenshtein, run_search, SearchCriterion};

const WORDS: [&str; 10] = [
    "harbor", "lantern", "meadow", "granite", "velvet", "orchard", "cinder", "willow", "quartz",
    "saffron",
];

/// Creates a grid of short phrases built from a small vocabulary
fn create_test_data(rows: usize) -> RowSnapshot {
    let mut rng = StdRng::seed_from_u64(11);
    let rows = (0..rows)
        .map(|i| {
            let first = WORDS[rng.random_range(0..WORDS.len())];
            let second = WORDS[rng.random_range(0..WORDS.len())];
            Row::new()
                .with("code", format!("R-{i:06}"))
                .with("title", format!("{first} {second}"))
                .with("tag", WORDS[i % WORDS.len()])
        })
        .collect();
    RowSnapshot::with_visible_columns(rows, ["code", "title", "tag"]).unwrap()
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_strategies");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let size = 50_000;
    let snapshot = create_test_data(size);
    let executor = BatchExecutor::new(ExecutorConfig::default());
    let unlimited = SearchOptions::default().with_max_results(usize::MAX);
    group.throughput(Throughput::Elements(size as u64));

    let cases = [
        ("standard", SearchCriterion::new("orchard"), unlimited.clone()),
        (
            "whole_word",
            SearchCriterion::new("willow").with_whole_word(true),
            unlimited.clone(),
        ),
        (
            "regex",
            SearchCriterion::new(r"R-0\d{2}5").with_regex(true),
            unlimited.clone(),
        ),
        ("fuzzy", SearchCriterion::new("meadwo"), unlimited.clone().with_fuzzy(0.3)),
        (
            "first_100",
            SearchCriterion::new("granite"),
            SearchOptions::default().with_max_results(100),
        ),
    ];

    for (name, criterion, options) in &cases {
        group.bench_function(*name, |b| {
            b.to_async(&runtime).iter(|| async {
                std::hint::black_box(
                    run_search(&executor, &snapshot, criterion, options, &CancellationToken::new())
                        .await
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_levenshtein(c: &mut Criterion) {
    let mut group = c.benchmark_group("levenshtein");
    for (name, a, b) in [
        ("short", "kitten", "sitting"),
        ("medium", "granite harbor lantern", "granted harbour lanterns"),
        (
            "long",
            "the quick brown fox jumps over the lazy dog near the riverbank",
            "a quick brown fax jumped over lazy dogs beside the river bank",
        ),
    ] {
        group.bench_function(name, |bench| {
            bench.iter(|| levenshtein(std::hint::black_box(a), std::hint::black_box(b)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_levenshtein);
criterion_main!(benches);
