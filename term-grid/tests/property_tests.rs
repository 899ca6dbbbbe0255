//! Property-based tests for the term-grid engine.
//!
//! ## Test Categories
//!
//! ### 1. Executor ordering
//! - Batched, concurrent runs return exactly one outcome per row, ascending
//!   by row index, identical to evaluating the rows one by one
//!
//! ### 2. Search budget
//! - A capped search returns the first `max_results` matches of the uncapped
//!   search, in the same order
//!
//! ### 3. Edit distance
//! - Levenshtein is a metric bounded by the longer input
//! - Similarity stays within `0.0..=1.0`

use proptest::prelude::*;
use std::sync::Arc;
use term_grid::config::{ExecutorConfig, SearchOptions};
use term_grid::core::{CancellationToken, Row, RowSnapshot};
use term_grid::executor::BatchExecutor;
use term_grid::search::{levenshtein, run_search, similarity, SearchCriterion};
use term_grid::validation::{RowValidator, RuleDefinition};

fn snapshot_from(values: &[Option<i64>]) -> RowSnapshot {
    let rows = values
        .iter()
        .map(|value| match value {
            Some(v) => Row::new().with("amount", *v).with("label", format!("item {v}")),
            None => Row::new().with("label", "none"),
        })
        .collect();
    RowSnapshot::with_visible_columns(rows, ["amount", "label"]).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_outcomes_follow_row_order(
        values in prop::collection::vec(prop::option::weighted(0.8, -100i64..100), 0..400),
        batch_size in 1usize..64,
        max_concurrency in 1usize..8,
    ) {
        let snapshot = snapshot_from(&values);
        let rules = vec![
            RuleDefinition::required("amount"),
            RuleDefinition::range("amount", Some(0.0), Some(50.0)),
        ];
        let validator = Arc::new(RowValidator::new(&snapshot, rules, Default::default()).unwrap());
        let executor = BatchExecutor::new(
            ExecutorConfig::default()
                .with_batch_size(batch_size)
                .with_max_concurrency(max_concurrency),
        );

        let rt = tokio::runtime::Runtime::new().unwrap();
        let summary = rt.block_on(executor.execute(
            &snapshot,
            Arc::clone(&validator),
            &CancellationToken::new(),
        ));

        prop_assert!(summary.is_completed());
        prop_assert_eq!(summary.processed_rows, values.len());
        prop_assert_eq!(summary.per_row_outcomes.len(), values.len());
        for (index, outcome) in summary.per_row_outcomes.iter().enumerate() {
            prop_assert_eq!(outcome.row_index, index);
            let expected = validator.validate_row(index, &snapshot.rows()[index]);
            prop_assert_eq!(outcome, &expected);
        }
        prop_assert_eq!(summary.success_count + summary.failure_count, values.len());
    }

    #[test]
    fn test_capped_search_is_prefix_of_full_search(
        values in prop::collection::vec(prop::option::of(0i64..30), 1..200),
        max_results in 1usize..40,
        batch_size in 1usize..32,
    ) {
        let snapshot = snapshot_from(&values);
        let executor = BatchExecutor::new(
            ExecutorConfig::default()
                .with_batch_size(batch_size)
                .with_max_concurrency(4),
        );
        let criterion = SearchCriterion::new("1");
        let token = CancellationToken::new();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let (full, capped) = rt.block_on(async {
            let full = run_search(&executor, &snapshot, &criterion, &SearchOptions::default(), &token)
                .await
                .unwrap();
            let capped = run_search(
                &executor,
                &snapshot,
                &criterion,
                &SearchOptions::default().with_max_results(max_results),
                &token,
            )
            .await
            .unwrap();
            (full, capped)
        });

        let expected = full.len().min(max_results);
        prop_assert_eq!(capped.len(), expected);
        prop_assert_eq!(&capped.matches[..], &full.matches[..expected]);
        if full.len() > max_results {
            prop_assert!(capped.truncated);
        }
        if full.len() < max_results {
            prop_assert!(!capped.truncated);
        }
    }
}

proptest! {
    #[test]
    fn test_levenshtein_identity(a in "\\PC{0,24}") {
        prop_assert_eq!(levenshtein(&a, &a), 0);
    }

    #[test]
    fn test_levenshtein_symmetry(a in "\\PC{0,24}", b in "\\PC{0,24}") {
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
    }

    #[test]
    fn test_levenshtein_triangle_inequality(
        a in "[a-d]{0,12}",
        b in "[a-d]{0,12}",
        c in "[a-d]{0,12}",
    ) {
        prop_assert!(levenshtein(&a, &c) <= levenshtein(&a, &b) + levenshtein(&b, &c));
    }

    #[test]
    fn test_levenshtein_bounded_by_longer_input(a in "\\PC{0,24}", b in "\\PC{0,24}") {
        let longest = a.chars().count().max(b.chars().count());
        let shortest = a.chars().count().min(b.chars().count());
        let distance = levenshtein(&a, &b);
        prop_assert!(distance <= longest);
        prop_assert!(distance >= longest - shortest);
    }

    #[test]
    fn test_similarity_in_unit_interval(
        a in "\\PC{0,24}",
        b in "\\PC{0,24}",
        case_sensitive in any::<bool>(),
    ) {
        let score = similarity(&a, &b, case_sensitive);
        prop_assert!((0.0..=1.0).contains(&score), "similarity out of range: {}", score);
    }
}
