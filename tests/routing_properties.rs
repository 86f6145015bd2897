//! Property-based tests for routing invariants

use campus_advisor::category::Category;
use campus_advisor::routing::{normalize_query, select_targets};
use quickcheck_macros::quickcheck;
use std::collections::HashMap;

#[quickcheck]
fn normalize_is_idempotent(query: String) -> bool {
    let once = normalize_query(&query);
    normalize_query(&once) == once
}

#[quickcheck]
fn normalize_collapses_whitespace_variants(query: String) -> bool {
    let padded = format!("  {}\t ", query.replace(' ', "   "));
    normalize_query(&padded) == normalize_query(&query)
}

#[quickcheck]
fn targets_never_empty_and_within_closed_set(scores: Vec<(u8, f64)>) -> bool {
    let mut confidences = HashMap::new();
    for (idx, score) in scores {
        let category = Category::ALL[idx as usize % Category::ALL.len()];
        confidences.insert(category, score);
    }

    let targets = select_targets(&confidences, 0.5);

    !targets.is_empty() && targets.iter().all(|t| Category::ALL.contains(t))
}

#[quickcheck]
fn targets_sorted_by_priority(scores: Vec<(u8, f64)>) -> bool {
    let mut confidences = HashMap::new();
    for (idx, score) in scores {
        let category = Category::ALL[idx as usize % Category::ALL.len()];
        confidences.insert(category, score.clamp(0.0, 1.0));
    }

    let targets = select_targets(&confidences, 0.5);

    targets.windows(2).all(|w| w[0].priority() < w[1].priority())
}
