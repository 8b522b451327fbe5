//! Result merging across semantic-search backends.

use crate::types::SearchHit;
use catalyst_core::ScoreOrder;
use std::cmp::Ordering;

/// Combine hit batches into one list ranked best-first, truncated to `limit`.
///
/// The sort is stable: hits with equal scores keep the order in which their
/// batches (and positions within a batch) were supplied. NaN scores always
/// rank last.
pub fn merge_hits<I>(batches: I, order: ScoreOrder, limit: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = Vec<SearchHit>>,
{
    let mut merged: Vec<SearchHit> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| compare_scores(a.score, b.score, order));
    merged.truncate(limit);
    merged
}

/// `Less` means `a` ranks ahead of `b`.
pub fn compare_scores(a: f32, b: f32, order: ScoreOrder) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match order {
            ScoreOrder::HigherIsBetter => b.total_cmp(&a),
            ScoreOrder::LowerIsBetter => a.total_cmp(&b),
        },
    }
}
