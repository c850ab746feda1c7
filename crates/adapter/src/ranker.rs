//! Ordering of competing exchange candidates for one placement.

use crate::types::AdCandidate;

/// Order candidates by descending CPM.
///
/// Missing prices rank as `0.0`. The sort is stable, so candidates with equal
/// prices keep their input order.
#[must_use]
pub fn rank_candidates(mut candidates: Vec<AdCandidate>) -> Vec<AdCandidate> {
    candidates.sort_by(|a, b| b.price().total_cmp(&a.price()));
    candidates
}

/// The candidate that wins the placement, if any.
#[must_use]
pub fn select_winner(ranked: &[AdCandidate]) -> Option<&AdCandidate> {
    ranked.first()
}
