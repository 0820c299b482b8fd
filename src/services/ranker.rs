use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Candidate, RankedScore, ScoredCandidate};

/// Merges relevance scores onto candidates and produces one total order
///
/// Candidates absent from `scores` get 0.0. The resulting order is strict:
/// every tie is broken, so pagination over it is stable for unchanged data.
pub fn rank(candidates: Vec<Candidate>, scores: &[RankedScore]) -> Vec<ScoredCandidate> {
    let by_id: HashMap<Uuid, f64> = scores.iter().map(|s| (s.id, s.score)).collect();

    let mut merged: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score = by_id.get(&candidate.id).copied().unwrap_or(0.0);
            ScoredCandidate { candidate, score }
        })
        .collect();

    merged.sort_by(compare);
    merged
}

/// The feed's three-level comparator: score, then popularity, then id, all
/// descending. Uuid ordering coincides with comparing the hyphenated
/// lowercase string forms, so the id tie-break uses `Uuid`'s `Ord` directly.
fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.candidate.popularity.total_cmp(&a.candidate.popularity))
        .then_with(|| b.candidate.id.cmp(&a.candidate.id))
}
