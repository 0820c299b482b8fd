use crate::models::{Candidate, Profile, RankedScore};

pub mod openai;

pub use openai::OpenAiScorer;

/// Score assigned when the external oracle is skipped or unavailable
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Capability interface over the external relevance-scoring oracle
///
/// This is the system's single externally-dependent, partially-untrusted
/// step and the only place permitted to degrade silently. Implementations
/// never fail: every error, timeout, or malformed response is absorbed into
/// the neutral-score fallback.
#[async_trait::async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// One relevance score per candidate, in oracle-ranked order
    async fn score(&self, profile: &Profile, candidates: &[Candidate]) -> Vec<RankedScore>;

    /// Scorer name for logging
    fn name(&self) -> &'static str;
}

/// Uniform neutral scores for a candidate slice
pub fn neutral_scores(candidates: &[Candidate]) -> Vec<RankedScore> {
    candidates
        .iter()
        .map(|c| RankedScore { id: c.id, score: NEUTRAL_SCORE })
        .collect()
}

/// Scorer used when no credential is configured
///
/// With every score equal, the ranker's tie-breaks take over and the feed
/// degrades to `(popularity DESC, id DESC)` ordering.
pub struct NeutralScorer;

#[async_trait::async_trait]
impl RelevanceScorer for NeutralScorer {
    async fn score(&self, _profile: &Profile, candidates: &[Candidate]) -> Vec<RankedScore> {
        neutral_scores(candidates)
    }

    fn name(&self) -> &'static str {
        "neutral"
    }
}
