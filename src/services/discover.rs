use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{CatalogStore, FavouritesStore, ProfileStore},
    error::AppResult,
    models::{Book, Candidate, Profile},
    services::{cursor, ranker, scorer::RelevanceScorer},
};

/// Cap on the candidate slice handed to the scorer, bounding external-call
/// cost regardless of how many rows retrieval produced
pub const MAX_SCORED_CANDIDATES: usize = 150;

/// Floor on the terminal recency tier's query limit
const RECENCY_TIER_MIN: usize = 20;

/// Floor on the popularity tiers' query limit
const TOP_RATED_MIN: usize = 100;

/// One retrieval strategy in the fallback cascade
///
/// Tiers are tried in order; a tier is used only if every prior tier came
/// back empty after exclusion. Storage errors are fatal at any tier —
/// fallback happens on empty results only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetrievalTier {
    /// Popularity-ordered, restricted to the profile language
    Filtered,
    /// Popularity-ordered, language filter dropped
    Relaxed,
    /// Recency-ordered, terminal: its result is final even if empty
    RecencyOnly,
}

/// One page of the discover feed
#[derive(Debug)]
pub struct FeedPage {
    pub items: Vec<Book>,
    pub next_cursor: Option<String>,
}

/// The personalized discovery pipeline
///
/// Composes profile load, exclusion build, cascading retrieval, external
/// relevance scoring, deterministic ranking, and cursor pagination into one
/// request-scoped computation. Nothing is cached across requests.
pub struct DiscoverService {
    catalog: Arc<dyn CatalogStore>,
    favourites: Arc<dyn FavouritesStore>,
    profiles: Arc<dyn ProfileStore>,
    scorer: Arc<dyn RelevanceScorer>,
}

impl DiscoverService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        favourites: Arc<dyn FavouritesStore>,
        profiles: Arc<dyn ProfileStore>,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Self {
        Self {
            catalog,
            favourites,
            profiles,
            scorer,
        }
    }

    /// Computes one feed page for the user
    ///
    /// `limit` must already be clamped by the caller. The cursor names the
    /// position after which the page starts; invalid or stale cursors
    /// restart from the top.
    pub async fn feed(
        &self,
        user_id: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> AppResult<FeedPage> {
        // Profile and exclusion set have no data dependency; load them
        // concurrently. The scorer call must wait for the candidate slice.
        let (profile, exclude) = tokio::try_join!(
            self.profiles.by_user_id(user_id),
            self.favourites.favourited_book_ids(user_id),
        )?;
        let profile = profile.unwrap_or_else(|| Profile::empty(user_id));

        let books = self.retrieve_candidates(&profile, &exclude, limit).await?;
        let candidates: Vec<Candidate> = books
            .iter()
            .take(MAX_SCORED_CANDIDATES)
            .map(Candidate::from)
            .collect();

        let scores = self.scorer.score(&profile, &candidates).await;
        let ranked = ranker::rank(candidates, &scores);

        let (window, next_cursor) = cursor::paginate(&ranked, cursor, limit);
        let ids: Vec<Uuid> = window.iter().map(|s| s.candidate.id).collect();
        if ids.is_empty() {
            return Ok(FeedPage {
                items: Vec::new(),
                next_cursor: None,
            });
        }

        // Hydrate the window back to full catalog rows, preserving rank order
        let rows = self.catalog.books_by_ids(&ids).await?;
        let by_id: HashMap<Uuid, Book> = rows.into_iter().map(|b| (b.id, b)).collect();
        let items: Vec<Book> = ids.iter().filter_map(|id| by_id.get(id).cloned()).collect();

        tracing::debug!(
            user_id = %profile.user_id,
            ranked = ranked.len(),
            page = items.len(),
            has_next = next_cursor.is_some(),
            "Discover feed page computed"
        );

        Ok(FeedPage { items, next_cursor })
    }

    /// Runs the fallback cascade and returns the first non-empty
    /// post-exclusion tier result
    async fn retrieve_candidates(
        &self,
        profile: &Profile,
        exclude: &HashSet<Uuid>,
        limit: usize,
    ) -> AppResult<Vec<Book>> {
        let top_k = (limit * 5).max(TOP_RATED_MIN) as i64;

        for &tier in Self::cascade(profile) {
            let rows = match tier {
                RetrievalTier::Filtered => {
                    self.catalog.top_rated(profile.language.as_deref(), top_k).await?
                }
                RetrievalTier::Relaxed => self.catalog.top_rated(None, top_k).await?,
                RetrievalTier::RecencyOnly => {
                    self.catalog.latest(limit.max(RECENCY_TIER_MIN) as i64).await?
                }
            };

            let kept: Vec<Book> = rows
                .into_iter()
                .filter(|book| !exclude.contains(&book.id))
                .collect();

            if !kept.is_empty() || tier == RetrievalTier::RecencyOnly {
                tracing::debug!(?tier, candidates = kept.len(), "Retrieval tier satisfied");
                return Ok(kept);
            }
            tracing::debug!(?tier, "Retrieval tier empty after exclusion, widening");
        }

        // The cascade always terminates at RecencyOnly above.
        Ok(Vec::new())
    }

    /// Tier order for this profile. Without a profile language the Filtered
    /// tier would be query-identical to Relaxed, so it is skipped.
    fn cascade(profile: &Profile) -> &'static [RetrievalTier] {
        if profile.language.is_some() {
            &[
                RetrievalTier::Filtered,
                RetrievalTier::Relaxed,
                RetrievalTier::RecencyOnly,
            ]
        } else {
            &[RetrievalTier::Relaxed, RetrievalTier::RecencyOnly]
        }
    }
}
