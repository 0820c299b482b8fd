use std::sync::Arc;

use crate::db::{CatalogStore, FavouritesStore, ProfileStore};
use crate::services::{scorer::RelevanceScorer, DiscoverService};

/// Shared application state
///
/// Stores are trait objects so the HTTP surface is wired identically over
/// Postgres in production and in-memory fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub discover: Arc<DiscoverService>,
    pub catalog: Arc<dyn CatalogStore>,
    pub favourites: Arc<dyn FavouritesStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    /// Wires the discover pipeline over the given stores and scorer
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        favourites: Arc<dyn FavouritesStore>,
        profiles: Arc<dyn ProfileStore>,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Self {
        let discover = Arc::new(DiscoverService::new(
            catalog.clone(),
            favourites.clone(),
            profiles.clone(),
            scorer,
        ));

        Self {
            discover,
            catalog,
            favourites,
            profiles,
        }
    }
}
