use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use bookfeed_api::api::{create_router, AppState};
use bookfeed_api::config::Config;
use bookfeed_api::db::{create_pool, PgCatalogStore, PgFavouritesStore, PgProfileStore};
use bookfeed_api::services::scorer::{NeutralScorer, OpenAiScorer, RelevanceScorer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    // Credential presence selects the scorer; either way the feed serves.
    let scorer: Arc<dyn RelevanceScorer> = match config.openai_api_key.clone() {
        Some(api_key) => Arc::new(OpenAiScorer::new(
            api_key,
            config.openai_api_url.clone(),
            config.openai_model.clone(),
            Duration::from_secs(config.scorer_timeout_secs),
        )),
        None => Arc::new(NeutralScorer),
    };
    tracing::info!(scorer = scorer.name(), "Relevance scorer selected");

    let state = AppState::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        Arc::new(PgFavouritesStore::new(pool.clone())),
        Arc::new(PgProfileStore::new(pool)),
        scorer,
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
