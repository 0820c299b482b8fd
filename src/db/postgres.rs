use sqlx::{postgres::PgPoolOptions, PgPool};

/// Upper bound on pooled connections
///
/// Every feed request issues at most a handful of short read queries
/// (profile, favourites, one or two cascade tiers, window hydration), so a
/// small pool suffices.
const MAX_CONNECTIONS: u32 = 5;

/// Creates the PostgreSQL connection pool shared by the catalog, profile,
/// and favourites stores
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    Ok(pool)
}
