use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::Favourite};

/// Access to the favourites store, the source of the per-request exclusion set
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavouritesStore: Send + Sync {
    /// Ids of every book the user has favourited
    ///
    /// Built once per feed request and reused across all retrieval tiers.
    async fn favourited_book_ids(&self, user_id: &str) -> AppResult<HashSet<Uuid>>;

    /// Record a new favourite for the user
    async fn insert(&self, user_id: &str, book_id: Uuid) -> AppResult<Favourite>;

    /// Remove a favourite owned by the user; returns whether a row was deleted
    async fn remove(&self, favourite_id: Uuid, user_id: &str) -> AppResult<bool>;
}

pub struct PgFavouritesStore {
    pool: PgPool,
}

impl PgFavouritesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FavouritesStore for PgFavouritesStore {
    async fn favourited_book_ids(&self, user_id: &str) -> AppResult<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT book_id
            FROM favourites
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn insert(&self, user_id: &str, book_id: Uuid) -> AppResult<Favourite> {
        let favourite = sqlx::query_as::<_, Favourite>(
            r#"
            INSERT INTO favourites (user_id, book_id)
            VALUES ($1, $2)
            RETURNING id, user_id, book_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(favourite)
    }

    async fn remove(&self, favourite_id: Uuid, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM favourites
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(favourite_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
