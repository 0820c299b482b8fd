use sqlx::PgPool;

use crate::{error::AppResult, models::Profile};

/// Access to stored reading profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profile for a user id; unknown users yield `None`, never an error
    async fn by_user_id(&self, user_id: &str) -> AppResult<Option<Profile>>;

    /// Insert or fully replace the user's profile
    async fn upsert(&self, profile: &Profile) -> AppResult<Profile>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn by_user_id(&self, user_id: &str) -> AppResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT user_id, language, region, genres, favorite_authors
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn upsert(&self, profile: &Profile) -> AppResult<Profile> {
        let stored = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, language, region, genres, favorite_authors)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                language = EXCLUDED.language,
                region = EXCLUDED.region,
                genres = EXCLUDED.genres,
                favorite_authors = EXCLUDED.favorite_authors
            RETURNING user_id, language, region, genres, favorite_authors
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.language)
        .bind(&profile.region)
        .bind(&profile.genres)
        .bind(&profile.favorite_authors)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }
}
