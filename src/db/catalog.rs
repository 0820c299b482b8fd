use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::Book};

/// Read access to the book catalog
///
/// The feed needs exactly three query shapes: popularity-ordered rows with an
/// optional language filter, recency-ordered rows for the terminal fallback
/// tier, and membership hydration by id list.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Books ordered by `(rating DESC, published_at DESC)`, optionally
    /// restricted to one language.
    async fn top_rated<'a>(&self, language: Option<&'a str>, limit: i64) -> AppResult<Vec<Book>>;

    /// Books ordered by `published_at DESC` alone.
    async fn latest(&self, limit: i64) -> AppResult<Vec<Book>>;

    /// Full rows for the given ids, in no guaranteed order.
    async fn books_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>>;

    /// A single row by id.
    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn top_rated<'a>(&self, language: Option<&'a str>, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genres, description, rating, published_at, language, image_url
            FROM books
            WHERE $1::text IS NULL OR language = $1
            ORDER BY rating DESC, published_at DESC
            LIMIT $2
            "#,
        )
        .bind(language)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn latest(&self, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genres, description, rating, published_at, language, image_url
            FROM books
            ORDER BY published_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn books_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genres, description, rating, published_at, language, image_url
            FROM books
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, genres, description, rating, published_at, language, image_url
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }
}
