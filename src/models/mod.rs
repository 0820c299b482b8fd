use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum description length carried into a candidate projection
pub const CANDIDATE_DESCRIPTION_LIMIT: usize = 280;

/// A catalog book as stored in Postgres
///
/// Immutable from this service's viewpoint; the catalog is populated by
/// external seeding scripts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genres: Vec<String>,
    pub description: Option<String>,
    pub rating: f64,
    pub published_at: DateTime<Utc>,
    pub language: Option<String>,
    pub image_url: Option<String>,
}

/// A user's reading profile
///
/// Unknown users are represented by [`Profile::empty`], never by an error.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: String,
    pub language: Option<String>,
    pub region: Option<String>,
    pub genres: Vec<String>,
    pub favorite_authors: Vec<String>,
}

impl Profile {
    /// Default profile for a user with no stored preferences
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language: None,
            region: None,
            genres: Vec::new(),
            favorite_authors: Vec::new(),
        }
    }
}

/// A favourite record linking a user to a book
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favourite {
    pub id: Uuid,
    pub user_id: String,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Compact projection of a [`Book`] used for scoring and ranking
///
/// Derived per request; exists only for the duration of one feed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genres: Vec<String>,
    pub description: String,
    pub popularity: f64,
    pub recency: DateTime<Utc>,
    pub language: Option<String>,
}

impl From<&Book> for Candidate {
    fn from(book: &Book) -> Self {
        let description = book
            .description
            .as_deref()
            .map(|d| d.chars().take(CANDIDATE_DESCRIPTION_LIMIT).collect())
            .unwrap_or_default();

        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            genres: book.genres.clone(),
            description,
            popularity: book.rating,
            recency: book.published_at,
            language: book.language.clone(),
        }
    }
}

/// A candidate with its merged relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// One scorer output entry: a candidate id with its relevance score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedScore {
    pub id: Uuid,
    pub score: f64,
}
