use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use bookfeed_api::api::{create_router, AppState};
use bookfeed_api::db::{CatalogStore, FavouritesStore, ProfileStore};
use bookfeed_api::error::AppResult;
use bookfeed_api::models::{Book, Candidate, Favourite, Profile, RankedScore};
use bookfeed_api::services::scorer::{NeutralScorer, RelevanceScorer};

/// In-memory stand-in for all three Postgres stores
#[derive(Default)]
struct InMemoryStore {
    books: Vec<Book>,
    favourites: Mutex<Vec<Favourite>>,
    profiles: Mutex<HashMap<String, Profile>>,
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn top_rated<'a>(&self, language: Option<&'a str>, limit: i64) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .books
            .iter()
            .filter(|b| language.is_none() || b.language.as_deref() == language)
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        books.truncate(limit as usize);
        Ok(books)
    }

    async fn latest(&self, limit: i64) -> AppResult<Vec<Book>> {
        let mut books = self.books.clone();
        books.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        books.truncate(limit as usize);
        Ok(books)
    }

    async fn books_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        Ok(self
            .books
            .iter()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn book_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.books.iter().find(|b| b.id == id).cloned())
    }
}

#[async_trait::async_trait]
impl FavouritesStore for InMemoryStore {
    async fn favourited_book_ids(&self, user_id: &str) -> AppResult<HashSet<Uuid>> {
        Ok(self
            .favourites
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.book_id)
            .collect())
    }

    async fn insert(&self, user_id: &str, book_id: Uuid) -> AppResult<Favourite> {
        let favourite = Favourite {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            book_id,
            created_at: chrono::Utc::now(),
        };
        self.favourites.lock().unwrap().push(favourite.clone());
        Ok(favourite)
    }

    async fn remove(&self, favourite_id: Uuid, user_id: &str) -> AppResult<bool> {
        let mut favourites = self.favourites.lock().unwrap();
        let before = favourites.len();
        favourites.retain(|f| !(f.id == favourite_id && f.user_id == user_id));
        Ok(favourites.len() < before)
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryStore {
    async fn by_user_id(&self, user_id: &str) -> AppResult<Option<Profile>> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn upsert(&self, profile: &Profile) -> AppResult<Profile> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile.clone())
    }
}

/// Scorer with scripted per-book scores, for ordering-sensitive tests
struct ScriptedScorer {
    scores: HashMap<Uuid, f64>,
}

#[async_trait::async_trait]
impl RelevanceScorer for ScriptedScorer {
    async fn score(&self, _profile: &Profile, candidates: &[Candidate]) -> Vec<RankedScore> {
        candidates
            .iter()
            .map(|c| RankedScore {
                id: c.id,
                score: self.scores.get(&c.id).copied().unwrap_or(0.0),
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn book(n: u128, rating: f64, published_at: &str, language: &str) -> Book {
    Book {
        id: Uuid::from_u128(n),
        title: format!("Book {}", n),
        author: "Author".to_string(),
        genres: vec!["fiction".to_string()],
        description: Some("A story.".to_string()),
        rating,
        published_at: published_at.parse().unwrap(),
        language: Some(language.to_string()),
        image_url: None,
    }
}

fn create_test_server(books: Vec<Book>, scorer: Arc<dyn RelevanceScorer>) -> TestServer {
    let store = Arc::new(InMemoryStore {
        books,
        ..Default::default()
    });
    let state = AppState::new(store.clone(), store.clone(), store, scorer);
    TestServer::new(create_router(state)).unwrap()
}

fn user_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static("user-1"),
    )
}

fn page_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(vec![], Arc::new(NeutralScorer));
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_discover_requires_user_header() {
    let server = create_test_server(vec![], Arc::new(NeutralScorer));
    let response = server.get("/api/v1/discover").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_discover_empty_catalog_returns_empty_page() {
    let server = create_test_server(vec![], Arc::new(NeutralScorer));
    let (name, value) = user_header();

    let response = server.get("/api/v1/discover").add_header(name, value).await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert!(page_ids(&body).is_empty());
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn test_discover_degraded_order_is_rating_then_id_descending() {
    // Neutral scores collapse the comparator to (popularity, id) descending.
    let books = vec![
        book(1, 3.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 5.0, "2021-01-01T00:00:00Z", "en"),
        book(4, 4.0, "2019-01-01T00:00:00Z", "en"),
        book(3, 4.0, "2022-01-01T00:00:00Z", "en"),
        book(5, 1.0, "2023-01-01T00:00:00Z", "en"),
    ];
    let server = create_test_server(books, Arc::new(NeutralScorer));
    let (name, value) = user_header();

    let response = server.get("/api/v1/discover").add_header(name, value).await;
    response.assert_status_ok();
    let body: Value = response.json();

    let expected: Vec<String> = [2u128, 4, 3, 1, 5]
        .iter()
        .map(|n| Uuid::from_u128(*n).to_string())
        .collect();
    assert_eq!(page_ids(&body), expected);
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn test_discover_scripted_scores_override_popularity() {
    let books = vec![
        book(1, 5.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 1.0, "2021-01-01T00:00:00Z", "en"),
    ];
    let scores = HashMap::from([
        (Uuid::from_u128(1), 0.1),
        (Uuid::from_u128(2), 0.9),
    ]);
    let server = create_test_server(books, Arc::new(ScriptedScorer { scores }));
    let (name, value) = user_header();

    let response = server.get("/api/v1/discover").add_header(name, value).await;
    let body: Value = response.json();

    assert_eq!(
        page_ids(&body),
        vec![
            Uuid::from_u128(2).to_string(),
            Uuid::from_u128(1).to_string()
        ]
    );
}

#[tokio::test]
async fn test_discover_pagination_partitions_the_order() {
    let books: Vec<Book> = (1..=5)
        .map(|n| book(n, n as f64, "2021-01-01T00:00:00Z", "en"))
        .collect();
    let scores: HashMap<Uuid, f64> = (1..=5u128)
        .map(|n| (Uuid::from_u128(n), n as f64 / 10.0))
        .collect();
    let server = create_test_server(books, Arc::new(ScriptedScorer { scores }));

    let mut seen: Vec<String> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let (name, value) = user_header();
        let mut request = server
            .get("/api/v1/discover")
            .add_header(name, value)
            .add_query_param("limit", 2);
        if let Some(token) = &cursor {
            request = request.add_query_param("cursor", token);
        }
        let response = request.await;
        response.assert_status_ok();
        let body: Value = response.json();

        let ids = page_ids(&body);
        pages += 1;
        seen.extend(ids);

        match body["next_cursor"].as_str() {
            Some(token) => cursor = Some(token.to_string()),
            None => break,
        }
    }

    // Highest score first: 5, 4, 3, 2, 1 across pages [2, 2, 1].
    let expected: Vec<String> = [5u128, 4, 3, 2, 1]
        .iter()
        .map(|n| Uuid::from_u128(*n).to_string())
        .collect();
    assert_eq!(seen, expected);
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_discover_invalid_cursor_restarts_from_top() {
    let books = vec![
        book(1, 2.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 4.0, "2021-01-01T00:00:00Z", "en"),
    ];
    let server = create_test_server(books, Arc::new(NeutralScorer));

    let (name, value) = user_header();
    let first: Value = server
        .get("/api/v1/discover")
        .add_header(name, value)
        .await
        .json();

    let (name, value) = user_header();
    let garbled: Value = server
        .get("/api/v1/discover")
        .add_header(name, value)
        .add_query_param("cursor", "%%%not-a-cursor%%%")
        .await
        .json();

    assert_eq!(page_ids(&first), page_ids(&garbled));
}

#[tokio::test]
async fn test_favourited_book_never_appears_in_feed() {
    let favourite_id = Uuid::from_u128(2);
    let books = vec![
        book(1, 2.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 5.0, "2021-01-01T00:00:00Z", "en"),
        book(3, 3.0, "2022-01-01T00:00:00Z", "en"),
    ];
    let server = create_test_server(books, Arc::new(NeutralScorer));

    let (name, value) = user_header();
    let created = server
        .post("/api/v1/favourites")
        .add_header(name, value)
        .json(&json!({ "book_id": favourite_id }))
        .await;
    created.assert_status(StatusCode::CREATED);

    let (name, value) = user_header();
    let body: Value = server
        .get("/api/v1/discover")
        .add_header(name, value)
        .await
        .json();

    // The top-rated book is excluded despite its rating.
    assert!(!page_ids(&body).contains(&favourite_id.to_string()));
    assert_eq!(page_ids(&body).len(), 2);
}

#[tokio::test]
async fn test_removing_favourite_restores_book_to_feed() {
    let books = vec![
        book(1, 2.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 5.0, "2021-01-01T00:00:00Z", "en"),
    ];
    let server = create_test_server(books, Arc::new(NeutralScorer));

    let (name, value) = user_header();
    let created: Value = server
        .post("/api/v1/favourites")
        .add_header(name, value)
        .json(&json!({ "book_id": Uuid::from_u128(2) }))
        .await
        .json();
    let favourite_id = created["id"].as_str().unwrap();

    let (name, value) = user_header();
    let deleted = server
        .delete(&format!("/api/v1/favourites/{}", favourite_id))
        .add_header(name, value)
        .await;
    deleted.assert_status(StatusCode::NO_CONTENT);

    let (name, value) = user_header();
    let body: Value = server
        .get("/api/v1/discover")
        .add_header(name, value)
        .await
        .json();
    assert!(page_ids(&body).contains(&Uuid::from_u128(2).to_string()));
}

#[tokio::test]
async fn test_delete_unknown_favourite_returns_not_found() {
    let server = create_test_server(vec![], Arc::new(NeutralScorer));
    let (name, value) = user_header();

    let response = server
        .delete(&format!("/api/v1/favourites/{}", Uuid::new_v4()))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_profile_language_falls_back_to_relaxed_tier() {
    let books = vec![
        book(1, 2.0, "2020-01-01T00:00:00Z", "en"),
        book(2, 4.0, "2021-01-01T00:00:00Z", "en"),
    ];
    let server = create_test_server(books, Arc::new(NeutralScorer));

    let (name, value) = user_header();
    server
        .put("/api/v1/profile")
        .add_header(name, value)
        .json(&json!({ "language": "xx" }))
        .await
        .assert_status_ok();

    let (name, value) = user_header();
    let body: Value = server
        .get("/api/v1/discover")
        .add_header(name, value)
        .await
        .json();

    // No "xx" books exist; the relaxed tier serves instead of an empty page.
    assert_eq!(page_ids(&body).len(), 2);
}

#[tokio::test]
async fn test_profile_get_defaults_then_roundtrips_after_put() {
    let server = create_test_server(vec![], Arc::new(NeutralScorer));

    let (name, value) = user_header();
    let initial: Value = server
        .get("/api/v1/profile")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(initial["user_id"], "user-1");
    assert!(initial["language"].is_null());
    assert_eq!(initial["genres"], json!([]));

    let (name, value) = user_header();
    let updated: Value = server
        .put("/api/v1/profile")
        .add_header(name, value)
        .json(&json!({
            "language": "en",
            "region": "uk",
            "genres": ["sci-fi"],
            "favorite_authors": ["Le Guin"]
        }))
        .await
        .json();
    assert_eq!(updated["language"], "en");

    let (name, value) = user_header();
    let fetched: Value = server
        .get("/api/v1/profile")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(fetched["language"], "en");
    assert_eq!(fetched["region"], "uk");
    assert_eq!(fetched["genres"], json!(["sci-fi"]));
    assert_eq!(fetched["favorite_authors"], json!(["Le Guin"]));
}

#[tokio::test]
async fn test_get_book_by_id() {
    let books = vec![book(1, 4.0, "2020-01-01T00:00:00Z", "en")];
    let server = create_test_server(books, Arc::new(NeutralScorer));

    let found: Value = server
        .get(&format!("/api/v1/books/{}", Uuid::from_u128(1)))
        .await
        .json();
    assert_eq!(found["title"], "Book 1");

    let missing = server
        .get(&format!("/api/v1/books/{}", Uuid::new_v4()))
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}
