use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Book, Favourite, Profile};

use super::AppState;

/// Header carrying the authenticated user id, supplied by the identity layer
pub const USER_ID_HEADER: &str = "x-user-id";

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 50;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<Book>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFavouriteRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FavouriteResponse {
    pub id: Uuid,
    pub book_id: Uuid,
}

impl From<&Favourite> for FavouriteResponse {
    fn from(favourite: &Favourite) -> Self {
        Self {
            id: favourite.id,
            book_id: favourite.book_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub language: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub favorite_authors: Vec<String>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Personalized discover feed with opaque cursor pagination
pub async fn get_discover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DiscoverParams>,
) -> AppResult<Json<FeedResponse>> {
    let user_id = require_user_id(&headers)?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let page = state
        .discover
        .feed(&user_id, limit, params.cursor.as_deref())
        .await?;

    Ok(Json(FeedResponse {
        items: page.items,
        next_cursor: page.next_cursor,
    }))
}

/// Fetch one catalog book
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Book>> {
    let book = state
        .catalog
        .book_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

    Ok(Json(book))
}

/// Record a favourite for the caller
pub async fn create_favourite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateFavouriteRequest>,
) -> AppResult<(StatusCode, Json<FavouriteResponse>)> {
    let user_id = require_user_id(&headers)?;

    let favourite = state.favourites.insert(&user_id, request.book_id).await?;

    Ok((StatusCode::CREATED, Json(FavouriteResponse::from(&favourite))))
}

/// Remove a favourite owned by the caller
pub async fn delete_favourite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user_id = require_user_id(&headers)?;

    let removed = state.favourites.remove(id, &user_id).await?;
    if !removed {
        return Err(AppError::NotFound(format!("Favourite {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Get the caller's profile, defaulting to an empty one
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Profile>> {
    let user_id = require_user_id(&headers)?;

    let profile = state
        .profiles
        .by_user_id(&user_id)
        .await?
        .unwrap_or_else(|| Profile::empty(&user_id));

    Ok(Json(profile))
}

/// Insert or replace the caller's profile
pub async fn upsert_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpsertProfileRequest>,
) -> AppResult<Json<Profile>> {
    let user_id = require_user_id(&headers)?;

    let profile = Profile {
        user_id,
        language: request.language,
        region: request.region,
        genres: request.genres,
        favorite_authors: request.favorite_authors,
    };
    let stored = state.profiles.upsert(&profile).await?;

    Ok(Json(stored))
}

fn require_user_id(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))
}
