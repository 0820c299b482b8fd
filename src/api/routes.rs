use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Discover feed
        .route("/discover", get(handlers::get_discover))
        // Catalog
        .route("/books/:id", get(handlers::get_book))
        // Favourites
        .route("/favourites", post(handlers::create_favourite))
        .route("/favourites/:id", delete(handlers::delete_favourite))
        // Profile
        .route("/profile", get(handlers::get_profile).put(handlers::upsert_profile))
}
