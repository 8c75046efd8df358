use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only pages. Every feed applies the visibility rule, except a user's own
/// profile; the detail page also shows hidden posts to their author.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /?page=N
        .route("/", get(handlers::index))
        // GET /posts/{id}/
        // The post and its comments, oldest first.
        .route("/posts/{id}/", get(handlers::post_detail))
        // GET /category/{slug}/?page=N
        // 404 unless the category exists and is published.
        .route("/category/{slug}/", get(handlers::category_posts))
        // GET /profile/{username}/?page=N
        .route("/profile/{username}/", get(handlers::profile))
}
