use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Every route here is wrapped by the authentication middleware one level up, so
/// anonymous requests are redirected to the login flow before reaching a handler.
/// Edit and delete handlers additionally run the ownership guard, which sends
/// non-authors back to the post instead of acting.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /profile/{username}/edit/
        // Owner-only. Shares the parameter name with the public profile route.
        .route("/profile/{username}/edit/", post(handlers::edit_profile))
        // --- Posts ---
        // POST /posts/create/
        // The actor is stamped as author.
        .route("/posts/create/", post(handlers::create_post))
        .route("/posts/{id}/edit/", post(handlers::edit_post))
        // POST /posts/{id}/delete/
        // Comments are deleted with the post.
        .route("/posts/{id}/delete/", post(handlers::delete_post))
        // --- Comments ---
        // Path parameters keep the name `id` for the post in every route sharing
        // the `/posts/{id}/` prefix, as the router requires.
        .route("/posts/{id}/comment/", post(handlers::add_comment))
        .route(
            "/posts/{id}/edit_comment/{comment_id}/",
            post(handlers::edit_comment),
        )
        .route(
            "/posts/{id}/delete_comment/{comment_id}/",
            post(handlers::delete_comment),
        )
}
