use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, patch, post, put},
};

/// Authenticated Router Module
///
/// Routes for signed-in members. The router assembly wraps this module in the
/// role gate with the member allow-list (user, moderator, admin), so every
/// handler here runs with a non-guest identity already established.
///
/// Access Control Strategy:
/// The gate only proves *who* the caller is; *what they may touch* is decided
/// per handler. Mutations whose target owner comes from the payload (profile,
/// password, comment authorship) check ownership explicitly; post and comment
/// edits/deletes are owner-scoped in the repository query itself.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Account self-service ---
        // PUT /users
        // Non-sensitive profile update; ownership check against the payload.
        .route("/users", put(handlers::update_user_profile))
        // PATCH /users/password
        // Password rotation; ownership check, fresh salted hash.
        .route("/users/password", patch(handlers::update_user_password))
        // DELETE /users/{id}
        // Self-deactivation. A flag flip; account rows are never removed.
        .route("/users/{id}", delete(handlers::deactivate_user))
        // --- Posts ---
        // POST /posts
        // Author id comes from the resolved identity, never the payload.
        .route("/posts", post(handlers::create_post).put(handlers::update_post))
        // DELETE /posts/{id}
        // Owner-scoped delete.
        .route("/posts/{id}", delete(handlers::delete_post))
        // --- Comments ---
        // POST /comments checks payload authorship against the identity;
        // PUT /comments is owner-scoped in the repository.
        .route(
            "/comments",
            post(handlers::create_comment).put(handlers::update_comment),
        )
        // DELETE /comments/{commentID}
        // Owner-scoped delete.
        .route("/comments/{commentID}", delete(handlers::delete_comment))
}
