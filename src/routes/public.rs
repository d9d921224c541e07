use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are accessible to any client, anonymous or signed
/// in. These routes carry no role gate: the identity resolver runs (so a
/// valid token still yields an identity), but a guest identity is fine here.
///
/// `POST /login` and `POST /logout` belong here: login cannot require a
/// session, and logout must succeed even with a dead or missing token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Account creation; new accounts start with the standard member role.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Credential verification followed by session issuance. The token in
        // the response is the one clients send back as `Authorization: Bearer`.
        .route("/login", post(handlers::login))
        // POST /logout
        // Session termination; idempotent by design.
        .route("/logout", post(handlers::logout))
        // GET /users, /users/{id}
        // Sanitized account listings; password hashes never leave the
        // repository layer.
        .route("/users", get(handlers::get_all_users))
        .route("/users/{id}", get(handlers::get_user))
        // GET /posts and its filtered variants.
        .route("/posts", get(handlers::get_posts))
        .route("/posts/{id}", get(handlers::get_post))
        .route("/posts/user/{userID}", get(handlers::get_posts_by_user))
        .route(
            "/posts/category/{categoryID}",
            get(handlers::get_posts_by_category),
        )
        // GET /comments lookups.
        .route("/comments/{commentID}", get(handlers::get_comment))
        .route("/comments/post/{postID}", get(handlers::get_comments_by_post))
        .route("/comments/user/{userID}", get(handlers::get_comments_by_user))
}
