use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and to integration tests.
pub use auth::{ClockState, Identity, SystemClock};
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application, aggregating all paths and schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout,
        handlers::get_all_users, handlers::get_user,
        handlers::update_user_profile, handlers::update_user_password,
        handlers::deactivate_user,
        handlers::get_posts, handlers::get_post, handlers::get_posts_by_user,
        handlers::get_posts_by_category, handlers::create_post,
        handlers::update_post, handlers::delete_post,
        handlers::get_comment, handlers::get_comments_by_post,
        handlers::get_comments_by_user, handlers::create_comment,
        handlers::update_comment, handlers::delete_comment,
        handlers::get_admin_users, handlers::set_user_role,
        handlers::set_user_active,
    ),
    components(
        schemas(
            models::Role, models::UserResponse, models::RegisterRequest,
            models::LoginRequest, models::LoginResponse,
            models::UpdateProfileRequest, models::UpdatePasswordRequest,
            models::Post, models::CreatePostRequest, models::UpdatePostRequest,
            models::Comment, models::CreateCommentRequest,
            models::UpdateCommentRequest,
        )
    ),
    tags(
        (name = "forum-portal", description = "Forum content platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding the application's
/// explicit dependency set: the session/content store, the clock, and the
/// loaded configuration. Constructed once at process start and shared across
/// all requests; there is no global mutable state anywhere else.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Time source used by session issuance and expiry checks.
    pub clock: ClockState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let components selectively pull their dependencies from the shared
// AppState instead of receiving the whole state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for ClockState {
    fn from_ref(app_state: &AppState) -> ClockState {
        app_state.clock.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
///
/// Pipeline order for a gated request:
/// identity resolver (global, never rejects on token grounds) → role gate
/// (per route group, terminal on failure) → handler (which may apply an
/// ownership check). Allow-lists are fixed here at wiring time.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no gate.
        .merge(public::public_routes())
        // Member routes: gated on the member allow-list.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn(
                |req: Request, next: Next| auth::require_role(auth::STAFF_ROLES, req, next),
            )),
        )
        // Admin routes: nested under '/admin', gated on the admin-only list.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn(
                |req: Request, next: Next| auth::require_role(auth::ADMIN_ROLES, req, next),
            )),
        )
        // Identity resolution runs on every route above, before any gate.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_identity,
        ))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span correlated by the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: includes the
/// `x-request-id` header alongside the method and URI, so every log line for
/// a request is correlated by a unique id. Session tokens are never part of
/// the span, only the synthetic request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
