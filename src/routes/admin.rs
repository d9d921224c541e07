use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Routes exclusively for the admin role, nested under `/admin` and wrapped
/// in the role gate with the admin-only allow-list at router assembly. The
/// gate is exact-match: a moderator is rejected here even though moderators
/// outrank ordinary members elsewhere.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // Full account listing including deactivated accounts, for moderation
        // and oversight.
        .route("/users", get(handlers::get_admin_users))
        // PUT /admin/users/{id}/role
        // Role assignment. Effective on the target's next request, since the
        // resolver re-reads the role from the store every time.
        .route("/users/{id}/role", put(handlers::set_user_role))
        // PUT /admin/users/{id}/active
        // Account activation/deactivation switch; deactivation demotes all of
        // the target's outstanding sessions to guest on their next use.
        .route("/users/{id}/active", put(handlers::set_user_active))
}
