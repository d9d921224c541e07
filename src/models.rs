use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The closed set of authorization roles. Stored in the database as the
/// `user_role` enum; compared by exact membership against per-route allow-lists.
/// There is no implied hierarchy: `Admin` is not a superset of `Moderator`
/// unless a route lists both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, TS, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// The unauthenticated default. Anonymous callers resolve to this role;
    /// it never appears in a route allow-list.
    #[default]
    Guest,
    User,
    Moderator,
    Admin,
}

/// User
///
/// The canonical account record from the `users` table. This struct carries the
/// stored password hash and is therefore **internal only**; API responses use
/// the sanitized [`UserResponse`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Deactivation is a flag flip, never a row deletion; inactive accounts
    /// resolve to guest on every request.
    pub active: bool,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Advisory only. A failed update here never invalidates a session.
    pub last_login: Option<DateTime<Utc>>,
}

/// Session
///
/// One authenticated client-server relationship, persisted in the `sessions`
/// table. The `session_id` is the full-entropy bearer credential: a v4 UUID
/// from the OS CSPRNG, serialized to the client in its canonical string form.
/// It must never be logged or embedded in error messages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: i32,
    /// Absolute instant; the session is invalid at or after this time.
    pub expires_at: DateTime<Utc>,
    // Issuance metadata, informational only, never consulted for
    // authorization decisions.
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// AuthSession
///
/// The projection the identity resolver reads on every request: the session
/// row joined with the owning user's role and active flag. Omits the session
/// id itself: nothing past the lookup needs it, and nothing can log it.
#[derive(Debug, Clone, FromRow, Default)]
pub struct AuthSession {
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
    pub role: Role,
    pub active: bool,
}

/// Post
///
/// A forum post from the `posts` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub post_id: i32,
    // FK to users.user_id (owner). The only cross-entity relation the
    // authorization layer enforces.
    pub user_id: i32,
    pub title: String,
    pub content: String,
    pub category_id: i32,
    pub additional_notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment on a post, from the `comments` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub comment_id: i32,
    pub post_id: i32,
    // FK to users.user_id (owner).
    pub user_id: i32,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The plaintext password is hashed before it reaches the repository and is
/// never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
}

/// NewUser
///
/// Repository-layer insertion payload: the registration fields with the
/// password already derived into its stored hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
}

/// LoginRequest
///
/// Credentials for POST /login. Failures are reported uniformly; the response
/// never distinguishes an unknown username from a wrong password.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// The issued session token (the session id in canonical string form) plus the
/// authenticated user id. Clients send the token back on every request as
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i32,
}

/// UpdateProfileRequest
///
/// Non-sensitive profile update (PUT /users). The handler verifies the caller
/// owns `user_id` before touching the row; password and role are updated
/// through their own endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
}

/// UpdatePasswordRequest
///
/// Password change payload (PATCH /users/password). Ownership-checked.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    pub user_id: i32,
    pub password: String,
}

/// CreatePostRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub category_id: i32,
    pub additional_notes: Option<String>,
}

/// UpdatePostRequest
///
/// Partial update payload for an existing post. `Option<T>` fields paired with
/// `COALESCE` in the repository query mean only the provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    pub post_id: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// CreateCommentRequest
///
/// The payload carries the author's `user_id`, which the handler checks
/// against the authenticated identity before inserting.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
}

/// UpdateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub comment_id: i32,
    pub content: String,
}

// --- Response Schemas (Output) ---

/// UserResponse
///
/// The public projection of a user record: everything except the stored
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub profile_picture: Option<String>,
    pub biography: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            user_id: user.user_id,
            username: user.username,
            email: user.email,
            role: user.role,
            active: user.active,
            profile_picture: user.profile_picture,
            biography: user.biography,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
