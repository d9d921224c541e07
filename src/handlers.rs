use crate::{
    AppState,
    auth::{self, Identity},
    error::ApiError,
    models::{
        Comment, CreateCommentRequest, CreatePostRequest, LoginRequest, LoginResponse, NewUser,
        Post, RegisterRequest, Role, UpdateCommentRequest, UpdatePasswordRequest,
        UpdatePostRequest, UpdateProfileRequest, UserResponse,
    },
};
use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use uuid::Uuid;

// --- Identity & Session Handlers ---

/// register_user
///
/// [Public Route] Creates a new account. The plaintext password is derived
/// into a salted hash before anything is persisted; new accounts start as
/// active members with the standard role.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let password_hash = auth::derive_password_hash(&payload.password)?;

    let new_user = NewUser {
        username: payload.username,
        email: payload.email,
        password_hash,
        role: Role::User,
        profile_picture: payload.profile_picture,
        biography: payload.biography,
    };

    match state.repo.create_user(new_user).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(ApiError::Conflict(
            "Username or email already taken".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// login
///
/// [Public Route] Verifies credentials and issues a session.
///
/// *Sequencing*: the session is minted strictly after the password check
/// passes, so failed attempts never accumulate sessions. The last-login
/// timestamp update afterwards is best-effort: it is advisory data, and a
/// failure there is logged but never rolls back or invalidates the session
/// that was just issued.
///
/// *Uniform failure*: an unknown username, a wrong password, and a
/// deactivated account are all reported as the same `InvalidCredentials`.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !user.active || !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let ip_address = auth::client_addr(&headers, Some(peer));
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let session = auth::issue_session(
        &state.repo,
        &state.clock,
        state.config.session_ttl,
        user.user_id,
        ip_address,
        user_agent,
    )
    .await?;

    if let Err(e) = state
        .repo
        .update_last_login(user.user_id, state.clock.now())
        .await
    {
        tracing::warn!(user_id = user.user_id, error = %e, "failed to update last login");
    }

    Ok(Json(LoginResponse {
        token: session.session_id.to_string(),
        user_id: user.user_id,
    }))
}

/// logout
///
/// [Public Route] Terminates the presented session. Idempotent: a missing,
/// malformed, or already-terminated token still yields success; the record's
/// absence from the store is the source of truth for validity, and there is
/// nothing left to do. Clients discard their held token on response.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    if let Some(raw) = auth::bearer_token(&headers) {
        if let Ok(session_id) = Uuid::parse_str(raw) {
            state.repo.delete_session(session_id).await?;
        }
    }

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

// --- User Handlers ---

/// get_all_users
///
/// [Public Route] Lists all accounts as their sanitized projections.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "Users", body = [UserResponse]))
)]
pub async fn get_all_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.repo.get_all_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// get_user
///
/// [Public Route] Fetches one account by id.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses((status = 200, description = "User", body = UserResponse))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    match state.repo.get_user(user_id).await? {
        Some(user) => Ok(Json(user.into())),
        None => Err(ApiError::NotFound),
    }
}

/// update_user_profile
///
/// [Member Route] Updates non-sensitive profile fields.
///
/// *Ownership*: the target `user_id` comes from the payload, so the handler
/// checks it against the authenticated identity before the write.
#[utoipa::path(
    put,
    path = "/users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated"),
        (status = 403, description = "Not the account owner")
    )
)]
pub async fn update_user_profile(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    if !identity.owns(payload.user_id) {
        return Err(ApiError::Forbidden);
    }

    if state.repo.update_user_profile(&payload).await? {
        Ok(Json(json!({ "message": "User updated" })))
    } else {
        Err(ApiError::NotFound)
    }
}

/// update_user_password
///
/// [Member Route] Replaces the account's password hash. Ownership-checked
/// against the payload `user_id`; the new password is re-derived with a fresh
/// salt.
#[utoipa::path(
    patch,
    path = "/users/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 403, description = "Not the account owner")
    )
)]
pub async fn update_user_password(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    if !identity.owns(payload.user_id) {
        return Err(ApiError::Forbidden);
    }

    let password_hash = auth::derive_password_hash(&payload.password)?;

    if state
        .repo
        .update_user_password(payload.user_id, &password_hash)
        .await?
    {
        Ok(Json(json!({ "message": "User password updated" })))
    } else {
        Err(ApiError::NotFound)
    }
}

/// deactivate_user
///
/// [Member Route] Deactivates the caller's own account. The row stays in
/// place with `active = false`; every outstanding session for it resolves to
/// guest from the next request onward.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deactivated"),
        (status = 403, description = "Not the account owner")
    )
)]
pub async fn deactivate_user(
    identity: Identity,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    if !identity.owns(user_id) {
        return Err(ApiError::Forbidden);
    }

    if state.repo.set_user_active(user_id, false).await? {
        Ok(Json(json!({ "message": "User deactivated" })))
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Post Handlers ---

/// get_posts
///
/// [Public Route] Lists all posts, newest first.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn get_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.get_all_posts().await?))
}

/// get_post
///
/// [Public Route] Fetches a single post by id.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses((status = 200, description = "Post", body = Post))
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Json<Post>, ApiError> {
    match state.repo.get_post(post_id).await? {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound),
    }
}

/// get_posts_by_user
///
/// [Public Route] Lists all posts authored by a specific user.
#[utoipa::path(
    get,
    path = "/posts/user/{userID}",
    params(("userID" = i32, Path, description = "Author's user ID")),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn get_posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.get_posts_by_user(user_id).await?))
}

/// get_posts_by_category
///
/// [Public Route] Lists all posts in a category.
#[utoipa::path(
    get,
    path = "/posts/category/{categoryID}",
    params(("categoryID" = i32, Path, description = "Category ID")),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn get_posts_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(state.repo.get_posts_by_category(category_id).await?))
}

/// create_post
///
/// [Member Route] Submits a new post. The author id is taken from the
/// authenticated identity, never from the payload, so a caller cannot post as
/// someone else.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses((status = 201, description = "Created", body = Post))
)]
pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let user_id = identity.user_id.ok_or(ApiError::Unauthorized)?;
    let post = state.repo.create_post(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Member Route] Updates the caller's own post. The repository query is
/// owner-scoped: if the caller does not own the post, zero rows change and
/// the handler reports not-found rather than revealing the post exists.
#[utoipa::path(
    put,
    path = "/posts",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn update_post(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let user_id = identity.user_id.ok_or(ApiError::Unauthorized)?;
    match state.repo.update_post(user_id, payload).await? {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound),
    }
}

/// delete_post
///
/// [Member Route] Deletes the caller's own post; owner-scoped at the
/// repository layer.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn delete_post(
    identity: Identity,
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user_id = identity.user_id.ok_or(ApiError::Unauthorized)?;
    if state.repo.delete_post(post_id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Comment Handlers ---

/// get_comment
///
/// [Public Route] Fetches a single comment by id.
#[utoipa::path(
    get,
    path = "/comments/{commentID}",
    params(("commentID" = i32, Path, description = "Comment ID")),
    responses((status = 200, description = "Comment", body = Comment))
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> Result<Json<Comment>, ApiError> {
    match state.repo.get_comment(comment_id).await? {
        Some(comment) => Ok(Json(comment)),
        None => Err(ApiError::NotFound),
    }
}

/// get_comments_by_post
///
/// [Public Route] Lists all comments under a post, oldest first.
#[utoipa::path(
    get,
    path = "/comments/post/{postID}",
    params(("postID" = i32, Path, description = "Post ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn get_comments_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repo.get_comments_by_post(post_id).await?))
}

/// get_comments_by_user
///
/// [Public Route] Lists all comments made by a specific user.
#[utoipa::path(
    get,
    path = "/comments/user/{userID}",
    params(("userID" = i32, Path, description = "Author's user ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn get_comments_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repo.get_comments_by_user(user_id).await?))
}

/// create_comment
///
/// [Member Route] Posts a new comment.
///
/// *Ownership*: the payload names its author; the handler verifies that id
/// against the authenticated identity so a caller cannot attribute comments
/// to another account.
#[utoipa::path(
    post,
    path = "/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 403, description = "Author mismatch")
    )
)]
pub async fn create_comment(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    if !identity.owns(payload.user_id) {
        return Err(ApiError::Forbidden);
    }

    let comment = state
        .repo
        .create_comment(payload.post_id, payload.user_id, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Member Route] Edits the caller's own comment; owner-scoped at the
/// repository layer.
#[utoipa::path(
    put,
    path = "/comments",
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn update_comment(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let user_id = identity.user_id.ok_or(ApiError::Unauthorized)?;
    match state
        .repo
        .update_comment(payload.comment_id, user_id, payload.content)
        .await?
    {
        Some(comment) => Ok(Json(comment)),
        None => Err(ApiError::NotFound),
    }
}

/// delete_comment
///
/// [Member Route] Deletes the caller's own comment; owner-scoped at the
/// repository layer.
#[utoipa::path(
    delete,
    path = "/comments/{commentID}",
    params(("commentID" = i32, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn delete_comment(
    identity: Identity,
    State(state): State<AppState>,
    Path(comment_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user_id = identity.user_id.ok_or(ApiError::Unauthorized)?;
    if state.repo.delete_comment(comment_id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Admin Handlers ---

/// get_admin_users
///
/// [Admin Route] Full account listing, including deactivated accounts.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [UserResponse]))
)]
pub async fn get_admin_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.repo.get_all_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// set_user_role
///
/// [Admin Route] Assigns a role to an account. Takes effect on the target
/// user's next request, since every request re-reads the role from the store.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = i32, Path, description = "User ID")),
    request_body = Role,
    responses(
        (status = 200, description = "Role updated"),
        (status = 404, description = "No such user")
    )
)]
pub async fn set_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(role): Json<Role>,
) -> Result<Json<Value>, ApiError> {
    if state.repo.set_user_role(user_id, role).await? {
        Ok(Json(json!({ "message": "Role updated" })))
    } else {
        Err(ApiError::NotFound)
    }
}

/// set_user_active
///
/// [Admin Route] Activates or deactivates an account. Deactivation takes
/// effect on the target's next request; their outstanding sessions resolve
/// to guest without needing to be swept.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/active",
    params(("id" = i32, Path, description = "User ID")),
    request_body = bool,
    responses(
        (status = 200, description = "Active flag updated"),
        (status = 404, description = "No such user")
    )
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(active): Json<bool>,
) -> Result<Json<Value>, ApiError> {
    if state.repo.set_user_active(user_id, active).await? {
        Ok(Json(json!({ "message": "Active flag updated" })))
    } else {
        Err(ApiError::NotFound)
    }
}
