use crate::models::{
    AuthSession, Comment, CreatePostRequest, NewUser, Post, Role, Session, UpdatePostRequest,
    UpdateProfileRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::User;

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers and
/// middleware talk to the data layer without knowing the implementation
/// (Postgres in production, mocks in tests).
///
/// Every method returns `Result` so a store failure propagates to the caller
/// as an internal error; the authorization layer depends on being able to
/// tell "no such session" (Ok(None)) apart from "the store is down" (Err).
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error>;
    async fn get_user(&self, user_id: i32) -> Result<Option<User>, sqlx::Error>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    async fn get_all_users(&self) -> Result<Vec<User>, sqlx::Error>;
    // Owner-submitted profile update; the ownership check happens in the
    // handler before this is called.
    async fn update_user_profile(&self, req: &UpdateProfileRequest) -> Result<bool, sqlx::Error>;
    async fn update_user_password(
        &self,
        user_id: i32,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>;
    // Advisory timestamp; callers must treat a failure here as non-fatal.
    async fn update_last_login(&self, user_id: i32, at: DateTime<Utc>) -> Result<(), sqlx::Error>;
    async fn set_user_role(&self, user_id: i32, role: Role) -> Result<bool, sqlx::Error>;
    // Deactivation/reactivation. Account rows are never deleted.
    async fn set_user_active(&self, user_id: i32, active: bool) -> Result<bool, sqlx::Error>;

    // --- Sessions ---
    async fn create_session(&self, session: &Session) -> Result<(), sqlx::Error>;
    // The resolver's one read per request: session joined with the owning
    // user's role and active flag.
    async fn get_session_for_auth(
        &self,
        session_id: Uuid,
    ) -> Result<Option<AuthSession>, sqlx::Error>;
    // Idempotent: deleting an absent session succeeds.
    async fn delete_session(&self, session_id: Uuid) -> Result<(), sqlx::Error>;

    // --- Posts ---
    async fn create_post(&self, user_id: i32, req: CreatePostRequest)
    -> Result<Post, sqlx::Error>;
    async fn get_post(&self, post_id: i32) -> Result<Option<Post>, sqlx::Error>;
    async fn get_all_posts(&self) -> Result<Vec<Post>, sqlx::Error>;
    async fn get_posts_by_user(&self, user_id: i32) -> Result<Vec<Post>, sqlx::Error>;
    async fn get_posts_by_category(&self, category_id: i32) -> Result<Vec<Post>, sqlx::Error>;
    // Owner-scoped: updates only if `user_id` matches the post's owner.
    async fn update_post(
        &self,
        user_id: i32,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error>;
    // Owner-scoped: deletes only if `user_id` matches the post's owner.
    async fn delete_post(&self, post_id: i32, user_id: i32) -> Result<bool, sqlx::Error>;

    // --- Comments ---
    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Comment, sqlx::Error>;
    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error>;
    async fn get_comments_by_post(&self, post_id: i32) -> Result<Vec<Comment>, sqlx::Error>;
    async fn get_comments_by_user(&self, user_id: i32) -> Result<Vec<Comment>, sqlx::Error>;
    async fn update_comment(
        &self,
        comment_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error>;
    async fn delete_comment(&self, comment_id: i32, user_id: i32) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "user_id, username, email, password_hash, role, active, \
                            profile_picture, biography, created_at, last_login";

const POST_COLUMNS: &str =
    "post_id, user_id, title, content, category_id, additional_notes, created_at, updated_at";

const COMMENT_COLUMNS: &str = "comment_id, post_id, user_id, content, created_at, updated_at";

/// PostgresRepository
///
/// The production implementation of [`Repository`], backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, profile_picture, biography) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.role)
            .bind(&new_user.profile_picture)
            .bind(&new_user.biography)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_all_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id ASC");
        sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await
    }

    async fn update_user_profile(&self, req: &UpdateProfileRequest) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, profile_picture = $4, biography = $5 \
             WHERE user_id = $1",
        )
        .bind(req.user_id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.profile_picture)
        .bind(&req.biography)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_user_password(
        &self,
        user_id: i32,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_last_login(&self, user_id: i32, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_user_role(&self, user_id: i32, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_active(&self, user_id: i32, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET active = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (session_id, user_id, expires_at, ip_address, user_agent, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session_for_auth(
        &self,
        session_id: Uuid,
    ) -> Result<Option<AuthSession>, sqlx::Error> {
        sqlx::query_as::<_, AuthSession>(
            "SELECT s.user_id, s.expires_at, u.role, u.active \
             FROM sessions s \
             JOIN users u ON s.user_id = u.user_id \
             WHERE s.session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), sqlx::Error> {
        // Zero rows affected is fine: terminating an already-absent session
        // is a no-op, not an error.
        sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_post(
        &self,
        user_id: i32,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error> {
        let sql = format!(
            "INSERT INTO posts (user_id, title, content, category_id, additional_notes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(user_id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(req.category_id)
            .bind(&req.additional_notes)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_post(&self, post_id: i32) -> Result<Option<Post>, sqlx::Error> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = $1");
        sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_all_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC");
        sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await
    }

    async fn get_posts_by_user(&self, user_id: i32) -> Result<Vec<Post>, sqlx::Error> {
        let sql =
            format!("SELECT {POST_COLUMNS} FROM posts WHERE user_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Post>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_posts_by_category(&self, category_id: i32) -> Result<Vec<Post>, sqlx::Error> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE category_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Owner-scoped partial update. `COALESCE` keeps any column whose
    /// corresponding request field is `None`; the `user_id` predicate makes a
    /// non-owner's update affect zero rows.
    async fn update_post(
        &self,
        user_id: i32,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        let sql = format!(
            "UPDATE posts \
             SET title = COALESCE($3, title), \
                 content = COALESCE($4, content), \
                 category_id = COALESCE($5, category_id), \
                 additional_notes = COALESCE($6, additional_notes), \
                 updated_at = NOW() \
             WHERE post_id = $1 AND user_id = $2 \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(req.post_id)
            .bind(user_id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(req.category_id)
            .bind(&req.additional_notes)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_post(&self, post_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Comment, sqlx::Error> {
        let sql = format!(
            "INSERT INTO comments (post_id, user_id, content) \
             VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(user_id)
            .bind(&content)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = $1");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_comments_by_post(&self, post_id: i32) -> Result<Vec<Comment>, sqlx::Error> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn get_comments_by_user(&self, user_id: i32) -> Result<Vec<Comment>, sqlx::Error> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn update_comment(
        &self,
        comment_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let sql = format!(
            "UPDATE comments SET content = $3, updated_at = NOW() \
             WHERE comment_id = $1 AND user_id = $2 \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(user_id)
            .bind(&content)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_comment(&self, comment_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE comment_id = $1 AND user_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
