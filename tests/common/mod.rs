#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use forum_portal::{
    AppState,
    auth::{self, Clock, ClockState},
    config::AppConfig,
    create_router,
    models::{
        AuthSession, Comment, CreatePostRequest, NewUser, Post, Role, Session, UpdatePostRequest,
        UpdateProfileRequest, User,
    },
    repository::{Repository, RepositoryState},
};
use serde_json::Value;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

// --- Manual Clock ---

/// A test clock that only moves when told to, so sessions can be pushed past
/// their expiry without sleeping.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// --- In-memory Repository ---

/// In-memory implementation of the repository contract. Behaves like the real
/// store for everything these tests exercise, plus failure toggles for the
/// outage paths.
#[derive(Default)]
pub struct MockRepo {
    pub users: Mutex<Vec<User>>,
    pub sessions: Mutex<HashMap<Uuid, Session>>,
    pub posts: Mutex<Vec<Post>>,
    pub comments: Mutex<Vec<Comment>>,
    next_user_id: AtomicI32,
    next_post_id: AtomicI32,
    next_comment_id: AtomicI32,
    /// When set, the resolver's session lookup errors like a dead backend.
    pub fail_session_lookup: AtomicBool,
    /// When set, the advisory last-login update fails.
    pub fail_last_login: AtomicBool,
}

impl MockRepo {
    pub fn new() -> Self {
        MockRepo::default()
    }

    pub fn seed_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let user = User {
            user_id: self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            active: true,
            profile_picture: new_user.profile_picture,
            biography: new_user.biography,
            created_at: Utc::now(),
            last_login: None,
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, sqlx::Error> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn update_user_profile(&self, req: &UpdateProfileRequest) -> Result<bool, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.user_id == req.user_id) {
            Some(user) => {
                user.username = req.username.clone();
                user.email = req.email.clone();
                user.profile_picture = req.profile_picture.clone();
                user.biography = req.biography.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_user_password(
        &self,
        user_id: i32,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_last_login(&self, user_id: i32, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        if self.fail_last_login.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.user_id == user_id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_user_role(&self, user_id: i32, role: Role) -> Result<bool, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_user_active(&self, user_id: i32, active: bool) -> Result<bool, sqlx::Error> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.user_id == user_id) {
            Some(user) => {
                user.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session_for_auth(
        &self,
        session_id: Uuid,
    ) -> Result<Option<AuthSession>, sqlx::Error> {
        if self.fail_session_lookup.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get(&session_id) else {
            return Ok(None);
        };
        let users = self.users.lock().unwrap();
        let Some(user) = users.iter().find(|u| u.user_id == session.user_id) else {
            return Ok(None);
        };
        Ok(Some(AuthSession {
            user_id: session.user_id,
            expires_at: session.expires_at,
            role: user.role,
            active: user.active,
        }))
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<(), sqlx::Error> {
        // Removing an absent session is a no-op, mirroring the SQL DELETE.
        self.sessions.lock().unwrap().remove(&session_id);
        Ok(())
    }

    async fn create_post(
        &self,
        user_id: i32,
        req: CreatePostRequest,
    ) -> Result<Post, sqlx::Error> {
        let now = Utc::now();
        let post = Post {
            post_id: self.next_post_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            title: req.title,
            content: req.content,
            category_id: req.category_id,
            additional_notes: req.additional_notes,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, post_id: i32) -> Result<Option<Post>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.post_id == post_id)
            .cloned())
    }

    async fn get_all_posts(&self) -> Result<Vec<Post>, sqlx::Error> {
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn get_posts_by_user(&self, user_id: i32) -> Result<Vec<Post>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_posts_by_category(&self, category_id: i32) -> Result<Vec<Post>, sqlx::Error> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn update_post(
        &self,
        user_id: i32,
        req: UpdatePostRequest,
    ) -> Result<Option<Post>, sqlx::Error> {
        let mut posts = self.posts.lock().unwrap();
        match posts
            .iter_mut()
            .find(|p| p.post_id == req.post_id && p.user_id == user_id)
        {
            Some(post) => {
                if let Some(title) = req.title {
                    post.title = title;
                }
                if let Some(content) = req.content {
                    post.content = content;
                }
                if let Some(category_id) = req.category_id {
                    post.category_id = category_id;
                }
                if let Some(notes) = req.additional_notes {
                    post.additional_notes = Some(notes);
                }
                Ok(Some(post.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_post(&self, post_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| !(p.post_id == post_id && p.user_id == user_id));
        Ok(posts.len() < before)
    }

    async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Comment, sqlx::Error> {
        let now = Utc::now();
        let comment = Comment {
            comment_id: self.next_comment_id.fetch_add(1, Ordering::SeqCst) + 1,
            post_id,
            user_id,
            content,
            created_at: now,
            updated_at: now,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, comment_id: i32) -> Result<Option<Comment>, sqlx::Error> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.comment_id == comment_id)
            .cloned())
    }

    async fn get_comments_by_post(&self, post_id: i32) -> Result<Vec<Comment>, sqlx::Error> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn get_comments_by_user(&self, user_id: i32) -> Result<Vec<Comment>, sqlx::Error> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_comment(
        &self,
        comment_id: i32,
        user_id: i32,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let mut comments = self.comments.lock().unwrap();
        match comments
            .iter_mut()
            .find(|c| c.comment_id == comment_id && c.user_id == user_id)
        {
            Some(comment) => {
                comment.content = content;
                Ok(Some(comment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_comment(&self, comment_id: i32, user_id: i32) -> Result<bool, sqlx::Error> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|c| !(c.comment_id == comment_id && c.user_id == user_id));
        Ok(comments.len() < before)
    }
}

// --- Application scaffolding ---

/// A user row with a real derived hash, ready to seed into the mock store.
pub fn seeded_user(user_id: i32, username: &str, password: &str, role: Role, active: bool) -> User {
    User {
        user_id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: auth::derive_password_hash(password).unwrap(),
        role,
        active,
        profile_picture: None,
        biography: None,
        created_at: Utc::now(),
        last_login: None,
    }
}

pub fn test_state(repo: Arc<MockRepo>, clock: Arc<ManualClock>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        clock: clock as ClockState,
        config: AppConfig::default(),
    }
}

/// Builds the full application router over the mock state. The mock connect
/// info stands in for the peer socket address the real server provides.
pub fn test_app(state: AppState) -> Router {
    create_router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
}

/// Fires one request at the in-process app and returns (status, parsed body).
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Logs in through the real endpoint and returns the issued token.
pub async fn login_token(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        Method::POST,
        "/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}
