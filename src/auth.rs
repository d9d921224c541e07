use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{Role, Session},
    repository::RepositoryState,
};

// --- Clock ---

/// Clock
///
/// The source of "now" for session issuance and expiry checks. Production uses
/// [`SystemClock`]; tests substitute a manual clock to move a session past its
/// expiry without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// SystemClock
///
/// The production clock, backed by the OS wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The shared handle used to inject the clock through the application state.
pub type ClockState = Arc<dyn Clock>;

// --- Identity ---

/// Identity
///
/// The resolved identity of a request: a role plus, for authenticated callers,
/// the owning user id. Built exactly once per request by [`resolve_identity`]
/// and carried in the request extensions; request-scoped, never persisted and
/// never shared across requests.
///
/// A guest identity (`user_id == None`) is the fallback for every resolution
/// failure: missing token, malformed token, unknown session, expired
/// session, deactivated account. Downstream stages cannot tell these cases
/// apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub role: Role,
    pub user_id: Option<i32>,
}

impl Identity {
    /// The anonymous identity: guest role, no user id.
    pub fn guest() -> Self {
        Identity {
            role: Role::Guest,
            user_id: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none() || self.role == Role::Guest
    }

    /// Role Gate decision: exact membership of this identity's role in the
    /// route's allow-list. Guests always fail, even against a list that
    /// (incorrectly) contains `Role::Guest`; an empty list rejects everyone.
    pub fn authorized_for(&self, allowed: &[Role]) -> bool {
        !self.is_guest() && allowed.contains(&self.role)
    }

    /// Ownership Guard: true only if this identity is authenticated *and* its
    /// user id equals the target resource's owning user id. Roles are not
    /// consulted; an admin does not implicitly pass ownership checks.
    pub fn owns(&self, target_user_id: i32) -> bool {
        self.user_id == Some(target_user_id)
    }
}

/// Identity Extractor
///
/// Lets handlers receive the resolved [`Identity`] as a typed argument instead
/// of digging through string-keyed request context. Falls back to guest if the
/// resolver has not run, which fails closed: a guest identity passes no gate
/// and owns nothing.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_else(Identity::guest))
    }
}

// --- Token transport ---

/// Extracts the session token from the canonical transport: the
/// `Authorization: Bearer <token>` header. Issuance (login) returns the token
/// for this header and resolution reads it from the same place, so the two
/// ends never disagree on transport.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Best-effort client origin address for session metadata: the first
/// `X-Forwarded-For` entry when running behind the trusted proxy, otherwise
/// the peer socket address. Informational only.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

// --- Identity Resolver (middleware) ---

/// resolve_identity
///
/// Runs on every inbound request. Maps the bearer token (if any) to an
/// [`Identity`] via a single session-store read, attaches it to the request
/// extensions, and always continues the pipeline; authorization decisions
/// belong to the role gate and the ownership checks, not here.
///
/// Every token-level failure folds into the guest identity so public routes
/// stay usable for anonymous callers. The one exception is a store failure:
/// that aborts the request with an internal error rather than silently
/// demoting the caller to guest, so a session-store outage is loud instead of
/// masquerading as a permissions problem.
///
/// No caching: each request re-reads the store, so a revoked session stops
/// working on the very next request.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match bearer_token(req.headers()) {
        None => Identity::guest(),
        Some(raw) => match Uuid::parse_str(raw) {
            // Unparseable tokens are indistinguishable from absent ones.
            Err(_) => Identity::guest(),
            Ok(session_id) => match state.repo.get_session_for_auth(session_id).await? {
                None => Identity::guest(),
                Some(session) if session.expires_at <= state.clock.now() => {
                    // Logged for diagnosis, but downstream behavior is identical
                    // to an unknown session.
                    tracing::debug!(user_id = session.user_id, "expired session presented");
                    Identity::guest()
                }
                Some(session) if !session.active => {
                    tracing::debug!(user_id = session.user_id, "session for deactivated account");
                    Identity::guest()
                }
                Some(session) => Identity {
                    role: session.role,
                    user_id: Some(session.user_id),
                },
            },
        },
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

// --- Role Gate (middleware) ---

/// Allow-list for routes any signed-in member may use.
pub const STAFF_ROLES: &[Role] = &[Role::User, Role::Moderator, Role::Admin];

/// Allow-list for administrative routes.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// require_role
///
/// Route-group middleware parameterized by a static allow-list, wired with
/// `axum::middleware::from_fn` at router assembly. Reads the identity the
/// resolver attached; a guest or a role outside the list terminates the
/// request with 401 before the handler runs.
pub async fn require_role(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_else(Identity::guest);

    if !identity.authorized_for(allowed) {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

// --- Credential Verifier ---

/// derive_password_hash
///
/// Produces a fresh salted Argon2 hash in PHC string form. The cost parameters
/// are the library defaults, a server-side constant, never derived from the
/// input. Failure (salt generation, hashing internals) surfaces as an internal
/// error; it is never defaulted away.
pub fn derive_password_hash(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "password hash derivation failed");
            ApiError::Internal
        })
}

/// verify_password
///
/// Checks a plaintext password against a stored PHC hash string. Malformed
/// stored hashes verify as false rather than erroring: a corrupt credential
/// row must read as "wrong password", not take the login path down.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// --- Session Issuer ---

/// issue_session
///
/// Mints a session for `user_id`: fresh 128-bit id from the CSPRNG-backed v4
/// UUID generator, `expires_at = now + ttl`, persisted before it is returned.
/// Only the login flow calls this, and only after the password check has
/// passed; a failed login must never leave a session behind.
pub async fn issue_session(
    repo: &RepositoryState,
    clock: &ClockState,
    ttl: Duration,
    user_id: i32,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> Result<Session, ApiError> {
    let now = clock.now();
    let session = Session {
        session_id: Uuid::new_v4(),
        user_id,
        expires_at: now + ttl,
        ip_address,
        user_agent,
        created_at: now,
    };

    repo.create_session(&session).await?;
    Ok(session)
}
