//! Browser sessions and the session oracle.
//!
//! A browser session holds the backend token pair in the server-side session
//! store. [`SessionOracle`] is the seam the access query uses to ask "who is
//! signed in?" and to hear about changes; [`BrowserSession`] is the production
//! implementation.

pub mod browser;
pub mod hub;

pub use browser::BrowserSession;
pub use hub::{SessionEvent, SessionHub, SessionSubscription};

use std::future::Future;

use amooora_core::UserId;
use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::backend::{BackendClient, BackendError, TokenResponse};
use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "amooora_session";

/// Session expiry after inactivity, in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Refresh access tokens this many seconds before they expire.
const REFRESH_LEEWAY_SECONDS: i64 = 60;

/// Keys of values stored in the session.
pub mod keys {
    /// The backend token pair ([`super::StoredAuth`]).
    pub const AUTH: &str = "auth";
    /// Set on a visitor's first access stream so the session gets a key.
    pub const VISITOR: &str = "visitor";
}

/// Errors reading or changing a session's authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity service rejected the request.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session_store::Error),

    /// The session failed to load or save.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The stored token pair could not be read.
    #[error("corrupted session data: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// User ID.
    pub id: UserId,
    /// Email, when the identity service reports one.
    pub email: Option<String>,
}

/// Source of the current identity and of session-change notifications.
pub trait SessionOracle: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    fn current_user(&self)
    -> impl Future<Output = Result<Option<SessionUser>, AuthError>> + Send;

    /// Subscribe to changes of this session.
    ///
    /// The returned subscription is the unsubscribe handle.
    fn subscribe(&self) -> SessionSubscription;

    /// Follow the session to `session` after a sign-in cycled its key.
    fn rekey(&self, _session: &str) {}
}

/// Token pair kept in the session store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    /// Access token sent as bearer.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Unix timestamp at which the access token expires.
    pub expires_at: i64,
    /// User the tokens belong to.
    pub user_id: UserId,
    /// Email at sign-in time.
    pub email: Option<String>,
}

impl std::fmt::Debug for StoredAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAuth")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

impl StoredAuth {
    /// Whether the access token is expired, or about to be at `now`.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - REFRESH_LEEWAY_SECONDS
    }

    /// The access token as a secret.
    #[must_use]
    pub fn access_token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }

    /// The user these tokens belong to.
    #[must_use]
    pub fn user(&self) -> SessionUser {
        SessionUser {
            id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

impl From<TokenResponse> for StoredAuth {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + token.expires_in);
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user_id: token.user.id,
            email: token.user.email,
        }
    }
}

/// Sign in with email and password and store the token pair in `session`.
///
/// The session ID is cycled so a pre-login cookie cannot be reused.
///
/// # Errors
///
/// Returns `AuthError::Backend` with the backend's message if the credentials
/// are rejected, or a session error if the session cannot be saved.
pub async fn sign_in(
    session: &Session,
    backend: &BackendClient,
    hub: &SessionHub,
    email: &str,
    password: &SecretString,
) -> Result<SessionUser, AuthError> {
    let auth = StoredAuth::from(backend.sign_in_with_password(email, password).await?);
    let user = auth.user();

    let previous = session.id().map(|id| id.to_string());
    session.cycle_id().await?;
    session.insert(keys::AUTH, &auth).await?;
    session.save().await?;

    if let Some(id) = session.id() {
        hub.publish(SessionEvent::SignedIn {
            session: id.to_string(),
            previous,
        });
    }
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(user)
}

/// Sign out: revoke the tokens and clear them from `session`.
///
/// Revocation failures are logged; the local session is cleared regardless.
///
/// # Errors
///
/// Returns a session error if the session cannot be saved.
pub async fn sign_out(
    session: &Session,
    backend: &BackendClient,
    hub: &SessionHub,
) -> Result<(), AuthError> {
    let auth: Option<StoredAuth> = session.remove(keys::AUTH).await?;
    let Some(auth) = auth else {
        return Ok(());
    };

    if let Err(e) = backend.sign_out(&auth.access_token()).await {
        tracing::warn!(error = %e, user_id = %auth.user_id, "Token revocation failed");
    }
    session.save().await?;

    if let Some(id) = session.id() {
        hub.publish(SessionEvent::SignedOut {
            session: id.to_string(),
        });
    }
    tracing::info!(user_id = %auth.user_id, "User signed out");
    Ok(())
}

/// Create the session layer backed by `store`.
#[must_use]
pub fn create_session_layer(
    store: MemoryStore,
    config: &WebConfig,
) -> SessionManagerLayer<MemoryStore> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
