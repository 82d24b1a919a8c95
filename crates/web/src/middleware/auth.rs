//! Access extractors.
//!
//! Every extractor resolves the request's access state through the access
//! query, so capability checks always use the role and status currently in the
//! directory.

use amooora_core::{AccessState, Capabilities, UserId};
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::session::BrowserSession;
use crate::state::AppState;

/// The resolved access of the request's browser session.
///
/// Never rejects for lack of access; anonymous requests get
/// [`AccessState::anonymous`].
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(access: CurrentAccess) -> impl IntoResponse {
///     format!("authenticated: {}", access.state.is_authenticated())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccess {
    /// Request session.
    pub session: Session,
    /// The same session, read from the store.
    pub browser: BrowserSession,
    /// Resolved access.
    pub state: AccessState,
}

impl CurrentAccess {
    /// Capability flags of the resolved access.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.state.capabilities()
    }

    /// Reject unless `allowed`.
    ///
    /// Anonymous requests are sent to sign in; signed-in ones are forbidden.
    ///
    /// # Errors
    ///
    /// Returns the rejection when `allowed` is false.
    pub fn require(&self, allowed: bool, path: &str) -> Result<(), AccessRejection> {
        if allowed {
            Ok(())
        } else if !self.state.is_authenticated() {
            Err(AccessRejection::sign_in(path))
        } else {
            Err(AccessRejection::Forbidden)
        }
    }
}

/// Error returned when the request lacks the required access.
#[derive(Debug)]
pub enum AccessRejection {
    /// Redirect to the sign-in prompt (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Signed in, but not allowed.
    Forbidden,
    /// The session layer is missing from the router.
    MissingSession,
}

impl AccessRejection {
    fn sign_in(path: &str) -> Self {
        if path.starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin(format!(
                "/auth/prompt?next={}",
                urlencoding::encode(path)
            ))
        }
    }
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(to) => Redirect::to(&to).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for CurrentAccess {
    type Rejection = AccessRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AccessRejection::MissingSession)?;

        let browser = state.browser_session(&session);
        let access = state.access_query(&browser).resolve().await;

        if let Some(user_id) = &access.user_id {
            crate::error::set_sentry_user(user_id.as_str(), access.email.as_deref());
        }

        Ok(Self {
            session,
            browser,
            state: access,
        })
    }
}

/// Extractor that requires an active general admin.
///
/// If nobody is signed in, redirects to the sign-in prompt.
/// If the user is not an active general admin, returns 403 Forbidden.
#[derive(Debug, Clone)]
pub struct RequireAdminGeneral {
    /// Resolved access.
    pub access: CurrentAccess,
    /// The admin's user ID.
    pub admin_id: UserId,
    /// Session key for per-session state.
    pub session_key: String,
}

impl FromRequestParts<AppState> for RequireAdminGeneral {
    type Rejection = AccessRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let access = CurrentAccess::from_request_parts(parts, state).await?;
        // Nested routers strip their prefix from `parts.uri`.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path().to_owned(), |uri| uri.path().to_owned());
        access.require(access.capabilities().is_admin_general, &path)?;

        let admin_id = access
            .state
            .user_id
            .clone()
            .ok_or_else(|| AccessRejection::sign_in(&path))?;
        let session_key = access
            .browser
            .key()
            .ok_or_else(|| AccessRejection::sign_in(&path))?;

        Ok(Self {
            access,
            admin_id,
            session_key,
        })
    }
}
