//! Sign-in prompt, sign-in and sign-out handlers.

use amooora_core::AccessState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::CurrentAccess;
use crate::session::{self, AuthError};
use crate::shell::NavShell;
use crate::state::AppState;

/// Sign-in prompt template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/prompt.html")]
pub struct PromptTemplate {
    pub shell: NavShell,
    pub next: String,
    pub email: String,
    pub error: Option<String>,
}

/// Query parameters for the prompt.
#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    pub next: Option<String>,
}

/// Sign-in form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Only same-site paths are accepted as post-sign-in destinations.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Message shown for a failed sign-in.
fn sign_in_message(err: &BackendError) -> String {
    match err {
        BackendError::Api { message, .. } | BackendError::Unauthorized(message) => {
            message.clone()
        }
        _ => "Sign-in is unavailable right now. Try again shortly.".to_string(),
    }
}

/// Sign-in prompt page.
#[instrument(skip(access, query))]
pub async fn prompt(access: CurrentAccess, Query(query): Query<PromptQuery>) -> Response {
    let next = safe_next(query.next.as_deref());
    if access.state.is_authenticated() {
        return Redirect::to(&next).into_response();
    }

    PromptTemplate {
        shell: NavShell::build(&access.state, "/auth/prompt"),
        next,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Sign-in action.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    let email = form.email.trim().to_string();
    let password = SecretString::from(form.password);

    match session::sign_in(&session, state.backend(), state.hub(), &email, &password).await {
        Ok(_) => Redirect::to(&next).into_response(),
        Err(AuthError::Backend(e)) => {
            tracing::info!(error = %e, "Sign-in rejected");
            let page = PromptTemplate {
                shell: NavShell::build(&AccessState::anonymous(), "/auth/prompt"),
                next,
                email,
                error: Some(sign_in_message(&e)),
            };
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Sign-out action.
#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, AppError> {
    session::sign_out(&session, state.backend(), state.hub()).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/admin/users")), "/admin/users");
    }

    #[test]
    fn test_safe_next_rejects_other_sites() {
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_sign_in_message_passes_backend_message() {
        let err = BackendError::Api {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(sign_in_message(&err), "Invalid login credentials");
    }
}
