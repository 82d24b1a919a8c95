//! Unified error handling for the web app.

use amooora_core::DirectoryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::backend::BackendError;
use crate::screens::ScreenError;
use crate::session::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Access directory call failed.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Session handling failed.
    #[error("Session error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with an operation in progress.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<ScreenError> for AppError {
    fn from(err: ScreenError) -> Self {
        match err {
            ScreenError::Busy | ScreenError::SelectionChanged => Self::Conflict(err.to_string()),
            ScreenError::EmptySelection => Self::BadRequest(err.to_string()),
            ScreenError::UnknownUser(_) => Self::NotFound(err.to_string()),
            ScreenError::Directory(e) => Self::Directory(e),
            ScreenError::PartialDelete { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Auth(_) | Self::Backend(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(_) | Self::Directory(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Auth(_) => "Internal server error".to_string(),
            Self::Backend(_) => "Backend service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context.
pub fn set_sentry_user(user_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("user a".to_string());
        assert_eq!(err.to_string(), "Not found: user a");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Directory(DirectoryError::Backend("x".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_screen_errors_map_to_client_statuses() {
        assert!(matches!(
            AppError::from(ScreenError::Busy),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(ScreenError::EmptySelection),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(ScreenError::UnknownUser("z".into())),
            AppError::NotFound(_)
        ));
    }
}
