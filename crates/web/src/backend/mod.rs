//! Backend-as-a-service client.
//!
//! Amooora keeps no database of its own. Identity, access records and account
//! deletion live in a hosted backend that exposes:
//!
//! - a PostgREST API (`/rest/v1/`) for tables and remote procedures
//! - a GoTrue API (`/auth/v1/`) for sign-in, token refresh and user lookup
//!
//! # Authentication
//!
//! Every request carries the project key in the `apikey` header. Directory
//! calls made on behalf of a signed-in user also carry that user's access
//! token as a bearer token, so the backend's row-level policies apply to the
//! acting user.

pub mod auth;
pub mod client;
pub mod directory;

pub use auth::{AuthUser, TokenResponse};
pub use client::BackendClient;
pub use directory::BackendDirectory;

use amooora_core::DirectoryError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// PostgREST error code for a procedure missing from the schema cache.
const CODE_FUNCTION_NOT_FOUND: &str = "PGRST202";

/// PostgREST error code for a single-object request that matched no rows.
const CODE_NO_ROWS: &str = "PGRST116";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote procedure does not exist on the backend.
    #[error("function not found: {0}")]
    FunctionNotFound(String),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// The credentials or token were rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other error response.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Structured error code, when the backend sent one.
        code: Option<String>,
        /// Error message, verbatim.
        message: String,
    },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid endpoint URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<BackendError> for DirectoryError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::FunctionNotFound(function) => Self::FunctionUnavailable(function),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Error body shapes returned by PostgREST and GoTrue.
///
/// PostgREST sends `{code, message, details, hint}`; GoTrue sends either
/// `{error, error_description}` or `{code, error_code, msg}` with a numeric code.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            _ => self.error_code.clone().or_else(|| self.error.clone()),
        }
    }

    fn message(self, status: StatusCode) -> String {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            })
    }
}

/// Classify an error response.
///
/// `path` is the request path; a 404 on an `/rpc/` path without a structured
/// code also means the procedure is missing (older PostgREST versions).
pub(crate) fn classify_error(status: StatusCode, path: &str, body: &str) -> BackendError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = body.code();
    let message = body.message(status);

    match code.as_deref() {
        Some(CODE_FUNCTION_NOT_FOUND) => return BackendError::FunctionNotFound(message),
        Some(CODE_NO_ROWS) => return BackendError::NotFound,
        _ => {}
    }

    if status == StatusCode::NOT_FOUND && code.is_none() && path.contains("/rpc/") {
        return BackendError::FunctionNotFound(message);
    }

    if status == StatusCode::UNAUTHORIZED {
        return BackendError::Unauthorized(message);
    }

    BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}
