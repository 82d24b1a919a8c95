//! Identity endpoints (GoTrue).
//!
//! Passwords never touch anything but the sign-in request; the session keeps
//! only the token pair the backend hands back.

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use amooora_core::UserId;

use super::client::{bearer_value, expect_success, handle_response};
use super::{BackendClient, BackendError};

/// A user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    /// User ID.
    pub id: UserId,
    /// Email, when the account has one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair returned by sign-in and refresh.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Unix timestamp at which the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// The signed-in user.
    pub user: AuthUser,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl BackendClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with the backend's message if the
    /// credentials are rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<TokenResponse, BackendError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http()
            .post(url)
            .json(&json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token was revoked or already used.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenResponse, BackendError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = self
            .http()
            .post(url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Look up the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, BackendError> {
        let response = self
            .http()
            .get(self.auth_url("user")?)
            .header(AUTHORIZATION, bearer_value(access_token))
            .send()
            .await?;
        handle_response(response).await
    }

    /// Revoke the session an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        let response = self
            .http()
            .post(self.auth_url("logout")?)
            .header(AUTHORIZATION, bearer_value(access_token))
            .send()
            .await?;
        expect_success(response).await
    }
}
