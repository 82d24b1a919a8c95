//! HTTP client for the backend's REST and auth APIs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use super::{BackendError, classify_error};

/// Path prefix of the PostgREST API.
const REST_PATH: &str = "rest/v1/";

/// Path prefix of the GoTrue API.
const AUTH_PATH: &str = "auth/v1/";

/// `Accept` value asking PostgREST for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Backend API client.
///
/// Cheap to clone; built once at startup and handed to whatever needs it.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// `api_key` is sent as the `apikey` header on every request and used as
    /// the bearer token when no user token is supplied.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP client
    /// fails to build.
    pub fn new(
        base_url: &Url,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| BackendError::Parse(format!("Invalid API key format: {e}")))?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        // Url::join drops the last path segment unless the base ends with '/'.
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url,
                api_key,
            }),
        })
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The project key, used as bearer when acting without a user session.
    pub(crate) fn api_key(&self) -> &SecretString {
        &self.inner.api_key
    }

    pub(crate) fn rest_url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(REST_PATH)?.join(path)?)
    }

    pub(crate) fn auth_url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(AUTH_PATH)?.join(path)?)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Call a remote procedure and parse its JSON result.
    #[instrument(skip(self, bearer, args))]
    pub(crate) async fn rpc<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        bearer: &SecretString,
        function: &str,
        args: &B,
    ) -> Result<T, BackendError> {
        let url = self.rest_url(&format!("rpc/{function}"))?;
        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, bearer_value(bearer))
            .json(args)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Call a remote procedure that returns nothing.
    #[instrument(skip(self, bearer, args))]
    pub(crate) async fn rpc_void<B: Serialize + Sync>(
        &self,
        bearer: &SecretString,
        function: &str,
        args: &B,
    ) -> Result<(), BackendError> {
        let url = self.rest_url(&format!("rpc/{function}"))?;
        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, bearer_value(bearer))
            .json(args)
            .send()
            .await?;
        expect_success(response).await
    }

    /// Fetch exactly one row of `table` matching `filters`.
    ///
    /// Filters are `(column, value)` pairs matched with `eq`.
    #[instrument(skip(self, bearer))]
    pub(crate) async fn select_one<T: DeserializeOwned>(
        &self,
        bearer: &SecretString,
        table: &str,
        filters: &[(&str, &str)],
    ) -> Result<T, BackendError> {
        let mut url = self.rest_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{value}"));
            }
        }

        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, bearer_value(bearer))
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        handle_response(response).await
    }
}

/// Build an `Authorization: Bearer` header value.
pub(crate) fn bearer_value(token: &SecretString) -> HeaderValue {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .unwrap_or_else(|_| HeaderValue::from_static("Bearer invalid"));
    value.set_sensitive(true);
    value
}

/// Parse a successful JSON response or classify the error.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
    }
    Err(parse_error(response).await)
}

/// Accept any successful response, ignoring its body.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(parse_error(response).await)
}

async fn parse_error(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let path = response.url().path().to_owned();
    let body = response.text().await.unwrap_or_default();
    let error = classify_error(status, &path, &body);
    tracing::debug!(status = status.as_u16(), path = %path, error = %error, "Backend error response");
    error
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(
            &Url::parse(base).unwrap(),
            SecretString::from("anon-key"),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_rest_url_from_bare_host() {
        let client = client("https://project.example.co");
        assert_eq!(
            client.rest_url("rpc/list_profiles").unwrap().as_str(),
            "https://project.example.co/rest/v1/rpc/list_profiles"
        );
    }

    #[test]
    fn test_urls_keep_base_path_without_trailing_slash() {
        let client = client("https://gateway.example.com/backend");
        assert_eq!(
            client.auth_url("user").unwrap().as_str(),
            "https://gateway.example.com/backend/auth/v1/user"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let output = format!("{:?}", client("https://project.example.co"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("anon-key"));
    }
}
