//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::{MemoryStore, Session};

use crate::access::AccessQuery;
use crate::backend::{BackendClient, BackendError};
use crate::config::WebConfig;
use crate::screens::ScreenRegistry;
use crate::session::{BrowserSession, SessionHub};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    sessions: MemoryStore,
    hub: SessionHub,
    screens: ScreenRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built from `config`.
    pub fn new(config: WebConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(
            &config.backend.url,
            config.backend.api_key.clone(),
            config.backend.timeout,
        )?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                sessions: MemoryStore::default(),
                hub: SessionHub::new(),
                screens: ScreenRegistry::new(),
            }),
        })
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session_store(&self) -> &MemoryStore {
        &self.inner.sessions
    }

    /// Get a reference to the session event hub.
    #[must_use]
    pub fn hub(&self) -> &SessionHub {
        &self.inner.hub
    }

    /// Get a reference to the admin screen registry.
    #[must_use]
    pub fn screens(&self) -> &ScreenRegistry {
        &self.inner.screens
    }

    /// The browser session behind a request's session cookie.
    #[must_use]
    pub fn browser_session(&self, session: &Session) -> BrowserSession {
        BrowserSession::new(
            self.inner.backend.clone(),
            self.inner.sessions.clone(),
            self.inner.hub.clone(),
            session.id(),
        )
    }

    /// Access query for a browser session.
    #[must_use]
    pub fn access_query(&self, browser: &BrowserSession) -> AccessQuery<BrowserSession, BrowserSession> {
        AccessQuery::new(browser.clone(), browser.clone())
    }
}
