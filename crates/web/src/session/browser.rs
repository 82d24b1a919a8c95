//! Session oracle and directory client bound to one browser session.

use std::sync::{Arc, Mutex, PoisonError};

use amooora_core::{AccessDirectory, AccessRecord, AccessStatus, DirectoryError, Role, UserId};
use chrono::Utc;
use tower_sessions::session::Id;
use tower_sessions::{MemoryStore, SessionStore};

use super::{
    AuthError, SessionEvent, SessionHub, SessionOracle, SessionSubscription, SessionUser,
    StoredAuth, keys,
};
use crate::backend::{BackendClient, BackendDirectory};

/// One browser session, read straight from the session store.
///
/// Reading from the store rather than from a request's `Session` means a
/// long-lived holder (an SSE stream, a cached screen) always sees the latest
/// sign-in state. Clones share the session key, so rekeying one rekeys all.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    backend: BackendClient,
    store: MemoryStore,
    hub: SessionHub,
    id: Arc<Mutex<Option<Id>>>,
}

impl BrowserSession {
    /// Bind to the session with `id`; `None` for a browser without a session.
    #[must_use]
    pub fn new(
        backend: BackendClient,
        store: MemoryStore,
        hub: SessionHub,
        id: Option<Id>,
    ) -> Self {
        Self {
            backend,
            store,
            hub,
            id: Arc::new(Mutex::new(id)),
        }
    }

    fn id(&self) -> Option<Id> {
        *self.id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Key identifying this session on the hub and in the screen registry.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.id().map(|id| id.to_string())
    }

    /// The stored token pair, refreshed first if the access token expired.
    ///
    /// A rejected refresh clears the tokens and publishes
    /// [`SessionEvent::SignedOut`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds unreadable data.
    pub async fn auth(&self) -> Result<Option<StoredAuth>, AuthError> {
        let Some(id) = self.id() else {
            return Ok(None);
        };
        let Some(mut record) = self.store.load(&id).await? else {
            return Ok(None);
        };
        let Some(value) = record.data.get(keys::AUTH) else {
            return Ok(None);
        };

        let auth: StoredAuth = serde_json::from_value(value.clone())?;
        if !auth.is_expired(Utc::now().timestamp()) {
            return Ok(Some(auth));
        }

        match self.backend.refresh_session(&auth.refresh_token).await {
            Ok(token) => {
                let refreshed = StoredAuth::from(token);
                record
                    .data
                    .insert(keys::AUTH.to_owned(), serde_json::to_value(&refreshed)?);
                self.store.save(&record).await?;

                tracing::debug!(user_id = %refreshed.user_id, "Access token refreshed");
                self.hub.publish(SessionEvent::TokenRefreshed {
                    session: id.to_string(),
                });
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %auth.user_id, "Token refresh rejected; signing out");
                record.data.remove(keys::AUTH);
                self.store.save(&record).await?;

                self.hub.publish(SessionEvent::SignedOut {
                    session: id.to_string(),
                });
                Ok(None)
            }
        }
    }

    async fn directory(&self) -> Result<BackendDirectory, DirectoryError> {
        let auth = self
            .auth()
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;
        Ok(self.backend.directory(auth.map(|a| a.access_token())))
    }
}

impl SessionOracle for BrowserSession {
    async fn current_user(&self) -> Result<Option<SessionUser>, AuthError> {
        let Some(auth) = self.auth().await? else {
            return Ok(None);
        };
        let user = self.backend.get_user(&auth.access_token()).await?;
        Ok(Some(SessionUser {
            id: user.id,
            email: user.email.or(auth.email),
        }))
    }

    fn subscribe(&self) -> SessionSubscription {
        self.hub.subscribe(self.key().as_deref())
    }

    fn rekey(&self, session: &str) {
        match session.parse::<Id>() {
            Ok(id) => {
                *self.id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
            }
            Err(e) => tracing::warn!(error = ?e, "Ignoring unreadable session key"),
        }
    }
}

impl AccessDirectory for BrowserSession {
    async fn list_profiles(&self) -> Result<Vec<AccessRecord>, DirectoryError> {
        self.directory().await?.list_profiles().await
    }

    async fn get_profile(&self, id: &UserId) -> Result<AccessRecord, DirectoryError> {
        self.directory().await?.get_profile(id).await
    }

    async fn set_profile_access(
        &self,
        id: &UserId,
        role: Role,
        status: AccessStatus,
    ) -> Result<(), DirectoryError> {
        self.directory()
            .await?
            .set_profile_access(id, role, status)
            .await
    }

    async fn delete_users(&self, ids: &[UserId]) -> Result<(), DirectoryError> {
        self.directory().await?.delete_users(ids).await
    }

    async fn delete_user_single(&self, id: &UserId) -> Result<(), DirectoryError> {
        self.directory().await?.delete_user_single(id).await
    }
}
