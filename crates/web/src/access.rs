//! Access query: the current session's role, status and capabilities.
//!
//! [`AccessQuery::resolve`] asks the session oracle who is signed in and
//! fetches that user's access record. Failures never propagate:
//!
//! - identity lookup fails: treated as signed out, logged only
//! - access record lookup fails: active viewer, with the message kept in
//!   [`AccessState::error`]
//!
//! [`AccessQuery::watch`] keeps the answer current by re-resolving on every
//! session change.

use amooora_core::{AccessDirectory, AccessState};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::SessionOracle;

/// Derives [`AccessState`] from a session oracle and an access directory.
#[derive(Debug, Clone)]
pub struct AccessQuery<O, D> {
    oracle: O,
    directory: D,
}

impl<O, D> AccessQuery<O, D>
where
    O: SessionOracle,
    D: AccessDirectory,
{
    /// Create a query over the given collaborators.
    pub const fn new(oracle: O, directory: D) -> Self {
        Self { oracle, directory }
    }

    /// Resolve the access state once.
    pub async fn resolve(&self) -> AccessState {
        let user = match self.oracle.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return AccessState::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "Identity lookup failed; treating session as signed out");
                return AccessState::anonymous();
            }
        };

        match self.directory.get_profile(&user.id).await {
            Ok(record) => AccessState::from_record(user.email, &record),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Access record lookup failed; degrading to viewer");
                AccessState::degraded(user.id, user.email, e.to_string())
            }
        }
    }

    /// Resolve now and keep re-resolving on every session change.
    ///
    /// The subscription is taken before the first resolve so no change is
    /// missed in between. A sign-in that cycles the session key rekeys the
    /// oracle before re-resolving. Dropping the returned [`AccessWatch`] stops the
    /// background task and releases the subscription.
    pub async fn watch(self) -> AccessWatch
    where
        O: 'static,
        D: 'static,
    {
        let mut subscription = self.oracle.subscribe();
        let (sender, receiver) = watch::channel(self.resolve().await);

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                tracing::debug!(?event, "Session changed; re-resolving access");
                if let (Some(session), Some(_)) = (event.session(), event.previous_session()) {
                    self.oracle.rekey(session);
                }
                let state = self.resolve().await;
                if sender.send(state).is_err() {
                    break;
                }
            }
        });

        AccessWatch { receiver, task }
    }
}

/// Live access state, kept current by a background task.
#[derive(Debug)]
pub struct AccessWatch {
    receiver: watch::Receiver<AccessState>,
    task: JoinHandle<()>,
}

impl AccessWatch {
    /// The latest resolved state.
    #[must_use]
    pub fn current(&self) -> AccessState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next re-resolved state.
    ///
    /// Returns `None` once the session subscription has ended.
    pub async fn changed(&mut self) -> Option<AccessState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl Drop for AccessWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
