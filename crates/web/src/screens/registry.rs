//! Per-session cache of admin screens.

use std::sync::Arc;
use std::time::Duration;

use amooora_core::{AccessDirectory, UserId};
use moka::future::Cache;

use super::AdminUsersScreen;
use crate::session::{SessionEvent, SessionHub};

/// Screens idle this long are dropped.
const SCREEN_IDLE: Duration = Duration::from_secs(30 * 60);

/// Upper bound on cached screens.
const MAX_SCREENS: u64 = 10_000;

/// Admin screens keyed by browser session.
#[derive(Clone)]
pub struct ScreenRegistry {
    users: Cache<String, Arc<AdminUsersScreen>>,
}

impl std::fmt::Debug for ScreenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenRegistry")
            .field("users", &self.users.entry_count())
            .finish()
    }
}

impl Default for ScreenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Cache::builder()
                .max_capacity(MAX_SCREENS)
                .time_to_idle(SCREEN_IDLE)
                .build(),
        }
    }

    /// The session's user management screen, opened and loaded on first use.
    ///
    /// A cached screen opened for a different admin is replaced.
    pub async fn users_screen<D: AccessDirectory>(
        &self,
        session: &str,
        acting_admin: &UserId,
        directory: &D,
    ) -> Arc<AdminUsersScreen> {
        if let Some(screen) = self.users.get(session).await {
            if screen.acting_admin() == acting_admin {
                return screen;
            }
        }

        let screen = Arc::new(AdminUsersScreen::open(acting_admin.clone(), directory).await);
        self.users
            .insert(session.to_owned(), Arc::clone(&screen))
            .await;
        screen
    }

    /// The session's user management screen, if one is open.
    pub async fn cached_users_screen(&self, session: &str) -> Option<Arc<AdminUsersScreen>> {
        self.users.get(session).await
    }

    /// Drop every screen of a session.
    pub async fn evict(&self, session: &str) {
        self.users.invalidate(session).await;
    }

    /// Evict a session's screens whenever it signs in or out.
    pub fn spawn_eviction(&self, hub: &SessionHub) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        let mut subscription = hub.subscribe_all();
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if !matches!(
                    event,
                    SessionEvent::SignedIn { .. } | SessionEvent::SignedOut { .. }
                ) {
                    continue;
                }
                for session in event.session().into_iter().chain(event.previous_session()) {
                    tracing::debug!(session = %session, "Evicting admin screens");
                    registry.evict(session).await;
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evict_removes_screen() {
        let registry = ScreenRegistry::new();
        registry
            .users
            .insert(
                "s1".to_string(),
                Arc::new(AdminUsersScreen::new(UserId::from("b"))),
            )
            .await;

        assert!(registry.cached_users_screen("s1").await.is_some());
        registry.evict("s1").await;
        assert!(registry.cached_users_screen("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_event_evicts() {
        let registry = ScreenRegistry::new();
        let hub = SessionHub::new();
        registry
            .users
            .insert(
                "s1".to_string(),
                Arc::new(AdminUsersScreen::new(UserId::from("b"))),
            )
            .await;
        let task = registry.spawn_eviction(&hub);

        hub.publish(SessionEvent::SignedOut {
            session: "s1".to_string(),
        });
        drop(hub);
        task.await.unwrap();

        assert!(registry.cached_users_screen("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_evicts_the_cycled_key() {
        let registry = ScreenRegistry::new();
        let hub = SessionHub::new();
        registry
            .users
            .insert(
                "old".to_string(),
                Arc::new(AdminUsersScreen::new(UserId::from("b"))),
            )
            .await;
        let task = registry.spawn_eviction(&hub);

        hub.publish(SessionEvent::SignedIn {
            session: "new".to_string(),
            previous: Some("old".to_string()),
        });
        drop(hub);
        task.await.unwrap();

        assert!(registry.cached_users_screen("old").await.is_none());
    }
}
