//! In-process broadcast of session changes.
//!
//! Sign-in, sign-out and token refresh handlers publish a [`SessionEvent`];
//! anything that derives state from a browser session (access watchers, the
//! screen registry) subscribes and reacts.

use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// A change to one browser session's authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in.
    ///
    /// Signing in cycles the session key, so the event carries both keys;
    /// subscribers bound to `previous` follow the session to `session`.
    SignedIn {
        /// Session key after sign-in.
        session: String,
        /// Session key before sign-in, if the browser had one.
        previous: Option<String>,
    },
    /// The user signed out, or their refresh token was rejected.
    SignedOut {
        /// Session key.
        session: String,
    },
    /// The access token was refreshed.
    TokenRefreshed {
        /// Session key.
        session: String,
    },
    /// Events were missed; state must be re-derived from scratch.
    Resync,
}

impl SessionEvent {
    /// Key of the session the event concerns, if any.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        match self {
            Self::SignedIn { session, .. }
            | Self::SignedOut { session }
            | Self::TokenRefreshed { session } => Some(session),
            Self::Resync => None,
        }
    }

    /// Key the session had before this event cycled it.
    #[must_use]
    pub fn previous_session(&self) -> Option<&str> {
        match self {
            Self::SignedIn { previous, .. } => previous.as_deref(),
            _ => None,
        }
    }
}

/// Broadcast hub for session events.
#[derive(Debug, Clone)]
pub struct SessionHub {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    /// Create a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every subscriber.
    pub fn publish(&self, event: SessionEvent) {
        tracing::debug!(?event, "Publishing session event");
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to the events of one session.
    ///
    /// `None` is a browser that has no session yet; it only sees
    /// [`SessionEvent::Resync`].
    #[must_use]
    pub fn subscribe(&self, session: Option<&str>) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
            scope: match session {
                Some(key) => Scope::Session(key.to_owned()),
                None => Scope::Unbound,
            },
        }
    }

    /// Subscribe to the events of every session.
    #[must_use]
    pub fn subscribe_all(&self) -> SessionSubscription {
        SessionSubscription {
            receiver: self.sender.subscribe(),
            scope: Scope::All,
        }
    }
}

#[derive(Debug)]
enum Scope {
    All,
    Session(String),
    Unbound,
}

/// A live subscription to session events.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionEvent>,
    scope: Scope,
}

impl SessionSubscription {
    /// Wait for the next event in scope.
    ///
    /// A lagging subscriber receives [`SessionEvent::Resync`]. Returns `None`
    /// once the hub is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.in_scope(&event) => {
                    self.follow(&event);
                    return Some(event);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session subscriber lagged");
                    return Some(SessionEvent::Resync);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {}

    fn in_scope(&self, event: &SessionEvent) -> bool {
        match (&self.scope, event.session()) {
            (_, None) | (Scope::All, _) => true,
            (Scope::Session(key), Some(session)) => {
                key == session || event.previous_session() == Some(key.as_str())
            }
            (Scope::Unbound, Some(_)) => false,
        }
    }

    /// Rebind to the new key when a sign-in cycled ours.
    fn follow(&mut self, event: &SessionEvent) {
        let (Scope::Session(key), Some(session)) = (&mut self.scope, event.session()) else {
            return;
        };
        if event.previous_session() == Some(key.as_str()) {
            session.clone_into(key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signed_in(session: &str) -> SessionEvent {
        SessionEvent::SignedIn {
            session: session.to_string(),
            previous: None,
        }
    }

    fn signed_out(session: &str) -> SessionEvent {
        SessionEvent::SignedOut {
            session: session.to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_subscription_filters_other_sessions() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe(Some("a"));

        hub.publish(signed_in("b"));
        hub.publish(signed_in("a"));

        assert_eq!(subscription.recv().await, Some(signed_in("a")));
    }

    #[tokio::test]
    async fn test_subscription_follows_cycled_key() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe(Some("old"));
        let cycled = SessionEvent::SignedIn {
            session: "new".to_string(),
            previous: Some("old".to_string()),
        };

        hub.publish(cycled.clone());
        assert_eq!(subscription.recv().await, Some(cycled));

        hub.publish(signed_out("old"));
        hub.publish(signed_out("new"));
        assert_eq!(subscription.recv().await, Some(signed_out("new")));
    }

    #[tokio::test]
    async fn test_subscribe_all_sees_every_session() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe_all();

        hub.publish(signed_in("b"));
        assert_eq!(subscription.recv().await, Some(signed_in("b")));
    }

    #[tokio::test]
    async fn test_unbound_subscription_only_sees_resync() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe(None);

        hub.publish(signed_in("a"));
        hub.publish(SessionEvent::Resync);

        assert_eq!(subscription.recv().await, Some(SessionEvent::Resync));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_resync() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe(Some("a"));

        for _ in 0..=CHANNEL_CAPACITY {
            hub.publish(signed_in("a"));
        }

        assert_eq!(subscription.recv().await, Some(SessionEvent::Resync));
    }

    #[tokio::test]
    async fn test_recv_ends_when_hub_dropped() {
        let hub = SessionHub::new();
        let mut subscription = hub.subscribe_all();
        drop(hub);

        assert_eq!(subscription.recv().await, None);
    }
}
