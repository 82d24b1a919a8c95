//! Access state stream.
//!
//! The navigation shell script listens here and refreshes the page when the
//! session's access changes (sign-in or sign-out in another tab, token
//! refresh, role change picked up on re-resolve).

use std::convert::Infallible;

use amooora_core::{AccessState, AccessStatus, Capabilities, Role, UserId};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::session::keys;
use crate::state::AppState;

/// Access state as sent to the browser.
#[derive(Debug, Serialize)]
pub struct AccessPayload {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccessStatus>,
    pub error: Option<String>,
    pub capabilities: Capabilities,
}

impl From<&AccessState> for AccessPayload {
    fn from(access: &AccessState) -> Self {
        Self {
            authenticated: access.is_authenticated(),
            user_id: access.user_id.clone(),
            email: access.email.clone(),
            role: access.role,
            status: access.status,
            error: access.error.clone(),
            capabilities: access.capabilities(),
        }
    }
}

fn access_event(access: &AccessState) -> Event {
    let json = serde_json::to_string(&AccessPayload::from(access)).unwrap_or_else(|_| {
        r#"{"authenticated":false,"error":"Failed to serialize access"}"#.to_string()
    });
    Event::default().event("access").data(json)
}

/// Stream the session's access state.
///
/// GET /api/session/access
///
/// Sends the current state immediately, then again after every session
/// change. A visitor without a session gets one first, so a later sign-in
/// in another tab reaches this stream. Closing the stream releases the
/// session subscription.
#[instrument(skip(state, session))]
pub async fn access_stream(
    State(state): State<AppState>,
    session: Session,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    if session.id().is_none() {
        establish(&session).await;
    }
    let browser = state.browser_session(&session);
    let mut watch = state.access_query(&browser).watch().await;

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(access_event(&watch.current()));
        while let Some(access) = watch.changed().await {
            yield Ok(access_event(&access));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Give a visitor's session a key.
async fn establish(session: &Session) {
    if let Err(e) = session.insert(keys::VISITOR, true).await {
        tracing::warn!(error = %e, "Failed to mark visitor session");
        return;
    }
    if let Err(e) = session.save().await {
        tracing::warn!(error = %e, "Failed to create visitor session");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use amooora_core::AccessRecord;

    use super::*;

    #[test]
    fn test_payload_carries_capabilities() {
        let record = AccessRecord::new("u-1", Role::AdminPlaces, AccessStatus::Active);
        let access = AccessState::from_record(None, &record);
        let value = serde_json::to_value(AccessPayload::from(&access)).unwrap();

        assert_eq!(value["authenticated"], true);
        assert_eq!(value["role"], "admin-places");
        assert_eq!(value["capabilities"]["can_manage_places"], true);
        assert_eq!(value["capabilities"]["is_admin_general"], false);
    }
}
