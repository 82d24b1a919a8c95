//! Access resolution and re-resolution on session changes.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use amooora_core::{AccessState, AccessStatus, Role, UserId};
use amooora_integration_tests::{DirectoryCall, FakeSessionOracle, InMemoryDirectory};
use amooora_web::access::{AccessQuery, AccessWatch};
use amooora_web::session::SessionHub;

const WAIT: Duration = Duration::from_secs(5);

fn setup() -> (SessionHub, FakeSessionOracle, InMemoryDirectory) {
    let hub = SessionHub::new();
    let oracle = FakeSessionOracle::new(hub.clone(), "session-1");
    (hub, oracle, InMemoryDirectory::three_records())
}

async fn next(watch: &mut AccessWatch) -> AccessState {
    tokio::time::timeout(WAIT, watch.changed())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_signed_out_is_anonymous() {
    let (_hub, oracle, directory) = setup();
    let state = AccessQuery::new(oracle, directory.clone()).resolve().await;

    assert_eq!(state, AccessState::anonymous());
    assert!(!state.capabilities().authenticated);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_identity_failure_is_treated_as_signed_out() {
    let (_hub, oracle, directory) = setup();
    oracle.sign_in("b", None);
    oracle.fail_identity(Some("JWT expired"));

    let state = AccessQuery::new(oracle, directory.clone()).resolve().await;

    assert_eq!(state, AccessState::anonymous());
    assert_eq!(state.error, None);
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_signed_in_admin_gets_capabilities() {
    let (_hub, oracle, directory) = setup();
    oracle.sign_in("b", Some("bea@example.com"));

    let state = AccessQuery::new(oracle, directory.clone()).resolve().await;

    assert_eq!(state.user_id, Some(UserId::from("b")));
    assert_eq!(state.role, Some(Role::AdminGeneral));
    assert_eq!(state.status, Some(AccessStatus::Active));
    let caps = state.capabilities();
    assert!(caps.is_admin_general);
    assert!(caps.can_manage_places && caps.can_manage_events && caps.can_manage_services);
    assert_eq!(
        directory.calls(),
        vec![DirectoryCall::GetProfile(UserId::from("b"))]
    );
}

#[tokio::test]
async fn test_blocked_user_has_no_management_rights() {
    let (_hub, oracle, directory) = setup();
    directory.set_role("c", Role::AdminEvents);
    oracle.sign_in("c", None);

    let state = AccessQuery::new(oracle, directory).resolve().await;
    let caps = state.capabilities();

    assert!(caps.authenticated);
    assert!(!caps.is_active);
    assert!(!caps.is_any_admin);
    assert!(!caps.can_manage_events);
}

#[tokio::test]
async fn test_missing_record_degrades_to_active_viewer() {
    let (_hub, oracle, directory) = setup();
    oracle.sign_in("zz", Some("zoe@example.com"));

    let state = AccessQuery::new(oracle, directory).resolve().await;

    assert!(state.is_authenticated());
    assert_eq!(state.role, Some(Role::Viewer));
    assert_eq!(state.status, Some(AccessStatus::Active));
    assert_eq!(
        state.error.as_deref(),
        Some("access record not found for user zz")
    );
    assert!(!state.capabilities().is_any_admin);
}

#[tokio::test]
async fn test_record_lookup_failure_keeps_message() {
    let (_hub, oracle, directory) = setup();
    oracle.sign_in("b", None);
    directory.fail_get(Some("permission denied for table profiles"));

    let state = AccessQuery::new(oracle, directory).resolve().await;

    assert_eq!(
        state.error.as_deref(),
        Some("permission denied for table profiles")
    );
    assert!(!state.capabilities().is_admin_general);
}

#[tokio::test]
async fn test_watch_follows_sign_in_and_sign_out() {
    let (_hub, oracle, directory) = setup();
    let mut watch = AccessQuery::new(oracle.clone(), directory)
        .watch()
        .await;
    assert_eq!(watch.current(), AccessState::anonymous());

    oracle.sign_in("b", Some("bea@example.com"));
    let state = next(&mut watch).await;
    assert_eq!(state.role, Some(Role::AdminGeneral));
    assert_eq!(watch.current(), state);

    oracle.sign_out();
    assert_eq!(next(&mut watch).await, AccessState::anonymous());
}

#[tokio::test]
async fn test_watch_follows_sign_in_that_cycles_the_key() {
    let (_hub, oracle, directory) = setup();
    let mut watch = AccessQuery::new(oracle.clone(), directory)
        .watch()
        .await;
    assert_eq!(watch.current(), AccessState::anonymous());

    oracle.sign_in_cycled("session-1b", "b");
    let state = next(&mut watch).await;
    assert_eq!(state.role, Some(Role::AdminGeneral));
    assert_eq!(oracle.session(), "session-1b");

    // Events under the cycled key still reach the watch.
    oracle.sign_out();
    assert_eq!(next(&mut watch).await, AccessState::anonymous());
}

#[tokio::test]
async fn test_watch_picks_up_role_change_on_refresh() {
    let (_hub, oracle, directory) = setup();
    oracle.sign_in("a", None);
    let mut watch = AccessQuery::new(oracle.clone(), directory.clone())
        .watch()
        .await;
    assert_eq!(watch.current().role, Some(Role::Viewer));

    directory.set_role("a", Role::AdminPlaces);
    oracle.refresh();

    let state = next(&mut watch).await;
    assert_eq!(state.role, Some(Role::AdminPlaces));
    assert!(state.capabilities().can_manage_places);
}

#[tokio::test(start_paused = true)]
async fn test_watch_ignores_other_sessions() {
    let (hub, oracle, directory) = setup();
    let other = FakeSessionOracle::new(hub, "session-2");
    let mut watch = AccessQuery::new(oracle, directory.clone()).watch().await;
    directory.clear_calls();

    other.sign_in("b", None);

    let result = tokio::time::timeout(Duration::from_secs(1), watch.changed()).await;
    assert!(result.is_err());
    assert!(directory.calls().is_empty());
}
