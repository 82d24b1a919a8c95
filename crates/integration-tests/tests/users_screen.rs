//! Admin user management screen against the in-memory directory.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use amooora_core::{AccessStatus, DirectoryError, Role, UserId};
use amooora_integration_tests::{DirectoryCall, InMemoryDirectory};
use amooora_web::screens::{
    AdminUsersScreen, DraftField, NOTICE_DURATION, SaveOutcome, ScreenError, ScreenPhase,
};

fn ids(values: &[&str]) -> BTreeSet<UserId> {
    values.iter().copied().map(UserId::from).collect()
}

fn id(value: &str) -> UserId {
    UserId::from(value)
}

async fn open_as_b(directory: &InMemoryDirectory) -> AdminUsersScreen {
    let screen = AdminUsersScreen::open(id("b"), directory).await;
    directory.clear_calls();
    screen
}

// ============================================================================
// Search and selection
// ============================================================================

#[tokio::test]
async fn test_search_is_local_and_case_insensitive() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    let found = screen.search("ANA@");
    assert_eq!(found.len(), 1);
    assert_eq!(found.first().unwrap().id, id("a"));

    let everyone = screen.search("");
    let order: Vec<_> = everyone.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);

    assert!(screen.search("nobody").is_empty());
    assert!(screen.visible().is_empty());
    screen.search("caio");
    assert_eq!(screen.visible().first().unwrap().id, id("c"));
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_select_all_skips_acting_admin() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    assert_eq!(screen.selection(), ids(&["a", "c"]));

    screen.toggle_select(&id("b"));
    assert_eq!(screen.selection(), ids(&["a", "c"]));
}

#[tokio::test]
async fn test_select_all_twice_clears() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    screen.toggle_select_all();
    assert!(screen.selection().is_empty());
}

#[tokio::test]
async fn test_select_all_covers_visible_rows_only() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.search("caio");
    screen.toggle_select_all();
    assert_eq!(screen.selection(), ids(&["c"]));

    // A partial selection is completed rather than cleared.
    screen.search("");
    screen.toggle_select_all();
    assert_eq!(screen.selection(), ids(&["a", "c"]));
}

#[tokio::test]
async fn test_own_id_is_never_selected() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.toggle_select(&id("b"));
    screen.search("bea");
    screen.toggle_select_all();
    assert!(screen.selection().is_empty());
}

// ============================================================================
// Saving
// ============================================================================

#[tokio::test]
async fn test_clean_save_issues_no_call() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    let outcome = screen.save_row(&id("a"), &directory).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Unchanged);

    // Editing back to the stored values is clean too.
    screen.edit_draft(&id("a"), DraftField::Role(Role::AdminPlaces));
    screen.edit_draft(&id("a"), DraftField::Role(Role::Viewer));
    let outcome = screen.save_row(&id("a"), &directory).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Unchanged);

    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_own_row_cannot_be_saved() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.edit_draft(&id("b"), DraftField::Status(AccessStatus::Blocked));
    let outcome = screen.save_row(&id("b"), &directory).await.unwrap();

    assert_eq!(outcome, SaveOutcome::SelfProtected);
    assert!(directory.calls().is_empty());
    assert_eq!(directory.record("b").unwrap().status, AccessStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn test_save_reloads_and_shows_notice_for_three_seconds() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.edit_draft(&id("a"), DraftField::Role(Role::AdminPlaces));
    screen.edit_draft(&id("a"), DraftField::Status(AccessStatus::Active));
    let outcome = screen.save_row(&id("a"), &directory).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(
        directory.calls(),
        vec![
            DirectoryCall::SetProfileAccess(id("a"), Role::AdminPlaces, AccessStatus::Active),
            DirectoryCall::ListProfiles,
        ]
    );
    assert_eq!(directory.record("a").unwrap().role, Role::AdminPlaces);
    assert_eq!(screen.phase(), ScreenPhase::Ready);
    assert!(!screen.snapshot().rows.iter().any(|row| row.dirty));

    let expected = Some("Access updated for ana@example.com.".to_string());
    assert_eq!(screen.notice(), expected);

    tokio::time::advance(NOTICE_DURATION - Duration::from_millis(1)).await;
    assert_eq!(screen.notice(), expected);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(screen.notice(), None);
}

#[tokio::test]
async fn test_failed_save_keeps_draft() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;
    directory.fail_set(Some("permission denied for function set_profile_access"));

    screen.edit_draft(&id("c"), DraftField::Status(AccessStatus::Active));
    let err = screen.save_row(&id("c"), &directory).await.unwrap_err();

    assert_eq!(
        err,
        ScreenError::Directory(DirectoryError::Backend(
            "permission denied for function set_profile_access".to_string()
        ))
    );
    assert_eq!(
        screen.phase().error(),
        Some("permission denied for function set_profile_access")
    );
    assert_eq!(
        screen.draft(&id("c")).unwrap().status,
        AccessStatus::Active
    );
    assert_eq!(screen.saving(), None);
    assert_eq!(screen.notice(), None);

    // Retrying with the kept draft succeeds.
    directory.fail_set(None);
    let outcome = screen.save_row(&id("c"), &directory).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(directory.record("c").unwrap().status, AccessStatus::Active);
}

#[tokio::test]
async fn test_save_of_unknown_user_is_rejected() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    let err = screen.save_row(&id("zz"), &directory).await.unwrap_err();
    assert_eq!(err, ScreenError::UnknownUser(id("zz")));
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_mutations_are_refused_while_saving() {
    let directory = InMemoryDirectory::three_records();
    let screen = Arc::new(open_as_b(&directory).await);
    let gate = directory.hold_writes();

    screen.edit_draft(&id("a"), DraftField::Role(Role::AdminEvents));
    screen.toggle_select(&id("c"));

    let save = tokio::spawn({
        let screen = Arc::clone(&screen);
        let directory = directory.clone();
        async move { screen.save_row(&id("a"), &directory).await }
    });
    while screen.saving().is_none() {
        tokio::task::yield_now().await;
    }

    assert_eq!(screen.load(&directory).await, Err(ScreenError::Busy));
    assert_eq!(screen.request_delete().unwrap_err(), ScreenError::Busy);
    assert!(screen.snapshot().busy);

    gate.notify_one();
    assert_eq!(save.await.unwrap(), Ok(SaveOutcome::Saved));
    assert!(!screen.snapshot().busy);
    assert_eq!(directory.record("a").unwrap().role, Role::AdminEvents);
}

#[tokio::test]
async fn test_cancelled_save_releases_the_screen() {
    let directory = InMemoryDirectory::three_records();
    let screen = Arc::new(open_as_b(&directory).await);
    let _gate = directory.hold_writes();

    screen.edit_draft(&id("a"), DraftField::Role(Role::AdminEvents));
    let save = tokio::spawn({
        let screen = Arc::clone(&screen);
        let directory = directory.clone();
        async move { screen.save_row(&id("a"), &directory).await }
    });
    while screen.saving().is_none() {
        tokio::task::yield_now().await;
    }

    save.abort();
    assert!(save.await.unwrap_err().is_cancelled());

    assert_eq!(screen.saving(), None);
    assert!(!screen.snapshot().busy);
    assert_eq!(directory.record("a").unwrap().role, Role::Viewer);

    directory.release_holds();
    screen.load(&directory).await.unwrap();
    assert_eq!(screen.phase(), ScreenPhase::Ready);
}

#[tokio::test]
async fn test_cancelled_delete_releases_the_screen() {
    let directory = InMemoryDirectory::three_records();
    let screen = Arc::new(open_as_b(&directory).await);
    let _gate = directory.hold_writes();

    screen.toggle_select_all();
    let confirmation = screen.request_delete().unwrap();
    let delete = tokio::spawn({
        let screen = Arc::clone(&screen);
        let directory = directory.clone();
        async move { screen.confirm_delete(&confirmation, &directory).await }
    });
    while !screen.is_deleting() {
        tokio::task::yield_now().await;
    }

    delete.abort();
    assert!(delete.await.unwrap_err().is_cancelled());

    assert!(!screen.is_deleting());
    assert_eq!(screen.selection(), ids(&["a", "c"]));
    assert_eq!(screen.request_delete().unwrap().count(), 2);
}

#[tokio::test]
async fn test_cancelled_reload_restores_the_phase() {
    let directory = InMemoryDirectory::three_records();
    let screen = Arc::new(open_as_b(&directory).await);
    screen.toggle_select(&id("c"));
    let _gate = directory.hold_reads();

    let load = tokio::spawn({
        let screen = Arc::clone(&screen);
        let directory = directory.clone();
        async move { screen.load(&directory).await }
    });
    while screen.phase() != ScreenPhase::Loading {
        tokio::task::yield_now().await;
    }

    load.abort();
    assert!(load.await.unwrap_err().is_cancelled());

    assert_eq!(screen.phase(), ScreenPhase::Ready);
    assert!(!screen.snapshot().busy);
    assert_eq!(screen.records().len(), 3);
    assert_eq!(screen.request_delete().unwrap().count(), 1);
}

// ============================================================================
// Deleting
// ============================================================================

#[tokio::test]
async fn test_delete_without_selection_is_refused() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    assert_eq!(
        screen.request_delete().unwrap_err(),
        ScreenError::EmptySelection
    );
    assert_eq!(
        screen.phase().error(),
        Some("select at least one account to delete")
    );
}

#[tokio::test]
async fn test_batch_delete_clears_selection_and_reloads() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    let confirmation = screen.request_delete().unwrap();
    assert_eq!(confirmation.count(), 2);
    assert_eq!(
        confirmation.prompt(),
        "Delete 2 accounts? This cannot be undone."
    );

    let report = screen
        .confirm_delete(&confirmation, &directory)
        .await
        .unwrap();

    assert!(!report.sequential);
    assert_eq!(report.deleted, vec![id("a"), id("c")]);
    assert_eq!(
        directory.calls(),
        vec![
            DirectoryCall::DeleteUsers(vec![id("a"), id("c")]),
            DirectoryCall::ListProfiles,
        ]
    );
    assert!(screen.selection().is_empty());
    assert_eq!(directory.ids(), vec![id("b")]);
    assert_eq!(screen.records().len(), 1);
    assert_eq!(screen.notice(), Some("Deleted 2 accounts.".to_string()));
}

#[tokio::test]
async fn test_fallback_delete_names_failed_account() {
    let directory = InMemoryDirectory::three_records();
    directory.make_batch_unavailable();
    directory.fail_delete_of("c");
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    let confirmation = screen.request_delete().unwrap();
    let err = screen
        .confirm_delete(&confirmation, &directory)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ScreenError::PartialDelete {
            failed: id("c"),
            deleted: vec![id("a")],
            message: "cannot delete c".to_string(),
        }
    );
    assert_eq!(
        directory.calls(),
        vec![
            DirectoryCall::DeleteUsers(vec![id("a"), id("c")]),
            DirectoryCall::DeleteUserSingle(id("a")),
            DirectoryCall::DeleteUserSingle(id("c")),
        ]
    );
    assert_eq!(
        screen.phase().error(),
        Some("failed to delete user c (1 deleted before the failure): cannot delete c")
    );
    assert_eq!(screen.selection(), ids(&["a", "c"]));
    assert!(!screen.is_deleting());

    // The next reload shows "a" gone and "c" still there.
    screen.load(&directory).await.unwrap();
    let remaining: Vec<_> = screen.records().into_iter().map(|r| r.id).collect();
    assert_eq!(remaining, vec![id("b"), id("c")]);
}

#[tokio::test]
async fn test_batch_failure_deletes_nothing() {
    let directory = InMemoryDirectory::three_records();
    directory.fail_delete_of("a");
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    let confirmation = screen.request_delete().unwrap();
    let err = screen
        .confirm_delete(&confirmation, &directory)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ScreenError::Directory(DirectoryError::Backend("cannot delete a".to_string()))
    );
    assert_eq!(directory.ids().len(), 3);
    assert_eq!(screen.selection(), ids(&["a", "c"]));
}

#[tokio::test]
async fn test_changed_selection_needs_new_confirmation() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;

    screen.toggle_select_all();
    let confirmation = screen.request_delete().unwrap();
    screen.toggle_select(&id("a"));

    let err = screen
        .confirm_delete(&confirmation, &directory)
        .await
        .unwrap_err();
    assert_eq!(err, ScreenError::SelectionChanged);
    assert!(directory.calls().is_empty());
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_failed_first_load_leaves_empty_screen() {
    let directory = InMemoryDirectory::three_records();
    directory.fail_list(Some("connection refused"));

    let screen = AdminUsersScreen::open(id("b"), &directory).await;

    assert_eq!(
        screen.phase(),
        ScreenPhase::ReadyWithError("connection refused".to_string())
    );
    assert!(screen.records().is_empty());
    assert!(screen.search("ana").is_empty());
    screen.toggle_select_all();
    assert!(screen.selection().is_empty());
}

#[tokio::test]
async fn test_failed_reload_keeps_stale_records() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;
    screen.toggle_select(&id("a"));
    screen.edit_draft(&id("c"), DraftField::Role(Role::AdminServices));

    directory.fail_list(Some("connection refused"));
    let err = screen.load(&directory).await.unwrap_err();

    assert_eq!(
        err,
        ScreenError::Directory(DirectoryError::Backend("connection refused".to_string()))
    );
    assert_eq!(screen.phase().error(), Some("connection refused"));
    assert_eq!(screen.records().len(), 3);
    assert_eq!(screen.selection(), ids(&["a"]));
    assert_eq!(screen.draft(&id("c")).unwrap().role, Role::AdminServices);

    // Search and selection keep working over the stale records.
    assert_eq!(screen.search("caio").len(), 1);
    screen.toggle_select_all();
    assert_eq!(screen.selection(), ids(&["c"]));
}

#[tokio::test]
async fn test_reload_picks_up_outside_changes() {
    let directory = InMemoryDirectory::three_records();
    let screen = open_as_b(&directory).await;
    screen.toggle_select(&id("a"));

    directory.set_role("c", Role::AdminEvents);
    screen.load(&directory).await.unwrap();

    assert_eq!(screen.phase(), ScreenPhase::Ready);
    assert!(screen.selection().is_empty());
    assert_eq!(screen.draft(&id("c")).unwrap().role, Role::AdminEvents);
}
