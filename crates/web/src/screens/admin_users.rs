//! Admin user management screen.
//!
//! One [`AdminUsersScreen`] exists per browser session of a general admin. It
//! holds the loaded access records, one draft `(role, status)` per record, the
//! selection for bulk deletion, the search query and a transient notice.
//!
//! # Phases
//!
//! ```text
//! Loading ──list ok──▶ Ready ◀──────────────┐
//!    │                   │ save / delete    │ ok (reload)
//!    └──list err──▶ ReadyWithError ─────────┘
//! ```
//!
//! In-flight markers (`saving`, `deleting`, and a running load) refuse any
//! other mutation with [`ScreenError::Busy`] without calling the directory.
//! The state lock is never held across a directory call.
//!
//! The acting admin can never select, edit, save or delete their own record.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use amooora_core::{
    AccessDirectory, AccessRecord, AccessStatus, DirectoryError, Role, UserId, filter_records,
};
use thiserror::Error;
use tokio::time::Instant;

use crate::services::{DeleteError, DeleteReport, delete_accounts};

/// How long a success notice stays visible.
pub const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Errors from screen operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreenError {
    /// A load, save or delete is already running.
    #[error("another change is still in progress")]
    Busy,

    /// Delete was requested with nothing selected.
    #[error("select at least one account to delete")]
    EmptySelection,

    /// The selection changed between confirmation and deletion.
    #[error("the selection changed; review it and confirm again")]
    SelectionChanged,

    /// The user is not among the loaded records.
    #[error("unknown user {0}")]
    UnknownUser(UserId),

    /// The directory call failed; message is the backend's.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// One-at-a-time deletion stopped at `failed`.
    #[error("failed to delete user {failed} ({} deleted before the failure): {message}", .deleted.len())]
    PartialDelete {
        /// Account whose deletion failed.
        failed: UserId,
        /// Accounts deleted before the failure.
        deleted: Vec<UserId>,
        /// Backend message for the failure.
        message: String,
    },
}

impl From<DeleteError> for ScreenError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::Directory(e) => Self::Directory(e),
            DeleteError::Partial {
                failed,
                deleted,
                message,
            } => Self::PartialDelete {
                failed,
                deleted,
                message,
            },
        }
    }
}

/// Screen phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenPhase {
    /// Records are being fetched.
    Loading,
    /// Records are loaded.
    Ready,
    /// The last operation failed; the message is shown and the screen stays usable.
    ReadyWithError(String),
}

impl ScreenPhase {
    /// The error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::ReadyWithError(message) => Some(message),
            Self::Loading | Self::Ready => None,
        }
    }
}

/// Pending role and status for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftEdit {
    /// Pending role.
    pub role: Role,
    /// Pending status.
    pub status: AccessStatus,
}

impl DraftEdit {
    /// Whether the draft differs from `record`.
    #[must_use]
    pub fn is_dirty(&self, record: &AccessRecord) -> bool {
        self.role != record.role || self.status != record.status
    }
}

impl From<&AccessRecord> for DraftEdit {
    fn from(record: &AccessRecord) -> Self {
        Self {
            role: record.role,
            status: record.status,
        }
    }
}

/// One field of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    /// New role.
    Role(Role),
    /// New status.
    Status(AccessStatus),
}

/// Result of [`AdminUsersScreen::save_row`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The change was stored and the records reloaded.
    Saved,
    /// The draft matched the record; nothing was sent.
    Unchanged,
    /// The row is the acting admin's own; nothing was sent.
    SelfProtected,
}

/// Pending bulk deletion awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    ids: BTreeSet<UserId>,
}

impl DeleteConfirmation {
    /// Confirmation for exactly `ids`.
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Accounts to delete.
    #[must_use]
    pub const fn ids(&self) -> &BTreeSet<UserId> {
        &self.ids
    }

    /// Number of accounts to delete.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Warning shown before deleting.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.count() {
            1 => "Delete 1 account? This cannot be undone.".to_string(),
            n => format!("Delete {n} accounts? This cannot be undone."),
        }
    }
}

/// One row as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenRow {
    /// The loaded record.
    pub record: AccessRecord,
    /// Its draft.
    pub draft: DraftEdit,
    /// Whether the draft differs from the record.
    pub dirty: bool,
    /// Whether the row is selected.
    pub selected: bool,
    /// Whether the row is the acting admin's own.
    pub is_self: bool,
    /// Whether this row is being saved.
    pub saving: bool,
}

/// Consistent view of the whole screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    /// Current phase.
    pub phase: ScreenPhase,
    /// Current search query.
    pub query: String,
    /// Rows matching the query.
    pub rows: Vec<ScreenRow>,
    /// Total loaded records.
    pub total: usize,
    /// Number of selected accounts.
    pub selected_count: usize,
    /// Whether every selectable visible row is selected.
    pub all_selected: bool,
    /// Whether any mutation is running.
    pub busy: bool,
    /// Whether a delete is running.
    pub deleting: bool,
    /// Visible success notice.
    pub notice: Option<String>,
}

#[derive(Debug)]
struct Notice {
    message: String,
    expires_at: Instant,
}

impl Notice {
    fn new(message: String) -> Self {
        Self {
            message,
            expires_at: Instant::now() + NOTICE_DURATION,
        }
    }
}

#[derive(Debug)]
struct ScreenState {
    phase: ScreenPhase,
    records: Vec<AccessRecord>,
    drafts: HashMap<UserId, DraftEdit>,
    selection: BTreeSet<UserId>,
    query: String,
    loading: bool,
    saving: Option<UserId>,
    deleting: bool,
    notice: Option<Notice>,
}

impl ScreenState {
    const fn is_mutating(&self) -> bool {
        self.loading || self.saving.is_some() || self.deleting
    }

    fn ensure_can_mutate(&self) -> Result<(), ScreenError> {
        if self.phase == ScreenPhase::Loading || self.is_mutating() {
            return Err(ScreenError::Busy);
        }
        Ok(())
    }

    fn record(&self, id: &UserId) -> Option<&AccessRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    fn selectable(&self, acting_admin: &UserId) -> BTreeSet<UserId> {
        filter_records(&self.records, &self.query)
            .into_iter()
            .filter(|r| &r.id != acting_admin)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Replace records and reset drafts and selection, or keep everything and
    /// record the error.
    fn apply_reload(
        &mut self,
        result: Result<Vec<AccessRecord>, DirectoryError>,
    ) -> Result<(), DirectoryError> {
        match result {
            Ok(records) => {
                self.drafts = records
                    .iter()
                    .map(|r| (r.id.clone(), DraftEdit::from(r)))
                    .collect();
                self.selection.clear();
                self.records = records;
                self.phase = ScreenPhase::Ready;
                Ok(())
            }
            Err(e) => {
                self.phase = ScreenPhase::ReadyWithError(e.to_string());
                Err(e)
            }
        }
    }

    fn current_notice(&mut self) -> Option<String> {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| Instant::now() >= n.expires_at)
        {
            self.notice = None;
        }
        self.notice.as_ref().map(|n| n.message.clone())
    }
}

/// An in-flight operation.
#[derive(Debug)]
enum Marker {
    /// A load; the phase to restore if it never completes.
    Loading(ScreenPhase),
    Saving,
    Deleting,
}

/// Clears an in-flight marker when dropped, so a cancelled directory call
/// cannot leave the screen busy.
///
/// Must be dropped before the state lock is taken again.
#[must_use]
struct InFlight<'a> {
    screen: &'a AdminUsersScreen,
    marker: Option<Marker>,
}

impl InFlight<'_> {
    /// Clear the marker now.
    fn finish(mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        let Some(marker) = self.marker.take() else {
            return;
        };
        let mut state = self.screen.state();
        match marker {
            Marker::Loading(previous) => {
                state.loading = false;
                if state.phase == ScreenPhase::Loading {
                    state.phase = previous;
                }
            }
            Marker::Saving => state.saving = None,
            Marker::Deleting => state.deleting = false,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.marker.is_some() {
            tracing::debug!(marker = ?self.marker, "In-flight operation dropped");
        }
        self.clear();
    }
}

/// User management screen for one acting admin.
#[derive(Debug)]
pub struct AdminUsersScreen {
    acting_admin: UserId,
    state: Mutex<ScreenState>,
}

impl AdminUsersScreen {
    /// Create an empty screen in the loading phase.
    #[must_use]
    pub fn new(acting_admin: UserId) -> Self {
        Self {
            acting_admin,
            state: Mutex::new(ScreenState {
                phase: ScreenPhase::Loading,
                records: Vec::new(),
                drafts: HashMap::new(),
                selection: BTreeSet::new(),
                query: String::new(),
                loading: false,
                saving: None,
                deleting: false,
                notice: None,
            }),
        }
    }

    /// Create a screen and load the records.
    ///
    /// A failed load leaves the screen in [`ScreenPhase::ReadyWithError`].
    pub async fn open<D: AccessDirectory>(acting_admin: UserId, directory: &D) -> Self {
        let screen = Self::new(acting_admin);
        if let Err(e) = screen.load(directory).await {
            tracing::warn!(error = %e, "Initial user list load failed");
        }
        screen
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self, marker: Marker) -> InFlight<'_> {
        InFlight {
            screen: self,
            marker: Some(marker),
        }
    }

    /// The admin using this screen.
    #[must_use]
    pub const fn acting_admin(&self) -> &UserId {
        &self.acting_admin
    }

    /// Fetch all records.
    ///
    /// On success drafts and selection are reset; on failure the previous
    /// records, drafts and selection are kept.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Busy` while another operation runs, or the
    /// directory error (also shown through the phase).
    pub async fn load<D: AccessDirectory>(&self, directory: &D) -> Result<(), ScreenError> {
        let previous = {
            let mut state = self.state();
            if state.is_mutating() {
                return Err(ScreenError::Busy);
            }
            state.loading = true;
            std::mem::replace(&mut state.phase, ScreenPhase::Loading)
        };
        let in_flight = self.in_flight(Marker::Loading(previous));

        let result = directory.list_profiles().await;
        in_flight.finish();

        let mut state = self.state();
        state.apply_reload(result)?;
        tracing::debug!(count = state.records.len(), "User list loaded");
        Ok(())
    }

    /// Set the search query and return the matching records.
    ///
    /// Filtering is local; the directory is not called.
    pub fn search(&self, query: &str) -> Vec<AccessRecord> {
        query.clone_into(&mut self.state().query);
        self.visible()
    }

    /// Records matching the current query, in load order.
    #[must_use]
    pub fn visible(&self) -> Vec<AccessRecord> {
        let state = self.state();
        filter_records(&state.records, &state.query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Flip selection of `id`.
    ///
    /// No-op for the acting admin and for ids that are not loaded.
    pub fn toggle_select(&self, id: &UserId) {
        if id == &self.acting_admin {
            return;
        }
        let mut state = self.state();
        if state.record(id).is_none() {
            return;
        }
        if !state.selection.remove(id) {
            state.selection.insert(id.clone());
        }
    }

    /// Select every visible record except the acting admin's, or clear the
    /// selection if exactly that set is already selected.
    pub fn toggle_select_all(&self) {
        let mut state = self.state();
        let selectable = state.selectable(&self.acting_admin);
        if state.selection == selectable {
            state.selection.clear();
        } else {
            state.selection = selectable;
        }
    }

    /// Overwrite one field of a draft.
    ///
    /// No-op for the acting admin and for ids that are not loaded.
    pub fn edit_draft(&self, id: &UserId, field: DraftField) {
        if id == &self.acting_admin {
            return;
        }
        let mut state = self.state();
        if let Some(draft) = state.drafts.get_mut(id) {
            match field {
                DraftField::Role(role) => draft.role = role,
                DraftField::Status(status) => draft.status = status,
            }
        }
    }

    /// Store one row's draft.
    ///
    /// On success the records are reloaded and a notice is shown for
    /// [`NOTICE_DURATION`]. On failure the draft is kept for a retry.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Busy` while another operation runs,
    /// `ScreenError::UnknownUser` for an id that is not loaded, or the
    /// directory error verbatim.
    pub async fn save_row<D: AccessDirectory>(
        &self,
        id: &UserId,
        directory: &D,
    ) -> Result<SaveOutcome, ScreenError> {
        if id == &self.acting_admin {
            return Ok(SaveOutcome::SelfProtected);
        }

        let (draft, label) = {
            let mut state = self.state();
            state.ensure_can_mutate()?;
            let record = state
                .record(id)
                .ok_or_else(|| ScreenError::UnknownUser(id.clone()))?;
            let draft = state
                .drafts
                .get(id)
                .copied()
                .unwrap_or_else(|| DraftEdit::from(record));
            if !draft.is_dirty(record) {
                return Ok(SaveOutcome::Unchanged);
            }
            let label = record.label().to_owned();
            state.saving = Some(id.clone());
            (draft, label)
        };
        let in_flight = self.in_flight(Marker::Saving);

        if let Err(e) = directory
            .set_profile_access(id, draft.role, draft.status)
            .await
        {
            tracing::warn!(user_id = %id, error = %e, "Saving access failed");
            in_flight.finish();
            let mut state = self.state();
            state.phase = ScreenPhase::ReadyWithError(e.to_string());
            return Err(e.into());
        }
        tracing::info!(user_id = %id, role = %draft.role, status = %draft.status, "Access updated");

        let reload = directory.list_profiles().await;
        in_flight.finish();

        let mut state = self.state();
        if let Err(e) = state.apply_reload(reload) {
            tracing::warn!(error = %e, "Reload after save failed");
        }
        state.notice = Some(Notice::new(format!("Access updated for {label}.")));
        Ok(SaveOutcome::Saved)
    }

    /// Start a bulk delete of the current selection.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::EmptySelection` (also shown through the phase)
    /// when nothing is selected, or `ScreenError::Busy` while another
    /// operation runs.
    pub fn request_delete(&self) -> Result<DeleteConfirmation, ScreenError> {
        let mut state = self.state();
        state.ensure_can_mutate()?;
        if state.selection.is_empty() {
            let err = ScreenError::EmptySelection;
            state.phase = ScreenPhase::ReadyWithError(err.to_string());
            return Err(err);
        }
        Ok(DeleteConfirmation {
            ids: state.selection.clone(),
        })
    }

    /// Delete the confirmed accounts.
    ///
    /// On success the selection is cleared, the records are reloaded and a
    /// notice is shown. On failure the selection is kept. After a partial
    /// delete nothing is reloaded; the next load shows what was removed.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::SelectionChanged` if the selection no longer
    /// matches `confirmation`, `ScreenError::Busy` while another operation
    /// runs, `ScreenError::PartialDelete` if the one-at-a-time fallback
    /// stopped early, or the directory error verbatim.
    pub async fn confirm_delete<D: AccessDirectory>(
        &self,
        confirmation: &DeleteConfirmation,
        directory: &D,
    ) -> Result<DeleteReport, ScreenError> {
        let ids: Vec<UserId> = {
            let mut state = self.state();
            state.ensure_can_mutate()?;
            if state.selection != confirmation.ids {
                return Err(ScreenError::SelectionChanged);
            }
            state.deleting = true;
            state.selection.iter().cloned().collect()
        };
        let in_flight = self.in_flight(Marker::Deleting);

        match delete_accounts(directory, &ids).await {
            Ok(report) => {
                tracing::info!(
                    count = report.deleted.len(),
                    sequential = report.sequential,
                    "Accounts deleted"
                );
                let reload = directory.list_profiles().await;
                in_flight.finish();

                let mut state = self.state();
                state.selection.clear();
                if let Err(e) = state.apply_reload(reload) {
                    tracing::warn!(error = %e, "Reload after delete failed");
                }
                let message = match report.deleted.len() {
                    1 => "Deleted 1 account.".to_string(),
                    n => format!("Deleted {n} accounts."),
                };
                state.notice = Some(Notice::new(message));
                Ok(report)
            }
            Err(e) => {
                let err = ScreenError::from(e);
                in_flight.finish();
                let mut state = self.state();
                state.phase = ScreenPhase::ReadyWithError(err.to_string());
                Err(err)
            }
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ScreenPhase {
        self.state().phase.clone()
    }

    /// Row being saved, if any.
    #[must_use]
    pub fn saving(&self) -> Option<UserId> {
        self.state().saving.clone()
    }

    /// Whether a delete is running.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.state().deleting
    }

    /// Selected accounts.
    #[must_use]
    pub fn selection(&self) -> BTreeSet<UserId> {
        self.state().selection.clone()
    }

    /// Draft of one record.
    #[must_use]
    pub fn draft(&self, id: &UserId) -> Option<DraftEdit> {
        self.state().drafts.get(id).copied()
    }

    /// Every loaded record, in load order.
    #[must_use]
    pub fn records(&self) -> Vec<AccessRecord> {
        self.state().records.clone()
    }

    /// Visible success notice; expires [`NOTICE_DURATION`] after it was set.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        self.state().current_notice()
    }

    /// Everything needed to render the screen, taken under one lock.
    #[must_use]
    pub fn snapshot(&self) -> ScreenSnapshot {
        let mut state = self.state();
        let notice = state.current_notice();
        let selectable = state.selectable(&self.acting_admin);
        let rows = filter_records(&state.records, &state.query)
            .into_iter()
            .map(|record| {
                let draft = state
                    .drafts
                    .get(&record.id)
                    .copied()
                    .unwrap_or_else(|| DraftEdit::from(record));
                ScreenRow {
                    dirty: draft.is_dirty(record),
                    selected: state.selection.contains(&record.id),
                    is_self: record.id == self.acting_admin,
                    saving: state.saving.as_ref() == Some(&record.id),
                    record: record.clone(),
                    draft,
                }
            })
            .collect();

        ScreenSnapshot {
            phase: state.phase.clone(),
            query: state.query.clone(),
            rows,
            total: state.records.len(),
            selected_count: state.selection.len(),
            all_selected: !selectable.is_empty() && state.selection == selectable,
            busy: state.is_mutating(),
            deleting: state.deleting,
            notice,
        }
    }
}
