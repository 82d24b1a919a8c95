//! Integration tests for Amooora.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p amooora-integration-tests
//! ```
//!
//! No backend is needed: the access directory and the session oracle are
//! replaced by the in-memory fakes below.
//!
//! # Test Categories
//!
//! - `users_screen` - Admin user management screen
//! - `access_query` - Access resolution and session changes
//! - `router` - HTTP routes without a signed-in session

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amooora_core::{AccessDirectory, AccessRecord, AccessStatus, DirectoryError, Role, UserId};
use amooora_web::backend::BackendError;
use amooora_web::session::{
    AuthError, SessionEvent, SessionHub, SessionOracle, SessionSubscription, SessionUser,
};
use tokio::sync::Notify;

/// A call received by [`InMemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    ListProfiles,
    GetProfile(UserId),
    SetProfileAccess(UserId, Role, AccessStatus),
    DeleteUsers(Vec<UserId>),
    DeleteUserSingle(UserId),
}

#[derive(Debug, Default)]
struct DirectoryState {
    records: Vec<AccessRecord>,
    calls: Vec<DirectoryCall>,
    batch_unavailable: bool,
    failing_deletes: HashSet<UserId>,
    list_failure: Option<String>,
    get_failure: Option<String>,
    set_failure: Option<String>,
    write_gate: Option<Arc<Notify>>,
    read_gate: Option<Arc<Notify>>,
}

/// Access directory backed by a vector, with a call log and failure knobs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    /// Directory holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<AccessRecord>) -> Self {
        let directory = Self::default();
        directory.state().records = records;
        directory
    }

    /// The records `a` (viewer, active), `b` (general admin, active) and
    /// `c` (viewer, blocked).
    #[must_use]
    pub fn three_records() -> Self {
        Self::with_records(vec![
            AccessRecord::new("a", Role::Viewer, AccessStatus::Active).with_email("ana@example.com"),
            AccessRecord::new("b", Role::AdminGeneral, AccessStatus::Active)
                .with_email("bea@example.com"),
            AccessRecord::new("c", Role::Viewer, AccessStatus::Blocked)
                .with_email("caio@example.com"),
        ])
    }

    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, call: DirectoryCall) {
        self.state().calls.push(call);
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.state().calls.clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Ids of the stored records.
    #[must_use]
    pub fn ids(&self) -> Vec<UserId> {
        self.state().records.iter().map(|r| r.id.clone()).collect()
    }

    /// Stored record of `id`.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<AccessRecord> {
        self.state()
            .records
            .iter()
            .find(|r| r.id.as_str() == id)
            .cloned()
    }

    /// Make the batch delete procedure missing.
    pub fn make_batch_unavailable(&self) {
        self.state().batch_unavailable = true;
    }

    /// Make single deletes of `id` fail.
    pub fn fail_delete_of(&self, id: &str) {
        self.state().failing_deletes.insert(UserId::from(id));
    }

    /// Make listing fail with `message`, or succeed again with `None`.
    pub fn fail_list(&self, message: Option<&str>) {
        self.state().list_failure = message.map(str::to_owned);
    }

    /// Make single-record lookups fail with `message`.
    pub fn fail_get(&self, message: Option<&str>) {
        self.state().get_failure = message.map(str::to_owned);
    }

    /// Make access updates fail with `message`.
    pub fn fail_set(&self, message: Option<&str>) {
        self.state().set_failure = message.map(str::to_owned);
    }

    /// Hold every access update and delete until the returned gate is
    /// notified.
    #[must_use]
    pub fn hold_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().write_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every listing until the returned gate is notified.
    #[must_use]
    pub fn hold_reads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().read_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Stop holding calls made from now on.
    pub fn release_holds(&self) {
        let mut state = self.state();
        state.write_gate = None;
        state.read_gate = None;
    }

    async fn pass_gate(&self, write: bool) {
        let gate = {
            let state = self.state();
            if write {
                state.write_gate.clone()
            } else {
                state.read_gate.clone()
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    /// Change a record behind the screen's back.
    pub fn set_role(&self, id: &str, role: Role) {
        if let Some(record) = self.state().records.iter_mut().find(|r| r.id.as_str() == id) {
            record.role = role;
        }
    }
}

impl AccessDirectory for InMemoryDirectory {
    async fn list_profiles(&self) -> Result<Vec<AccessRecord>, DirectoryError> {
        self.record_call(DirectoryCall::ListProfiles);
        self.pass_gate(false).await;
        let state = self.state();
        match &state.list_failure {
            Some(message) => Err(DirectoryError::Backend(message.clone())),
            None => Ok(state.records.clone()),
        }
    }

    async fn get_profile(&self, id: &UserId) -> Result<AccessRecord, DirectoryError> {
        self.record_call(DirectoryCall::GetProfile(id.clone()));
        let state = self.state();
        if let Some(message) = &state.get_failure {
            return Err(DirectoryError::Backend(message.clone()));
        }
        state
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }

    async fn set_profile_access(
        &self,
        id: &UserId,
        role: Role,
        status: AccessStatus,
    ) -> Result<(), DirectoryError> {
        self.record_call(DirectoryCall::SetProfileAccess(id.clone(), role, status));
        self.pass_gate(true).await;

        let mut state = self.state();
        if let Some(message) = &state.set_failure {
            return Err(DirectoryError::Backend(message.clone()));
        }
        let record = state
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        record.role = role;
        record.status = status;
        Ok(())
    }

    async fn delete_users(&self, ids: &[UserId]) -> Result<(), DirectoryError> {
        self.record_call(DirectoryCall::DeleteUsers(ids.to_vec()));
        self.pass_gate(true).await;
        let mut state = self.state();
        if state.batch_unavailable {
            return Err(DirectoryError::FunctionUnavailable(
                "delete_users".to_string(),
            ));
        }
        if let Some(id) = ids.iter().find(|id| state.failing_deletes.contains(*id)) {
            return Err(DirectoryError::Backend(format!("cannot delete {id}")));
        }
        state.records.retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn delete_user_single(&self, id: &UserId) -> Result<(), DirectoryError> {
        self.record_call(DirectoryCall::DeleteUserSingle(id.clone()));
        self.pass_gate(true).await;
        let mut state = self.state();
        if state.failing_deletes.contains(id) {
            return Err(DirectoryError::Backend(format!("cannot delete {id}")));
        }
        state.records.retain(|r| &r.id != id);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OracleState {
    session: String,
    user: Option<SessionUser>,
    failure: Option<String>,
}

/// Session oracle for one session key, driven by the test.
///
/// Sign-in and sign-out publish on the shared [`SessionHub`] like the real
/// handlers do.
#[derive(Debug, Clone)]
pub struct FakeSessionOracle {
    hub: SessionHub,
    state: Arc<Mutex<OracleState>>,
}

impl FakeSessionOracle {
    /// Signed-out oracle for `session`.
    #[must_use]
    pub fn new(hub: SessionHub, session: &str) -> Self {
        Self {
            hub,
            state: Arc::new(Mutex::new(OracleState {
                session: session.to_owned(),
                ..OracleState::default()
            })),
        }
    }

    /// Current session key.
    #[must_use]
    pub fn session(&self) -> String {
        self.state().session.clone()
    }

    fn state(&self) -> MutexGuard<'_, OracleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sign `id` in and announce it.
    pub fn sign_in(&self, id: &str, email: Option<&str>) {
        let session = {
            let mut state = self.state();
            state.user = Some(SessionUser {
                id: UserId::from(id),
                email: email.map(str::to_owned),
            });
            state.session.clone()
        };
        self.hub.publish(SessionEvent::SignedIn {
            session,
            previous: None,
        });
    }

    /// Sign `id` in under the new key `cycled`, the way the login handler
    /// cycles the session ID, and announce both keys.
    ///
    /// The oracle keeps its old key until a holder calls
    /// [`SessionOracle::rekey`].
    pub fn sign_in_cycled(&self, cycled: &str, id: &str) {
        let previous = {
            let mut state = self.state();
            state.user = Some(SessionUser {
                id: UserId::from(id),
                email: None,
            });
            state.session.clone()
        };
        self.hub.publish(SessionEvent::SignedIn {
            session: cycled.to_owned(),
            previous: Some(previous),
        });
    }

    /// Sign out and announce it.
    pub fn sign_out(&self) {
        let session = {
            let mut state = self.state();
            state.user = None;
            state.session.clone()
        };
        self.hub.publish(SessionEvent::SignedOut { session });
    }

    /// Announce a token refresh without changing the user.
    pub fn refresh(&self) {
        self.hub.publish(SessionEvent::TokenRefreshed {
            session: self.session(),
        });
    }

    /// Make identity lookups fail with `message`.
    pub fn fail_identity(&self, message: Option<&str>) {
        self.state().failure = message.map(str::to_owned);
    }
}

impl SessionOracle for FakeSessionOracle {
    async fn current_user(&self) -> Result<Option<SessionUser>, AuthError> {
        let state = self.state();
        match &state.failure {
            Some(message) => Err(AuthError::Backend(BackendError::Unauthorized(
                message.clone(),
            ))),
            None => Ok(state.user.clone()),
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.hub.subscribe(Some(&self.session()))
    }

    fn rekey(&self, session: &str) {
        session.clone_into(&mut self.state().session);
    }
}
