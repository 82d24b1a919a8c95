//! Stateful admin screens.
//!
//! Screens keep per-session state (drafts, selection, notices) between
//! requests; the [`ScreenRegistry`] owns them.

pub mod admin_users;
pub mod registry;

pub use admin_users::{
    AdminUsersScreen, DeleteConfirmation, DraftEdit, DraftField, NOTICE_DURATION, SaveOutcome,
    ScreenError, ScreenPhase, ScreenRow, ScreenSnapshot,
};
pub use registry::ScreenRegistry;
