//! The access directory contract.
//!
//! The access directory is the backend service that stores one
//! [`AccessRecord`] per user and runs the directory-management procedures.
//! Row-level authorization and cascading deletes happen inside it; callers
//! only see success or a [`DirectoryError`].

use std::future::Future;

use thiserror::Error;

use crate::types::{AccessRecord, AccessStatus, Role, UserId};

/// Errors reported by the access directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The requested procedure does not exist on the backend.
    ///
    /// Reported from a structured error code, never from message text.
    #[error("directory function unavailable: {0}")]
    FunctionUnavailable(String),

    /// No access record exists for the user.
    #[error("access record not found for user {0}")]
    NotFound(UserId),

    /// Any other failure, carrying the backend's message verbatim.
    #[error("{0}")]
    Backend(String),
}

impl DirectoryError {
    /// Whether the error means the requested procedure is missing.
    #[must_use]
    pub const fn is_function_unavailable(&self) -> bool {
        matches!(self, Self::FunctionUnavailable(_))
    }
}

/// Remote procedures offered by the access directory.
///
/// Every call is a single request: no retries, no pagination.
pub trait AccessDirectory: Send + Sync {
    /// Return every access record.
    fn list_profiles(&self) -> impl Future<Output = Result<Vec<AccessRecord>, DirectoryError>> + Send;

    /// Return one user's access record.
    fn get_profile(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<AccessRecord, DirectoryError>> + Send;

    /// Set one user's role and status in a single atomic call.
    fn set_profile_access(
        &self,
        id: &UserId,
        role: Role,
        status: AccessStatus,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Delete a batch of user accounts, cascading to their access records.
    ///
    /// Fails with [`DirectoryError::FunctionUnavailable`] when the backend has
    /// no batch procedure.
    fn delete_users(&self, ids: &[UserId])
    -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Delete one user account.
    fn delete_user_single(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}
