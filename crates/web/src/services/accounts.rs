//! Account deletion with the one-at-a-time fallback.
//!
//! Accounts are deleted in one batch call. When the backend has no batch
//! procedure, each account is deleted with its own call, in order, stopping at
//! the first failure. Deletes are immediate and not transactional across
//! calls: accounts removed before a failure stay removed.

use amooora_core::{AccessDirectory, DirectoryError, UserId};
use thiserror::Error;
use tracing::instrument;

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Deleted accounts, in deletion order.
    pub deleted: Vec<UserId>,
    /// Whether the one-at-a-time fallback was used.
    pub sequential: bool,
}

/// Errors deleting accounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    /// The batch call failed; nothing was deleted.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The fallback stopped at `failed`; `deleted` were already removed.
    #[error("failed to delete user {failed}: {message}")]
    Partial {
        /// Account whose deletion failed.
        failed: UserId,
        /// Accounts deleted before the failure.
        deleted: Vec<UserId>,
        /// Backend message for the failure.
        message: String,
    },
}

/// Delete `ids`, falling back to single deletes if batch deletion is unavailable.
///
/// # Errors
///
/// Returns `DeleteError::Directory` if the batch call fails for any reason
/// other than the procedure being missing, and `DeleteError::Partial` if a
/// single delete fails during the fallback.
#[instrument(skip(directory, ids), fields(count = ids.len()))]
pub async fn delete_accounts<D: AccessDirectory>(
    directory: &D,
    ids: &[UserId],
) -> Result<DeleteReport, DeleteError> {
    match directory.delete_users(ids).await {
        Ok(()) => {
            return Ok(DeleteReport {
                deleted: ids.to_vec(),
                sequential: false,
            });
        }
        Err(e) if e.is_function_unavailable() => {
            tracing::info!(error = %e, "Batch delete unavailable; deleting one at a time");
        }
        Err(e) => return Err(e.into()),
    }

    let mut deleted = Vec::with_capacity(ids.len());
    for id in ids {
        if let Err(e) = directory.delete_user_single(id).await {
            tracing::warn!(
                user_id = %id,
                deleted = deleted.len(),
                error = %e,
                "Sequential delete stopped"
            );
            return Err(DeleteError::Partial {
                failed: id.clone(),
                deleted,
                message: e.to_string(),
            });
        }
        deleted.push(id.clone());
    }

    Ok(DeleteReport {
        deleted,
        sequential: true,
    })
}
