//! User access commands.
//!
//! These act with the service key, so row-level policies do not apply and
//! self-protection is the operator's responsibility.

use amooora_core::{AccessDirectory, AccessStatus, DirectoryError, Role, UserId, filter_records};
use amooora_web::backend::{BackendClient, BackendDirectory, BackendError};
use amooora_web::config::{BackendConfig, ConfigError};
use amooora_web::screens::{DeleteConfirmation, ScreenError};
use amooora_web::services::{DeleteError, delete_accounts};
use thiserror::Error;

/// Environment variable holding the service key.
const SERVICE_KEY_VAR: &str = "BACKEND_SERVICE_KEY";

/// Errors that can occur during user commands.
#[derive(Debug, Error)]
pub enum UsersError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend client could not be built.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A directory call failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Deleting failed, possibly after some accounts were removed.
    #[error(transparent)]
    Delete(#[from] DeleteError),

    /// Invalid role, status or account list.
    #[error("{0}")]
    InvalidArgument(String),

    /// Deletion was not confirmed.
    #[error("{0} Re-run with --yes to confirm.")]
    NotConfirmed(String),
}

fn directory() -> Result<BackendDirectory, UsersError> {
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env(SERVICE_KEY_VAR)?;
    let client = BackendClient::new(&config.url, config.api_key, config.timeout)?;
    tracing::debug!(url = %client.base_url(), "Using backend");
    Ok(client.directory(None))
}

/// List access records matching `query`.
///
/// # Errors
///
/// Returns an error if configuration is missing or the listing fails.
pub async fn list(query: Option<&str>) -> Result<usize, UsersError> {
    let records = directory()?.list_profiles().await?;
    let visible = filter_records(&records, query.unwrap_or_default());

    for record in &visible {
        tracing::info!(
            "{}  {:<32}  {:<16}  {}",
            record.id,
            record.label(),
            record.role.label(),
            record.status.label()
        );
    }
    tracing::info!("{} of {} users shown", visible.len(), records.len());

    Ok(visible.len())
}

/// Set one user's role and status.
///
/// # Errors
///
/// Returns an error if the role or status is invalid or the update fails.
pub async fn set_access(id: &str, role: &str, status: &str) -> Result<(), UsersError> {
    let role: Role = role.parse().map_err(UsersError::InvalidArgument)?;
    let status: AccessStatus = status.parse().map_err(UsersError::InvalidArgument)?;
    let id = UserId::from(id);

    directory()?.set_profile_access(&id, role, status).await?;

    tracing::info!("Access updated for {id}: {} ({})", role.label(), status.label());
    Ok(())
}

/// Delete the accounts in `ids`.
///
/// Without `confirmed`, only reports what would be deleted.
///
/// # Errors
///
/// Returns an error if deletion is unconfirmed or fails. A failure during
/// the one-at-a-time fallback names the account that failed; accounts
/// deleted before it stay deleted.
pub async fn delete(ids: &[String], confirmed: bool) -> Result<Vec<UserId>, UsersError> {
    let confirmation = DeleteConfirmation::new(
        ids.iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(UserId::from),
    );
    if confirmation.count() == 0 {
        return Err(UsersError::InvalidArgument(
            ScreenError::EmptySelection.to_string(),
        ));
    }
    if !confirmed {
        return Err(UsersError::NotConfirmed(confirmation.prompt()));
    }

    let ids: Vec<UserId> = confirmation.ids().iter().cloned().collect();
    let report = match delete_accounts(&directory()?, &ids).await {
        Ok(report) => report,
        Err(e) => {
            if let DeleteError::Partial { deleted, .. } = &e {
                for id in deleted {
                    tracing::warn!("Deleted before the failure: {id}");
                }
            }
            return Err(e.into());
        }
    };

    if report.sequential {
        tracing::info!("Batch delete unavailable; deleted one at a time");
    }
    tracing::info!("Deleted {} account(s)", report.deleted.len());
    Ok(report.deleted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let ids = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let err = delete(&ids, false).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Delete 2 accounts? This cannot be undone. Re-run with --yes to confirm."
        );
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_id_list() {
        let err = delete(&[], true).await.unwrap_err();
        assert_eq!(err.to_string(), "select at least one account to delete");

        let blank = vec![" ".to_string(), String::new()];
        let err = delete(&blank, true).await.unwrap_err();
        assert!(matches!(err, UsersError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_set_access_rejects_unknown_role() {
        let err = set_access("u-1", "owner", "active").await.unwrap_err();
        assert!(matches!(err, UsersError::InvalidArgument(_)));
    }
}
