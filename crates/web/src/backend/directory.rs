//! Access directory procedures on the backend.
//!
//! # Procedures
//!
//! | Operation            | Endpoint                              | Arguments                         |
//! |----------------------|---------------------------------------|-----------------------------------|
//! | `list_profiles`      | `POST rpc/list_profiles`              | -                                 |
//! | `get_profile`        | `GET profiles?id=eq.<id>`             | -                                 |
//! | `set_profile_access` | `POST rpc/set_profile_access`         | `target_id, new_role, new_status` |
//! | `delete_users`       | `POST rpc/delete_users`               | `user_ids`                        |
//! | `delete_user_single` | `POST rpc/delete_user`                | `target_id`                       |

use amooora_core::{AccessDirectory, AccessRecord, AccessStatus, DirectoryError, Role, UserId};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::json;

use super::{BackendClient, BackendError};

/// Access directory client acting as one caller.
///
/// The bearer is either a signed-in user's access token (row-level policies
/// apply to that user) or the client's own key.
#[derive(Clone)]
pub struct BackendDirectory {
    client: BackendClient,
    bearer: SecretString,
}

#[derive(Serialize)]
struct SetAccessArgs<'a> {
    target_id: &'a UserId,
    new_role: Role,
    new_status: AccessStatus,
}

impl BackendClient {
    /// Directory client acting as the holder of `access_token`.
    ///
    /// Without a token, calls are made with the client's own key.
    #[must_use]
    pub fn directory(&self, access_token: Option<SecretString>) -> BackendDirectory {
        BackendDirectory {
            bearer: access_token.unwrap_or_else(|| self.api_key().clone()),
            client: self.clone(),
        }
    }
}

impl AccessDirectory for BackendDirectory {
    async fn list_profiles(&self) -> Result<Vec<AccessRecord>, DirectoryError> {
        Ok(self
            .client
            .rpc(&self.bearer, "list_profiles", &json!({}))
            .await?)
    }

    async fn get_profile(&self, id: &UserId) -> Result<AccessRecord, DirectoryError> {
        self.client
            .select_one(&self.bearer, "profiles", &[("id", id.as_str())])
            .await
            .map_err(|e| match e {
                BackendError::NotFound => DirectoryError::NotFound(id.clone()),
                other => other.into(),
            })
    }

    async fn set_profile_access(
        &self,
        id: &UserId,
        role: Role,
        status: AccessStatus,
    ) -> Result<(), DirectoryError> {
        let args = SetAccessArgs {
            target_id: id,
            new_role: role,
            new_status: status,
        };
        Ok(self
            .client
            .rpc_void(&self.bearer, "set_profile_access", &args)
            .await?)
    }

    async fn delete_users(&self, ids: &[UserId]) -> Result<(), DirectoryError> {
        Ok(self
            .client
            .rpc_void(&self.bearer, "delete_users", &json!({ "user_ids": ids }))
            .await?)
    }

    async fn delete_user_single(&self, id: &UserId) -> Result<(), DirectoryError> {
        Ok(self
            .client
            .rpc_void(&self.bearer, "delete_user", &json!({ "target_id": id }))
            .await?)
    }
}
