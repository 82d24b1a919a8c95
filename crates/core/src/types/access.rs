//! Access records and the resolved access state of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capabilities::{Capabilities, capabilities};
use super::id::UserId;
use super::status::{AccessStatus, Role};

/// One user's role, status and profile fields, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// User the record belongs to.
    pub id: UserId,
    /// Email shown in listings.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name shown in listings.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Role held by the user.
    pub role: Role,
    /// Account status.
    pub status: AccessStatus,
    /// When the record was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AccessRecord {
    /// Create a record with no profile fields.
    #[must_use]
    pub fn new(id: impl Into<UserId>, role: Role, status: AccessStatus) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            role,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Whether email, display name or id contains `needle`.
    ///
    /// `needle` must already be lowercased; comparison lowercases the fields.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(needle);
        self.email.as_deref().is_some_and(contains)
            || self.display_name.as_deref().is_some_and(contains)
            || contains(self.id.as_str())
    }

    /// Best label for the user: display name, then email, then id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// Filter records by a case-insensitive substring over email, display name and id.
///
/// An empty query returns every record in its original order.
#[must_use]
pub fn filter_records<'a>(records: &'a [AccessRecord], query: &str) -> Vec<&'a AccessRecord> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records.iter().filter(|r| r.matches(&needle)).collect()
}

/// Access of the current session, as resolved from the session and the directory.
///
/// Capability flags are not stored; [`AccessState::capabilities`] derives them
/// from role and status every time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessState {
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
    /// Email of the signed-in user, when the identity service reports one.
    pub email: Option<String>,
    /// Role of the signed-in user.
    pub role: Option<Role>,
    /// Status of the signed-in user.
    pub status: Option<AccessStatus>,
    /// Why the access record could not be read, when it could not.
    pub error: Option<String>,
}

impl AccessState {
    /// State of a session with nobody signed in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// State built from the user's access record.
    #[must_use]
    pub fn from_record(email: Option<String>, record: &AccessRecord) -> Self {
        Self {
            user_id: Some(record.id.clone()),
            email: email.or_else(|| record.email.clone()),
            role: Some(record.role),
            status: Some(record.status),
            error: None,
        }
    }

    /// State of a signed-in user whose access record could not be read.
    ///
    /// The user is treated as an active viewer; the message is kept for display.
    #[must_use]
    pub fn degraded(user_id: UserId, email: Option<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            email,
            role: Some(Role::Viewer),
            status: Some(AccessStatus::Active),
            error: Some(message.into()),
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Capability flags for this state.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        capabilities(self.role, self.status, self.is_authenticated())
    }
}
