//! Role and status enums for access records.

use serde::{Deserialize, Serialize};

/// Role held by a user account.
///
/// Serialized in kebab-case (`admin-general`), which is also the spelling the
/// backend procedures accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Ordinary member, no management rights.
    #[default]
    Viewer,
    /// Manages the places directory.
    AdminPlaces,
    /// Manages the events calendar.
    AdminEvents,
    /// Manages the services directory.
    AdminServices,
    /// Full access, including user management.
    AdminGeneral,
}

impl Role {
    /// Every role, in the order the role picker shows them.
    pub const ALL: [Self; 5] = [
        Self::Viewer,
        Self::AdminPlaces,
        Self::AdminEvents,
        Self::AdminServices,
        Self::AdminGeneral,
    ];

    /// Wire value of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::AdminPlaces => "admin-places",
            Self::AdminEvents => "admin-events",
            Self::AdminServices => "admin-services",
            Self::AdminGeneral => "admin-general",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::AdminPlaces => "Places admin",
            Self::AdminEvents => "Events admin",
            Self::AdminServices => "Services admin",
            Self::AdminGeneral => "General admin",
        }
    }

    /// Whether this is one of the admin roles.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("invalid role: {s}"))
    }
}

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// Account in good standing.
    #[default]
    Active,
    /// Account suspended by an admin.
    Blocked,
    /// Account dormant or not yet activated.
    Inactive,
}

impl AccessStatus {
    /// Every status, in the order the status picker shows them.
    pub const ALL: [Self; 3] = [Self::Active, Self::Blocked, Self::Inactive];

    /// Wire value of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Inactive => "inactive",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Blocked => "Blocked",
            Self::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid status: {s}"))
    }
}
