//! Capability flags derived from role and status.

use serde::{Deserialize, Serialize};

use super::status::{AccessStatus, Role};

/// What the current session may do.
///
/// Always produced by [`capabilities`]; never stored alongside the role and
/// status it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// A user is signed in.
    pub authenticated: bool,
    /// The user's status is `active`.
    pub is_active: bool,
    /// Active general admin.
    pub is_admin_general: bool,
    /// Active admin of any kind.
    pub is_any_admin: bool,
    /// May manage the places directory.
    pub can_manage_places: bool,
    /// May manage the events calendar.
    pub can_manage_events: bool,
    /// May manage the services directory.
    pub can_manage_services: bool,
}

/// Derive capability flags from a role, a status and whether a user is signed in.
///
/// # Example
///
/// ```rust
/// use amooora_core::{AccessStatus, Role, capabilities};
///
/// let caps = capabilities(Some(Role::AdminEvents), Some(AccessStatus::Active), true);
/// assert!(caps.is_any_admin);
/// assert!(caps.can_manage_events);
/// assert!(!caps.can_manage_places);
/// ```
#[must_use]
pub fn capabilities(
    role: Option<Role>,
    status: Option<AccessStatus>,
    authenticated: bool,
) -> Capabilities {
    let is_active = status == Some(AccessStatus::Active);
    let is_admin_general = authenticated && is_active && role == Some(Role::AdminGeneral);
    let is_any_admin = authenticated && is_active && role.is_some_and(Role::is_admin);
    let domain = |admin: Role| is_active && (is_admin_general || role == Some(admin));

    Capabilities {
        authenticated,
        is_active,
        is_admin_general,
        is_any_admin,
        can_manage_places: domain(Role::AdminPlaces),
        can_manage_events: domain(Role::AdminEvents),
        can_manage_services: domain(Role::AdminServices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_has_nothing() {
        assert_eq!(capabilities(None, None, false), Capabilities::default());
    }

    #[test]
    fn test_admin_general_can_manage_everything() {
        let caps = capabilities(Some(Role::AdminGeneral), Some(AccessStatus::Active), true);
        assert!(caps.is_admin_general);
        assert!(caps.is_any_admin);
        assert!(caps.can_manage_places);
        assert!(caps.can_manage_events);
        assert!(caps.can_manage_services);
    }

    #[test]
    fn test_domain_admin_only_manages_own_domain() {
        let caps = capabilities(Some(Role::AdminServices), Some(AccessStatus::Active), true);
        assert!(!caps.is_admin_general);
        assert!(caps.is_any_admin);
        assert!(caps.can_manage_services);
        assert!(!caps.can_manage_places);
        assert!(!caps.can_manage_events);
    }

    #[test]
    fn test_blocked_admin_loses_every_capability() {
        for status in [AccessStatus::Blocked, AccessStatus::Inactive] {
            let caps = capabilities(Some(Role::AdminGeneral), Some(status), true);
            assert!(caps.authenticated);
            assert!(!caps.is_active);
            assert!(!caps.is_admin_general);
            assert!(!caps.is_any_admin);
            assert!(!caps.can_manage_places);
            assert!(!caps.can_manage_events);
            assert!(!caps.can_manage_services);
        }
    }

    #[test]
    fn test_viewer_is_active_but_not_admin() {
        let caps = capabilities(Some(Role::Viewer), Some(AccessStatus::Active), true);
        assert!(caps.is_active);
        assert!(!caps.is_any_admin);
        assert!(!caps.can_manage_places);
    }

    #[test]
    fn test_admin_flags_require_authentication() {
        let caps = capabilities(Some(Role::AdminGeneral), Some(AccessStatus::Active), false);
        assert!(!caps.is_admin_general);
        assert!(!caps.is_any_admin);
    }
}
