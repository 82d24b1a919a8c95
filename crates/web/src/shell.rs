//! Site-wide navigation shell.
//!
//! Built per request from the resolved [`AccessState`]: public sections are
//! always listed, the admin menu only holds entries the capabilities allow,
//! and the account area shows either the sign-in entry point or the user.

use amooora_core::{AccessState, Capabilities};
use serde::Serialize;

/// Public sections of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Places directory.
    Places,
    /// Events calendar.
    Events,
    /// Services directory.
    Services,
}

impl Section {
    /// Every section, in menu order.
    pub const ALL: [Self; 3] = [Self::Places, Self::Events, Self::Services];

    /// URL path segment.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::Events => "events",
            Self::Services => "services",
        }
    }

    /// Menu label.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Places => "Places",
            Self::Events => "Events",
            Self::Services => "Services",
        }
    }

    /// Short description shown on the section page.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Places => "Welcoming bars, cafés and venues recommended by the community.",
            Self::Events => "Parties, meetups and gatherings coming up.",
            Self::Services => "Professionals and services that support the community.",
        }
    }

    /// Parse a URL path segment.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.slug() == slug)
    }

    /// Whether `caps` allow managing this section.
    #[must_use]
    pub const fn can_manage(self, caps: &Capabilities) -> bool {
        match self {
            Self::Places => caps.can_manage_places,
            Self::Events => caps.can_manage_events,
            Self::Services => caps.can_manage_services,
        }
    }
}

/// A navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    /// Link text.
    pub label: String,
    /// Link target.
    pub href: String,
    /// Whether the link points at the current page.
    pub active: bool,
}

impl NavItem {
    fn new(label: impl Into<String>, href: String, current_path: &str) -> Self {
        let active = if href == "/" {
            current_path == "/"
        } else {
            current_path == href || current_path.starts_with(&format!("{href}/"))
        };
        Self {
            label: label.into(),
            href,
            active,
        }
    }
}

/// The signed-in user as shown in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Display label (email or ID).
    pub label: String,
    /// Role label.
    pub role: String,
    /// Whether the account is active.
    pub active: bool,
    /// Role wire value, compared against the access stream.
    pub role_key: String,
    /// Status wire value, compared against the access stream.
    pub status_key: String,
}

/// Header navigation for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavShell {
    /// Public links.
    pub items: Vec<NavItem>,
    /// Admin links allowed by the capabilities; empty hides the admin menu.
    pub admin_items: Vec<NavItem>,
    /// Signed-in user, or `None` to show the sign-in entry point.
    pub account: Option<Account>,
    /// Why the access record could not be read, when it could not.
    pub access_error: Option<String>,
    /// Current path, used as the post-sign-in destination.
    pub current_path: String,
}

impl NavShell {
    /// Build the shell for `access` on the page at `current_path`.
    #[must_use]
    pub fn build(access: &AccessState, current_path: &str) -> Self {
        let caps = access.capabilities();

        let mut items = vec![NavItem::new("Home", "/".to_string(), current_path)];
        items.extend(
            Section::ALL
                .into_iter()
                .map(|s| NavItem::new(s.title(), format!("/{}", s.slug()), current_path)),
        );

        let mut admin_items = Vec::new();
        if caps.is_any_admin {
            if caps.is_admin_general {
                admin_items.push(NavItem::new(
                    "Users",
                    "/admin/users".to_string(),
                    current_path,
                ));
            }
            admin_items.extend(Section::ALL.into_iter().filter(|s| s.can_manage(&caps)).map(
                |s| NavItem::new(s.title(), format!("/admin/{}", s.slug()), current_path),
            ));
        }

        let account = access.user_id.as_ref().map(|id| Account {
            label: access.email.clone().unwrap_or_else(|| id.to_string()),
            role: access
                .role
                .map(|r| r.label().to_string())
                .unwrap_or_default(),
            active: caps.is_active,
            role_key: access.role.map(|r| r.as_str().to_string()).unwrap_or_default(),
            status_key: access
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        });

        Self {
            items,
            admin_items,
            account,
            access_error: access.error.clone(),
            current_path: current_path.to_string(),
        }
    }

    /// Whether the admin menu is shown.
    #[must_use]
    pub fn has_admin_menu(&self) -> bool {
        !self.admin_items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use amooora_core::{AccessRecord, AccessStatus, Role, UserId};

    use super::*;

    fn state(role: Role, status: AccessStatus) -> AccessState {
        let record = AccessRecord::new("u-1", role, status);
        AccessState::from_record(Some("ana@example.com".to_string()), &record)
    }

    fn hrefs(items: &[NavItem]) -> Vec<&str> {
        items.iter().map(|i| i.href.as_str()).collect()
    }

    #[test]
    fn test_anonymous_has_no_account_or_admin_menu() {
        let shell = NavShell::build(&AccessState::anonymous(), "/");
        assert!(shell.account.is_none());
        assert!(!shell.has_admin_menu());
        assert_eq!(
            hrefs(&shell.items),
            vec!["/", "/places", "/events", "/services"]
        );
        assert!(shell.items.first().unwrap().active);
    }

    #[test]
    fn test_general_admin_sees_everything() {
        let shell = NavShell::build(&state(Role::AdminGeneral, AccessStatus::Active), "/admin/users");
        assert_eq!(
            hrefs(&shell.admin_items),
            vec!["/admin/users", "/admin/places", "/admin/events", "/admin/services"]
        );
        assert!(shell.admin_items.first().unwrap().active);
    }

    #[test]
    fn test_domain_admin_sees_own_section_only() {
        let shell = NavShell::build(&state(Role::AdminEvents, AccessStatus::Active), "/events");
        assert_eq!(hrefs(&shell.admin_items), vec!["/admin/events"]);
        assert!(shell.items.iter().any(|i| i.href == "/events" && i.active));
    }

    #[test]
    fn test_blocked_admin_has_no_admin_menu() {
        let shell = NavShell::build(&state(Role::AdminGeneral, AccessStatus::Blocked), "/");
        assert!(!shell.has_admin_menu());
        assert!(!shell.account.unwrap().active);
    }

    #[test]
    fn test_degraded_state_shows_error() {
        let access = AccessState::degraded(UserId::from("u-9"), None, "record missing");
        let shell = NavShell::build(&access, "/");
        assert_eq!(shell.account.as_ref().unwrap().label, "u-9");
        assert_eq!(shell.access_error.as_deref(), Some("record missing"));
        assert!(!shell.has_admin_menu());
    }

    #[test]
    fn test_section_slugs_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_slug(section.slug()), Some(section));
        }
        assert_eq!(Section::from_slug("users"), None);
    }
}
