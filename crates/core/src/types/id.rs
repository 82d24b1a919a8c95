//! Opaque user identifier.

use serde::{Deserialize, Serialize};

/// Stable identifier of a user account.
///
/// Assigned by the backend's identity service at account creation. The value
/// is opaque: it is compared, displayed and sent back, never parsed.
///
/// # Example
///
/// ```rust
/// # use amooora_core::UserId;
/// let id = UserId::new("9b2c1e4a-0d7f-4b8e-a1c2-3d4e5f607182");
/// assert_eq!(id.as_str(), "9b2c1e4a-0d7f-4b8e-a1c2-3d4e5f607182");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl ::core::fmt::Display for UserId {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_string() {
        let id = UserId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let parsed: UserId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![UserId::from("c"), UserId::from("a"), UserId::from("b")];
        ids.sort();
        assert_eq!(ids, vec![UserId::from("a"), UserId::from("b"), UserId::from("c")]);
    }
}
