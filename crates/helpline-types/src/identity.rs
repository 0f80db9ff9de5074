//! Identity types for Helpline.

use serde::{Deserialize, Serialize};

/// Unique identifier for a user.
pub type UserId = String;

/// An authenticated principal, as yielded by the surrounding web server's
/// session layer. The core never authenticates anyone itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// The user's id.
    pub user_id: UserId,
    /// Name shown next to chat messages.
    pub display_name: String,
    /// Whether the user has admin rights.
    pub is_admin: bool,
}

impl Identity {
    /// Creates a regular (non-admin) identity.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            is_admin: false,
        }
    }

    /// Marks the identity as an admin.
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_creation() {
        let identity = Identity::new("u1", "Alice");
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.display_name, "Alice");
        assert!(!identity.is_admin);

        let admin = Identity::new("a1", "Root").with_admin(true);
        assert!(admin.is_admin);
    }
}
