//! Business logic between routes and the store.
//!
//! - [`roster`] - Roster reads and credential-checked replacement
//! - [`feed`] - Health posts, likes, comments and feedback

pub mod feed;
pub mod roster;

use secrecy::{ExposeSecret, SecretString};

pub use feed::{DeleteOutcome, FeedError, FeedService};
pub use roster::{RosterError, RosterService};

/// The shared administrator credential.
#[derive(Debug, Clone)]
pub struct AdminPassword(SecretString);

impl AdminPassword {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    /// Whether `candidate` matches the configured password.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let expected = self.0.expose_secret();
        !expected.is_empty() && expected == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_password_verify() {
        let password = AdminPassword::new(SecretString::from("pg-admin"));
        assert!(password.verify("pg-admin"));
        assert!(!password.verify("PG-ADMIN"));
        assert!(!password.verify(""));
    }

    #[test]
    fn test_empty_admin_password_never_matches() {
        let password = AdminPassword::new(SecretString::from(""));
        assert!(!password.verify(""));
    }
}
