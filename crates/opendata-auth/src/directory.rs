//! Account directory and subscription tiers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AuthError;

/// Subscription tier attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
}

impl Tier {
    /// Parses the tier names used in configuration.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }
}

/// A provisioned account.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Stable account identifier derived from the username.
    pub user_id: Uuid,
    /// The account username.
    pub username: String,
    /// The account's subscription tier.
    pub tier: Tier,
    password_hash: String,
}

/// In-memory username-to-account map.
///
/// Accounts are provisioned from configuration at startup; there is no
/// signup path.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, UserRecord>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Adds an account, deriving a stable user id from the username.
    pub fn insert(&mut self, username: &str, password: &str, tier: Tier) {
        self.users.insert(
            username.to_string(),
            UserRecord {
                user_id: user_id_for(username),
                username: username.to_string(),
                tier,
                password_hash: hash_password(password),
            },
        );
    }

    /// Checks a username/password pair and returns the account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown usernames and
    /// wrong passwords alike.
    pub fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRecord, AuthError> {
        let user = self
            .users
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;
        if user.password_hash != hash_password(password) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user.clone())
    }

    /// Number of provisioned accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Derives a stable account identifier from a username.
///
/// SHA-256 of the username truncated to 16 bytes, with the RFC 4122
/// version and variant bits set. Unknown usernames in failed logins map
/// to the same stream as the real account would.
#[must_use]
pub fn user_id_for(username: &str) -> Uuid {
    let digest = Sha256::digest(username.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}
