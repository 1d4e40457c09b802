//! User identity record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendora_core::{Email, Role, UserId};

/// A marketplace account (domain type).
///
/// Role-specific data lives in the matching [`Customer`](super::Customer) or
/// [`Seller`](super::Seller) profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email (unique, normalized).
    pub email: Email,
    /// Argon2 PHC hash. `None` for accounts created through social sign-in.
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// Which profile the user owns.
    pub role: Role,
    /// Hosted avatar image.
    pub avatar_url: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter.
    #[serde(skip)]
    pub version: i64,
}

impl User {
    /// Build a new, unsaved user.
    #[must_use]
    pub fn new(
        name: String,
        email: Email,
        password_hash: Option<String>,
        role: Role,
        avatar_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            email,
            password_hash,
            role,
            avatar_url,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the user can sign in with a password.
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}
