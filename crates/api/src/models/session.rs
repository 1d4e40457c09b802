//! Identity carried by a signed session token.

use serde::{Deserialize, Serialize};

use vendora_core::{Role, UserId};

use super::User;

/// Claims embedded in every session token.
///
/// Handlers read the caller's identity from these claims without a store
/// lookup, so a token issued before a role or avatar change keeps the old
/// values until it is reissued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: UserId,
    pub role: Role,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `user`, valid from `iat` for `ttl_secs` seconds.
    #[must_use]
    pub fn for_user(user: &User, iat: i64, ttl_secs: i64) -> Self {
        Self {
            sub: user.id,
            role: user.role,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            avatar: user.avatar_url.clone(),
            iat,
            exp: iat + ttl_secs,
        }
    }

    /// Whether the caller holds the seller role.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role == Role::Seller
    }
}
