//! Signed session tokens.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::models::{SessionClaims, User};

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "vendora_token";

/// Token signing and verification errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token is malformed, expired, or its signature does not verify.
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Signing failed.
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// HS256 signer for [`SessionClaims`].
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenSigner {
    /// Create a signer from a shared secret and token lifetime.
    #[must_use]
    pub fn new(secret: &SecretString, ttl_hours: u32) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::from(ttl_hours) * 3600,
        }
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let claims = SessionClaims::for_user(user, Utc::now().timestamp(), self.ttl_secs);
        self.sign(&claims)
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for a bad signature, expired token, or
    /// malformed payload.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vendora_core::{Email, Role};

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(&SecretString::from(secret.to_owned()), 1)
    }

    fn user() -> User {
        User::new(
            "Ada".to_string(),
            Email::parse("ada@example.com").unwrap(),
            None,
            Role::Seller,
            Some("https://img.example.com/a.png".to_string()),
        )
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer("k3y-for-tests-only-8d1f0c2b9e7a4d6f");
        let user = user();
        let claims = signer.verify(&signer.issue(&user).unwrap()).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.avatar.as_deref(), Some("https://img.example.com/a.png"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = signer("k3y-for-tests-only-8d1f0c2b9e7a4d6f")
            .issue(&user())
            .unwrap();
        assert!(signer("another-k3y-for-tests-5c9a1e7b3d2f").verify(&token).is_err());
    }

    #[test]
    fn test_rejects_expired() {
        let signer = signer("k3y-for-tests-only-8d1f0c2b9e7a4d6f");
        let mut claims = SessionClaims::for_user(&user(), 1_000_000, 60);
        claims.exp = Utc::now().timestamp() - 10;
        let token = signer.sign(&claims).unwrap();
        assert!(signer.verify(&token).is_err());
    }
}
