//! Google OAuth 2.0 client.
//!
//! # OAuth Flow
//!
//! 1. Generate an authorization URL with `authorization_url()`
//! 2. Redirect the browser to Google's consent page
//! 3. Google redirects back with an authorization code
//! 4. Exchange the code for an access token with `exchange_code()`
//! 5. Read the signed-in identity with `fetch_profile()`

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::GoogleOAuthConfig;
use crate::services::auth::SocialProfile;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

/// Errors from the OAuth handshake.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Google sign-in is not configured on this server.
    #[error("google sign-in is not configured")]
    NotConfigured,

    /// The provider rejected a request.
    #[error("oauth provider error: {0}")]
    Provider(String),

    /// The callback did not match the login that started it.
    #[error("invalid oauth state")]
    StateMismatch,

    /// The provider account has no verified email.
    #[error("google account email is not verified")]
    UnverifiedEmail,

    /// Transport failure talking to the provider.
    #[error("oauth request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl UserInfo {
    fn into_profile(self) -> Result<SocialProfile, OAuthError> {
        if !self.email_verified {
            return Err(OAuthError::UnverifiedEmail);
        }
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or_default().to_string());
        Ok(SocialProfile {
            email: self.email,
            name,
            avatar_url: self.picture,
        })
    }
}

struct Inner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
}

/// Client for Google's OAuth endpoints.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GoogleOAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthClient")
            .field("client_id", &self.inner.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GoogleOAuthClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &GoogleOAuthConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: reqwest::Client::new(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        }
    }

    /// Build the consent page URL.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=online&prompt=select_account",
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Provider` if Google rejects the code.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.inner.client.post(TOKEN_URL).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider(format!("token exchange failed: {text}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Read the identity behind an access token.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::UnverifiedEmail` if Google has not verified the
    /// account email.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<SocialProfile, OAuthError> {
        let response = self
            .inner
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider(format!("userinfo failed: {text}")));
        }

        let info: UserInfo = response.json().await?;
        info.into_profile()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuthClient {
        GoogleOAuthClient::new(&GoogleOAuthConfig {
            client_id: "client id".to_string(),
            client_secret: SecretString::from("s3cr3t"),
        })
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let url = client().authorization_url("https://shop.test/api/auth/google/callback", "abc");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fshop.test%2Fapi%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_unverified_email_rejected() {
        let info: UserInfo =
            serde_json::from_str(r#"{"email":"a@b.co","email_verified":false}"#).unwrap();
        assert!(matches!(info.into_profile(), Err(OAuthError::UnverifiedEmail)));
    }

    #[test]
    fn test_missing_name_falls_back_to_local_part() {
        let info: UserInfo = serde_json::from_str(
            r#"{"email":"jane@b.co","email_verified":true,"picture":"https://img/x.png"}"#,
        )
        .unwrap();
        let profile = info.into_profile().unwrap();
        assert_eq!(profile.name, "jane");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://img/x.png"));
    }
}
