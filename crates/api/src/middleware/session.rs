//! Session middleware configuration.
//!
//! Server-side sessions only hold the Google sign-in `state` between the
//! redirect and the callback. Deployments keep them in `PostgreSQL`; the
//! in-process store uses tower-sessions' memory store.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::ApiConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vendora_session";

/// Session key holding the pending OAuth `state` value.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Session expiry time in seconds (10 minutes, long enough for a sign-in round trip).
const SESSION_EXPIRY_SECONDS: i64 = 10 * 60;

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session store (`PostgresStore` or `MemoryStore`)
/// * `config` - API configuration (for the cookie `Secure` flag)
#[must_use]
pub fn create_session_layer<S>(store: S, config: &ApiConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
