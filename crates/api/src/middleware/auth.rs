//! Authentication extractors and token cookie helpers.
//!
//! The session token is read from `Authorization: Bearer <token>` first, then
//! from the `vendora_token` cookie.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::error::{AppError, set_sentry_user};
use crate::models::SessionClaims;
use crate::services::tokens::TOKEN_COOKIE;
use crate::state::AppState;

/// Extractor that requires a valid session token.
///
/// Rejects with 401 when the token is missing, malformed or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.name)
/// }
/// ```
pub struct RequireAuth(pub SessionClaims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?;

        let claims = state.tokens().verify(&token)?;
        set_sentry_user(&claims.sub, Some(&claims.email));
        tracing::Span::current().record("user_id", tracing::field::display(&claims.sub));

        Ok(Self(claims))
    }
}

/// Extractor that optionally reads the session token.
///
/// Unlike `RequireAuth`, this does not reject the request when the token is
/// absent or invalid.
pub struct OptionalAuth(pub Option<SessionClaims>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = RequireAuth::from_request_parts(parts, state)
            .await
            .ok()
            .map(|RequireAuth(claims)| claims);
        Ok(Self(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a freshly issued token.
#[must_use]
pub fn token_cookie(state: &AppState, token: &str) -> Option<HeaderValue> {
    let cookie = Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config().base_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(state.tokens().ttl_secs()))
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// `Set-Cookie` value that removes the token cookie.
#[must_use]
pub fn cleared_token_cookie(state: &AppState) -> Option<HeaderValue> {
    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(state.config().base_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}
