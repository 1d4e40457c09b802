//! Account and session route handlers.
//!
//! Sign-in responses carry the token in the body and in an HttpOnly cookie,
//! so both API clients and browsers can use it.

use axum::{
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::extract::{Json, Query};
use crate::middleware::{OAUTH_STATE_KEY, RequireAuth, cleared_token_cookie, token_cookie};
use crate::models::{SessionClaims, User, optional_text};
use crate::services::auth::{AuthService, Registration};
use crate::services::oauth::OAuthError;
use crate::state::AppState;

/// Length of the OAuth `state` value.
const OAUTH_STATE_LENGTH: usize = 32;

/// A user without credentials.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// A user and a freshly issued session token.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Password change form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
}

/// Avatar change. A missing or blank URL clears the avatar.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarForm {
    pub avatar_url: Option<String>,
}

/// Query parameters from the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Attach the token cookie to a response.
pub(crate) fn with_token_cookie(mut response: Response, state: &AppState, token: &str) -> Response {
    if let Some(cookie) = token_cookie(state, token) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Issue a token for `user` and build a `{user, token}` response with the cookie set.
fn session_response(state: &AppState, user: User) -> Result<Response> {
    let token = state.tokens().issue(&user)?;
    let response = Json(SessionResponse {
        user,
        token: token.clone(),
    })
    .into_response();
    Ok(with_token_cookie(response, state, &token))
}

/// Register a new account.
///
/// # Route
///
/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = AuthService::new(state.db()).register(form).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Sign in with email and password.
///
/// # Route
///
/// `POST /api/auth/login`
pub async fn login(State(state): State<AppState>, Json(form): Json<LoginForm>) -> Result<Response> {
    let user = AuthService::new(state.db())
        .login(&form.email, &form.password)
        .await?;
    session_response(&state, user)
}

/// Sign out by clearing the token cookie.
///
/// # Route
///
/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>) -> Response {
    clear_sentry_user();
    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Some(cookie) = cleared_token_cookie(&state) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Current session claims.
///
/// # Route
///
/// `GET /api/auth/session`
pub async fn session(RequireAuth(claims): RequireAuth) -> Json<SessionClaims> {
    Json(claims)
}

/// Change the caller's password.
///
/// # Route
///
/// `POST /api/auth/change-password`
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(form): Json<ChangePasswordForm>,
) -> Result<StatusCode> {
    AuthService::new(state.db())
        .change_password(claims.sub, &form.current_password, &form.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's avatar and reissue the token so it carries the new URL.
///
/// # Route
///
/// `PATCH /api/auth/avatar`
pub async fn update_avatar(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(form): Json<AvatarForm>,
) -> Result<Response> {
    let avatar = optional_text(form.avatar_url.as_deref());
    if let Some(url) = &avatar {
        url::Url::parse(url).map_err(|_| AppError::BadRequest("avatarUrl must be a URL".to_string()))?;
    }
    let user = AuthService::new(state.db())
        .update_avatar(claims.sub, avatar)
        .await?;
    session_response(&state, user)
}

/// Generate an OAuth `state` value.
fn generate_oauth_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(OAUTH_STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Start Google sign-in.
///
/// Stores a random `state` in the server session and redirects to Google.
///
/// # Route
///
/// `GET /api/auth/google/login`
pub async fn google_login(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let google = state.google()?;

    let oauth_state = generate_oauth_state();
    session.insert(OAUTH_STATE_KEY, &oauth_state).await?;

    let redirect_uri = state.config().google_redirect_uri();
    Ok(Redirect::to(&google.authorization_url(&redirect_uri, &oauth_state)))
}

/// Finish Google sign-in.
///
/// Validates `state`, exchanges the code, signs the user in (creating the
/// account on first use) and redirects home with the token cookie set.
///
/// # Route
///
/// `GET /api/auth/google/callback`
pub async fn google_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let google = state.google()?;

    if let Some(error) = query.error {
        tracing::warn!(%error, "google sign-in declined");
        return Err(AppError::BadRequest(format!("google sign-in failed: {error}")));
    }

    let expected: Option<String> = session.remove(OAUTH_STATE_KEY).await?;
    match (expected, query.state) {
        (Some(expected), Some(got)) if expected == got => {}
        _ => return Err(OAuthError::StateMismatch.into()),
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let redirect_uri = state.config().google_redirect_uri();
    let access_token = google.exchange_code(&code, &redirect_uri).await?;
    let profile = google.fetch_profile(&access_token).await?;

    let user = AuthService::new(state.db()).social_sign_in(profile).await?;
    let token = state.tokens().issue(&user)?;
    tracing::info!(user_id = %user.id, "google sign-in completed");

    Ok(with_token_cookie(
        Redirect::to("/").into_response(),
        &state,
        &token,
    ))
}
