//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body of the form `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ServiceError;
use crate::services::auth::AuthError;
use crate::services::oauth::OAuthError;
use crate::services::tokens::TokenError;
use crate::services::uploads::UploadError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Marketplace operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session token could not be issued or verified.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Google sign-in failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Server-side session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Service(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::RolledBack(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::Repository(err) => repository_status(err),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::Validation(_)
                | AuthError::WrongPassword
                | AuthError::NoPassword => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::ProfileCreation(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(err) => match err {
                TokenError::Invalid(_) => StatusCode::UNAUTHORIZED,
                TokenError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(err) => match err {
                UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::UnsupportedType | UploadError::MissingFile => StatusCode::BAD_REQUEST,
                UploadError::Upstream(_) | UploadError::Http(_) => StatusCode::BAD_GATEWAY,
                UploadError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::OAuth(err) => match err {
                OAuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                OAuthError::StateMismatch | OAuthError::UnverifiedEmail => StatusCode::BAD_REQUEST,
                OAuthError::Provider(_) | OAuthError::Http(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        let status = self.status();
        if status.is_server_error() {
            return match self {
                Self::Upload(UploadError::NotConfigured) | Self::OAuth(OAuthError::NotConfigured) => {
                    self.inner_message()
                }
                Self::Upload(_) | Self::OAuth(_) => "External service error".to_string(),
                Self::Service(ServiceError::RolledBack(msg)) => (*msg).to_string(),
                Self::Auth(AuthError::ProfileCreation(_)) => "Failed to create account".to_string(),
                _ => "Internal server error".to_string(),
            };
        }
        if status == StatusCode::CONFLICT
            && matches!(
                self,
                Self::Database(RepositoryError::Stale)
                    | Self::Service(ServiceError::Repository(RepositoryError::Stale))
                    | Self::Auth(AuthError::Repository(RepositoryError::Stale))
            )
        {
            return "The resource was modified concurrently, please retry".to_string();
        }
        self.inner_message()
    }

    /// The wrapped error's own message, without the variant prefix.
    fn inner_message(&self) -> String {
        match self {
            Self::Database(err) => err.to_string(),
            Self::Service(err) => err.to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Token(_) => "Invalid or expired session".to_string(),
            Self::Upload(err) => err.to_string(),
            Self::OAuth(err) => err.to_string(),
            Self::Session(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) | RepositoryError::Stale => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = self.public_message();

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ValidationError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(
            get_status(ServiceError::NotFound("product").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ServiceError::Forbidden("not yours").into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ServiceError::Validation(ValidationError("bad".to_string())).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ServiceError::Repository(RepositoryError::Stale).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ServiceError::RolledBack("onboarding failed").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::WeakPassword("too short".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::ProfileCreation(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upload_and_oauth_status_codes() {
        assert_eq!(
            get_status(UploadError::TooLarge.into()),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(UploadError::Upstream("nope".to_string()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(OAuthError::StateMismatch.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OAuthError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad row".to_string()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Auth(AuthError::ProfileCreation(RepositoryError::NotFound));
        assert_eq!(err.public_message(), "Failed to create account");
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::Service(ServiceError::NotFound("order"));
        assert_eq!(err.public_message(), "order not found");

        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.public_message(), "invalid email or password");
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = AppError::NotFound("customer not found".to_string()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "customer not found" }));
    }
}
