//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] vendora_core::EmailError),

    /// Missing or blank required field.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Current password did not match on a password change.
    #[error("current password is incorrect")]
    WrongPassword,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account was created through social sign-in and has no password.
    #[error("this account signs in with Google and has no password")]
    NoPassword,

    /// The dependent profile could not be created; the user was removed again.
    #[error("failed to create account profile")]
    ProfileCreation(#[source] RepositoryError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
