//! Authentication service.
//!
//! Password registration and sign-in, Google sign-in account linking, and
//! account changes that affect the session token (password, avatar, role).
//!
//! Creating an account writes the User and then its profile as two separate
//! documents. If the profile write fails the User is deleted again so no
//! account exists without a profile.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use vendora_core::{Email, Role, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{Customer, Seller, SellerContact, SellerSettings, User, required_text};
use crate::services::error::should_retry;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

/// Identity returned by a social login provider.
#[derive(Debug, Clone)]
pub struct SocialProfile {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Authentication service.
pub struct AuthService<'a> {
    db: &'a Database,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user and create the profile for its role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::ProfileCreation` if the profile could not be stored.
    pub async fn register(&self, form: Registration) -> Result<User, AuthError> {
        let name = required_text("name", &form.name)?;
        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;

        if self.db.users().find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(&form.password)?;
        let user = User::new(
            name,
            email,
            Some(password_hash),
            form.role.unwrap_or_default(),
            None,
        );
        self.create_account(user).await
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords fail identically.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .db
            .users()
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, hash)?;
        tracing::info!(user_id = %user.id, "user signed in");
        Ok(user)
    }

    // =========================================================================
    // Social Sign-in
    // =========================================================================

    /// Find or create the account for a social login.
    ///
    /// Existing accounts adopt the provider avatar if they have none. New
    /// accounts get no password and a customer profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the provider email is unusable.
    /// Returns `AuthError::ProfileCreation` if the new profile could not be stored.
    pub async fn social_sign_in(&self, profile: SocialProfile) -> Result<User, AuthError> {
        let email = Email::parse(&profile.email)?;

        if let Some(user) = self.db.users().find_by_email(&email).await? {
            if user.avatar_url.is_some() || profile.avatar_url.is_none() {
                return Ok(user);
            }
            let avatar = profile.avatar_url;
            return self
                .modify_user(user.id, |u| {
                    if u.avatar_url.is_none() {
                        u.avatar_url.clone_from(&avatar);
                    }
                })
                .await;
        }

        let name = required_text("name", &profile.name)
            .unwrap_or_else(|_| email.local_part().to_owned());
        let user = User::new(name, email, None, Role::Customer, profile.avatar_url);
        self.create_account(user).await
    }

    // =========================================================================
    // Account Changes
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.db
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoPassword` for social-only accounts.
    /// Returns `AuthError::WrongPassword` if `current` does not match.
    /// Returns `AuthError::WeakPassword` if `new` is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let user = self.get_user(user_id).await?;
        let hash = user.password_hash.as_deref().ok_or(AuthError::NoPassword)?;
        verify_password(current, hash).map_err(|_| AuthError::WrongPassword)?;
        validate_password(new)?;

        let new_hash = hash_password(new)?;
        self.modify_user(user_id, |u| u.password_hash = Some(new_hash.clone()))
            .await?;
        tracing::info!(%user_id, "password changed");
        Ok(())
    }

    /// Set or clear the avatar.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_avatar(
        &self,
        user_id: UserId,
        avatar_url: Option<String>,
    ) -> Result<User, AuthError> {
        self.modify_user(user_id, |u| u.avatar_url.clone_from(&avatar_url))
            .await
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank name.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn rename(&self, user_id: UserId, name: &str) -> Result<User, AuthError> {
        let name = required_text("name", name)?;
        self.modify_user(user_id, |u| u.name.clone_from(&name)).await
    }

    /// Change the user's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn set_role(&self, user_id: UserId, role: Role) -> Result<User, AuthError> {
        self.modify_user(user_id, |u| u.role = role).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Store a new user and its role profile, deleting the user again if the
    /// profile cannot be stored.
    async fn create_account(&self, user: User) -> Result<User, AuthError> {
        self.db.users().insert(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        if let Err(e) = self.create_profile(&user).await {
            tracing::error!(user_id = %user.id, error = %e, "profile creation failed, removing user");
            if let Err(cleanup) = self.db.users().delete(user.id).await {
                tracing::error!(user_id = %user.id, error = %cleanup, "failed to remove user after profile failure");
            }
            return Err(AuthError::ProfileCreation(e));
        }

        tracing::info!(user_id = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    async fn create_profile(&self, user: &User) -> Result<(), RepositoryError> {
        match user.role {
            Role::Customer => self.db.customers().insert(&Customer::new(user.id)).await,
            Role::Seller => {
                let form = SellerSettings {
                    store_name: Some(user.name.clone()),
                    contact: Some(SellerContact {
                        email: user.email.clone(),
                        phone: None,
                        website: None,
                    }),
                    ..SellerSettings::default()
                };
                let seller = Seller::onboard(user.id, form)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
                self.db.sellers().insert(&seller).await
            }
        }
    }

    async fn modify_user(
        &self,
        user_id: UserId,
        mut change: impl FnMut(&mut User) + Send,
    ) -> Result<User, AuthError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut user = self.get_user(user_id).await?;
            change(&mut user);
            match self.db.users().update(&mut user).await {
                Ok(()) => return Ok(user),
                Err(e) if should_retry(&e, attempt) => {}
                Err(RepositoryError::NotFound) => return Err(AuthError::UserNotFound),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(email: &str, role: Option<Role>) -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_creates_customer_profile() {
        let db = Database::memory();
        let user = AuthService::new(&db)
            .register(registration("ada@example.com", None))
            .await
            .unwrap();

        assert_eq!(user.role, Role::Customer);
        assert!(db.customers().find_by_user(user.id).await.unwrap().is_some());
        assert!(db.sellers().find_by_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_seller_gets_seller_profile() {
        let db = Database::memory();
        let user = AuthService::new(&db)
            .register(registration("shop@example.com", Some(Role::Seller)))
            .await
            .unwrap();

        let seller = db.sellers().find_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(seller.store_name, "Ada");
        assert_eq!(seller.contact.email.as_str(), "shop@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::memory();
        let auth = AuthService::new(&db);
        auth.register(registration("ada@example.com", None)).await.unwrap();

        let err = auth
            .register(registration("Ada@Example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let db = Database::memory();
        let auth = AuthService::new(&db);
        auth.register(registration("ada@example.com", None)).await.unwrap();

        let unknown = auth.login("nobody@example.com", "correct horse").await.unwrap_err();
        let wrong = auth.login("ada@example.com", "wrong horse").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(auth.login("ADA@example.com", "correct horse").await.is_ok());
    }

    #[tokio::test]
    async fn test_social_sign_in_creates_then_reuses() {
        let db = Database::memory();
        let auth = AuthService::new(&db);
        let profile = SocialProfile {
            email: "grace@example.com".to_string(),
            name: "Grace".to_string(),
            avatar_url: Some("https://lh3.example.com/g.png".to_string()),
        };

        let first = auth.social_sign_in(profile.clone()).await.unwrap();
        assert!(!first.has_password());
        assert!(db.customers().find_by_user(first.id).await.unwrap().is_some());

        let second = auth.social_sign_in(profile).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = Database::memory();
        let auth = AuthService::new(&db);
        let user = auth.register(registration("ada@example.com", None)).await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "nope nope", "new password").await,
            Err(AuthError::WrongPassword)
        ));
        auth.change_password(user.id, "correct horse", "new password")
            .await
            .unwrap();
        assert!(auth.login("ada@example.com", "new password").await.is_ok());
    }

    #[tokio::test]
    async fn test_social_account_cannot_change_password() {
        let db = Database::memory();
        let auth = AuthService::new(&db);
        let user = auth
            .social_sign_in(SocialProfile {
                email: "grace@example.com".to_string(),
                name: "Grace".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();

        assert!(matches!(
            auth.change_password(user.id, "anything", "new password").await,
            Err(AuthError::NoPassword)
        ));
    }
}
