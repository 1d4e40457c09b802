//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Database;
use crate::services::oauth::{GoogleOAuthClient, OAuthError};
use crate::services::tokens::TokenSigner;
use crate::services::uploads::{CloudinaryHost, DisabledImageHost, ImageHost};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, token signer and outbound clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Database,
    tokens: TokenSigner,
    google: Option<GoogleOAuthClient>,
    images: Arc<dyn ImageHost>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("db", &self.inner.db)
            .field("google", &self.inner.google)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state, building outbound clients from `config`.
    #[must_use]
    pub fn new(config: ApiConfig, db: Database) -> Self {
        let images: Arc<dyn ImageHost> = match &config.cloudinary {
            Some(cloudinary) => Arc::new(CloudinaryHost::new(cloudinary)),
            None => {
                tracing::warn!("CLOUDINARY_CLOUD_NAME not set, image uploads disabled");
                Arc::new(DisabledImageHost)
            }
        };
        Self::with_image_host(config, db, images)
    }

    /// Create a new application state with a specific image host.
    #[must_use]
    pub fn with_image_host(config: ApiConfig, db: Database, images: Arc<dyn ImageHost>) -> Self {
        let tokens = TokenSigner::new(&config.jwt_secret, config.token_ttl_hours);
        let google = config.google.as_ref().map(GoogleOAuthClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                tokens,
                google,
                images,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the document stores.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the session token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Get the Google OAuth client.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::NotConfigured` when Google sign-in is disabled.
    pub fn google(&self) -> Result<&GoogleOAuthClient, OAuthError> {
        self.inner.google.as_ref().ok_or(OAuthError::NotConfigured)
    }

    /// Get the image host.
    #[must_use]
    pub fn images(&self) -> &dyn ImageHost {
        self.inner.images.as_ref()
    }
}
