//! Image uploads.
//!
//! Files are checked locally (size, declared type, leading bytes) before being
//! handed to an [`ImageHost`], which returns the public URL of the stored image.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted content types.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file exceeds the {} MiB limit", MAX_UPLOAD_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("unsupported file type (allowed: jpeg, png, webp, gif)")]
    UnsupportedType,

    #[error("a file field is required")]
    MissingFile,

    #[error("image host rejected the upload: {0}")]
    Upstream(String),

    #[error("image host request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image uploads are not configured")]
    NotConfigured,
}

/// A validated image ready to be stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Validate an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::TooLarge` past [`MAX_UPLOAD_BYTES`] and
    /// `UploadError::UnsupportedType` when the declared type is not allowed or
    /// the bytes do not look like that type.
    pub fn new(
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }

        let declared = content_type.unwrap_or_default().to_ascii_lowercase();
        let content_type = ALLOWED_CONTENT_TYPES
            .iter()
            .copied()
            .find(|allowed| *allowed == declared)
            .ok_or(UploadError::UnsupportedType)?;
        if sniff(&bytes) != Some(content_type) {
            return Err(UploadError::UnsupportedType);
        }

        Ok(Self {
            file_name: file_name.unwrap_or("upload").to_string(),
            content_type,
            bytes,
        })
    }
}

/// Detect an image type from its magic bytes.
fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
        Some("image/webp")
    } else {
        None
    }
}

/// Remote storage for uploaded images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store the image and return its public URL.
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError>;
}

/// Host used when no image storage is configured.
#[derive(Debug, Default)]
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _image: ImageUpload) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
}

struct Inner {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: Option<String>,
}

/// Cloudinary signed uploads.
#[derive(Clone)]
pub struct CloudinaryHost {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CloudinaryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryHost")
            .field("cloud_name", &self.inner.cloud_name)
            .field("api_key", &self.inner.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CloudinaryHost {
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: reqwest::Client::new(),
                cloud_name: config.cloud_name.clone(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                folder: config.folder.clone(),
            }),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.inner.cloud_name
        )
    }

    /// Sign the upload parameters: sorted `key=value` pairs joined by `&`,
    /// followed by the API secret, hashed with SHA-256.
    fn signature(&self, timestamp: i64) -> String {
        let mut payload = String::new();
        if let Some(folder) = &self.inner.folder {
            payload.push_str("folder=");
            payload.push_str(folder);
            payload.push('&');
        }
        payload.push_str("timestamp=");
        payload.push_str(&timestamp.to_string());
        payload.push_str(self.inner.api_secret.expose_secret());

        hex::encode(Sha256::digest(payload.as_bytes()))
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
        let timestamp = Utc::now().timestamp();
        let signature = self.signature(timestamp);

        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(image.content_type)?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.inner.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);
        if let Some(folder) = &self.inner.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .inner
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(body = %text, "image upload rejected");
            return Err(UploadError::Upstream(text));
        }

        let body: CloudinaryResponse = response.json().await?;
        Ok(body.secure_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_accepts_matching_type_and_bytes() {
        let image = ImageUpload::new(Some("a.png"), Some("image/png"), PNG.to_vec()).unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.file_name, "a.png");
    }

    #[test]
    fn test_rejects_mismatched_bytes() {
        let result = ImageUpload::new(Some("a.jpg"), Some("image/jpeg"), PNG.to_vec());
        assert!(matches!(result, Err(UploadError::UnsupportedType)));
    }

    #[test]
    fn test_rejects_other_types() {
        let result = ImageUpload::new(Some("a.pdf"), Some("application/pdf"), b"%PDF-1.7".to_vec());
        assert!(matches!(result, Err(UploadError::UnsupportedType)));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let mut bytes = PNG.to_vec();
        bytes.resize(MAX_UPLOAD_BYTES + 1, 0);
        let result = ImageUpload::new(None, Some("image/png"), bytes);
        assert!(matches!(result, Err(UploadError::TooLarge)));
    }

    #[test]
    fn test_empty_file_is_missing() {
        let result = ImageUpload::new(None, Some("image/png"), Vec::new());
        assert!(matches!(result, Err(UploadError::MissingFile)));
    }

    #[test]
    fn test_sniff_webp() {
        assert_eq!(sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff(b"RIFF\0\0\0\0WAVE"), None);
    }

    #[test]
    fn test_signature_covers_folder_and_timestamp() {
        let host = CloudinaryHost::new(&CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: SecretString::from("abc"),
            folder: Some("products".to_string()),
        });
        let expected = hex::encode(Sha256::digest(b"folder=products&timestamp=100abc"));
        assert_eq!(host.signature(100), expected);
        assert_ne!(host.signature(101), expected);
    }

    #[tokio::test]
    async fn test_disabled_host() {
        let image = ImageUpload::new(None, Some("image/png"), PNG.to_vec()).unwrap();
        let result = DisabledImageHost.upload(image).await;
        assert!(matches!(result, Err(UploadError::NotConfigured)));
    }
}
