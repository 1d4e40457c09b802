//! Image upload route handler.

use axum::{
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::services::uploads::{ImageUpload, UploadError};
use crate::state::AppState;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

/// Public URL of an uploaded image.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge.into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Upload a single image.
///
/// # Route
///
/// `POST /api/upload`
pub async fn upload(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;

        let image = ImageUpload::new(file_name.as_deref(), content_type.as_deref(), bytes.to_vec())?;
        let url = state.images().upload(image).await?;
        tracing::info!(user_id = %claims.sub, %url, "image uploaded");
        return Ok(Json(UploadResponse { url }));
    }

    Err(UploadError::MissingFile.into())
}
