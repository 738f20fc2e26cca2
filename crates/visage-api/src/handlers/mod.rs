//! HTTP handlers.

pub mod health;
pub mod identities;
pub mod recognition;

use base64::Engine;

use crate::ApiError;

/// Decode a base64 image payload and check that it looks like an image.
pub(crate) fn decode_image(image_data: &str) -> Result<Vec<u8>, ApiError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_data.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 image data: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Image data is empty".into()));
    }
    if !infer::is_image(&bytes) {
        return Err(ApiError::BadRequest(
            "Image data is not a recognized image format".into(),
        ));
    }
    Ok(bytes)
}
