//! Frame recognition handler.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use visage_core::RecognizedFace;

use super::decode_image;
use crate::{ApiError, AppState};

/// Request body for recognizing faces in a frame.
#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    /// Base64-encoded image bytes.
    pub image_data: String,
}

#[derive(Debug, Serialize)]
pub struct RecognizeResponse {
    pub faces: Vec<RecognizedFace>,
    pub count: usize,
}

/// Label every face in an image.
///
/// # Returns
/// - 200 OK with one entry per detected face, in detection order
/// - 400 Bad Request if `image_data` is not a base64 image
/// - 503 Service Unavailable if the detector fails
pub async fn recognize(
    State(state): State<AppState>,
    Json(req): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>, ApiError> {
    let image = decode_image(&req.image_data)?;
    let faces = state.recognition.recognize(&image).await?;
    Ok(Json(RecognizeResponse {
        count: faces.len(),
        faces,
    }))
}
