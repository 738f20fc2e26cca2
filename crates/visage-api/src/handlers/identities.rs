//! Identity management handlers: enroll, list, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use visage_core::IdentitySummary;
use visage_gallery::{DeleteOutcome, EnrollOutcome};

use super::decode_image;
use crate::{ApiError, AppState};

/// Request body for enrolling a face.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    /// Identity label to store the face under.
    pub name: String,
    /// Base64-encoded image bytes; the first detected face is enrolled.
    pub image_data: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub name: String,
    pub position: usize,
    pub total: usize,
    pub sync_failed: bool,
}

#[derive(Debug, Serialize)]
pub struct ListIdentitiesResponse {
    pub identities: Vec<IdentitySummary>,
    pub total_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteIdentityResponse {
    pub name: String,
    pub removed: usize,
    pub remaining: usize,
}

/// Enroll the first face in an image under a name.
///
/// # Returns
/// - 201 Created with the stored position and new gallery size
/// - 400 Bad Request for an empty name or invalid image
/// - 422 Unprocessable Entity if no usable face was found
pub async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<(StatusCode, Json<EnrollResponse>), ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    let image = decode_image(&req.image_data)?;

    match state.enrollment.enroll(&image, &name).await? {
        EnrollOutcome::Enrolled {
            position,
            total,
            sync_failed,
        } => Ok((
            StatusCode::CREATED,
            Json(EnrollResponse {
                name,
                position,
                total,
                sync_failed,
            }),
        )),
        EnrollOutcome::NoFaceDetected => Err(ApiError::Unprocessable(
            "No face detected in image".into(),
        )),
        EnrollOutcome::InvalidEmbedding { reason } => Err(ApiError::Unprocessable(format!(
            "Detected face could not be enrolled: {}",
            reason
        ))),
    }
}

/// List enrolled identities with entry counts.
pub async fn list_identities(
    State(state): State<AppState>,
) -> Result<Json<ListIdentitiesResponse>, ApiError> {
    let identities = state
        .gallery
        .identities()
        .await
        .ok_or_else(|| ApiError::ServiceUnavailable("Gallery is not available".into()))?;
    Ok(Json(ListIdentitiesResponse {
        total_entries: identities.iter().map(|i| i.entries).sum(),
        identities,
    }))
}

/// Remove every entry enrolled under a name.
///
/// # Returns
/// - 200 OK with the number of entries removed
/// - 404 Not Found if nothing is enrolled under the name
/// - 409 Conflict if no gallery is loaded yet
/// - 500 Internal Server Error if the gallery could not be reloaded afterwards
pub async fn delete_identity(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteIdentityResponse>, ApiError> {
    match state.deletion.delete(&name).await? {
        DeleteOutcome::Deleted { removed, remaining } => Ok(Json(DeleteIdentityResponse {
            name,
            removed,
            remaining,
        })),
        DeleteOutcome::NotFound => Err(ApiError::NotFound(format!(
            "No identity enrolled as '{}'",
            name
        ))),
        DeleteOutcome::GalleryNotLoaded => Err(ApiError::Conflict(
            "Gallery is not loaded; nothing to delete".into(),
        )),
        DeleteOutcome::ReloadFailed { reason } => Err(ApiError::Internal(format!(
            "Gallery reload after delete failed: {}",
            reason
        ))),
    }
}
