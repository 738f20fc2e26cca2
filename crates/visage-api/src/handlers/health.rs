use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

/// Liveness plus detector and gallery state.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let detector = state.gallery.detector();
    let detector_healthy = detector.health_check().await.unwrap_or(false);
    let gallery = state.gallery.status().await;

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "detector": {
            "model": detector.model_name(),
            "healthy": detector_healthy,
        },
        "gallery": gallery,
    }))
}
