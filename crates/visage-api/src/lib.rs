//! visage-api - HTTP API for the visage face gallery

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;
use visage_gallery::{DeletionEngine, EnrollmentEngine, Gallery, RecognitionEngine};

pub use error::ApiError;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<Gallery>,
    pub recognition: RecognitionEngine,
    pub enrollment: EnrollmentEngine,
    pub deletion: DeletionEngine,
}

impl AppState {
    pub fn new(gallery: Arc<Gallery>) -> Self {
        Self {
            recognition: RecognitionEngine::new(gallery.clone()),
            enrollment: EnrollmentEngine::new(gallery.clone()),
            deletion: DeletionEngine::new(gallery.clone()),
            gallery,
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/recognize", post(handlers::recognition::recognize))
        .route("/api/v1/enroll", post(handlers::identities::enroll))
        .route("/api/v1/identities", get(handlers::identities::list_identities))
        .route(
            "/api/v1/identities/:name",
            delete(handlers::identities::delete_identity),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
