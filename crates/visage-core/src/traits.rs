//! Core traits for visage abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DetectedFace;

// =============================================================================
// DETECTION
// =============================================================================

/// Backend that finds faces in an image and embeds them.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detect every face in an encoded image (JPEG, PNG, ...).
    ///
    /// Faces are returned in the model's detection order with raw,
    /// un-normalized embeddings.
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>>;

    /// Check if the detector is reachable and its model is loaded.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// BLOB STORAGE
// =============================================================================

/// Remote named-blob store used to share the gallery across processes.
///
/// Keys are flat logical names; implementations decide how they map onto
/// paths or URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if a blob exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read the blob stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Write `data` under `key`, creating or overwriting it.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete the blob under `key`. Missing blobs are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Short backend name for logs ("fs", "http").
    fn backend_name(&self) -> &'static str;
}
