//! Centralized default constants for the visage system.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates and configuration loaders reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Embedding vector dimension produced by the face model (ArcFace family).
pub const EMBEDDING_DIMENSION: usize = 512;

/// Squared Euclidean distance below which a face matches a stored identity.
///
/// Measured over unit-normalized 512-d embeddings, so the full range is
/// `[0.0, 4.0]`. The comparison is strict: a distance equal to this value is
/// reported as unknown.
pub const RECOGNITION_THRESHOLD: f32 = 1.5;

/// Label reported for faces that do not match any enrolled identity.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Neighbours requested per face during recognition.
pub const RECOGNITION_K: usize = 1;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Default directory holding the index/metadata pair.
pub const DATA_DIR: &str = "data";

/// Default index file name inside the data directory.
pub const INDEX_FILE: &str = "index.bin";

/// Default metadata (label list) file name inside the data directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Default remote key for the index blob.
pub const INDEX_KEY: &str = "index.bin";

/// Default remote key for the metadata blob.
pub const METADATA_KEY: &str = "metadata.json";

// =============================================================================
// DETECTION
// =============================================================================

/// Default base URL of the face detection sidecar.
pub const DETECTOR_URL: &str = "http://127.0.0.1:8501";

/// Timeout for a single detection request in seconds.
pub const DETECTOR_TIMEOUT_SECS: u64 = 30;

/// Timeout for the detector health probe in seconds.
pub const DETECTOR_HEALTH_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// REMOTE SYNC
// =============================================================================

/// Timeout for a single remote blob request in seconds.
pub const SYNC_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum request body size in bytes (base64 images, 16 MB).
pub const MAX_BODY_SIZE_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_DATA_DIR: &str = "VISAGE_DATA_DIR";
pub const ENV_INDEX_FILE: &str = "VISAGE_INDEX_FILE";
pub const ENV_METADATA_FILE: &str = "VISAGE_METADATA_FILE";
pub const ENV_INDEX_KEY: &str = "VISAGE_INDEX_KEY";
pub const ENV_METADATA_KEY: &str = "VISAGE_METADATA_KEY";
pub const ENV_THRESHOLD: &str = "VISAGE_THRESHOLD";

/// Remote sync backend: `none`, `fs`, or `http`.
pub const ENV_SYNC_BACKEND: &str = "VISAGE_SYNC_BACKEND";
pub const ENV_SYNC_PATH: &str = "VISAGE_SYNC_PATH";
pub const ENV_SYNC_URL: &str = "VISAGE_SYNC_URL";
pub const ENV_SYNC_TOKEN: &str = "VISAGE_SYNC_TOKEN";

/// Seconds between forced remote pulls; unset or `0` disables.
pub const ENV_REMOTE_REFRESH_SECS: &str = "VISAGE_REMOTE_REFRESH_SECS";

pub const ENV_DETECTOR_URL: &str = "VISAGE_DETECTOR_URL";
pub const ENV_DETECTOR_TIMEOUT_SECS: &str = "VISAGE_DETECTOR_TIMEOUT_SECS";
