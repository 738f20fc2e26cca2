//! Structured logging schema and field name constants for visage.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied (corrupt gallery, failed sync) |
//! | INFO  | Lifecycle events, enrollments, deletions, reloads |
//! | DEBUG | Decision points, cache hits, sync outcomes |
//! | TRACE | Per-face matching detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "gallery", "storage", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "freshness", "durable_sync", "recognition", "http_detector"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "recognize", "enroll", "delete", "pull", "push"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Identity label being enrolled, matched, or deleted.
pub const LABEL: &str = "label";

/// Remote blob key.
pub const SYNC_KEY: &str = "sync_key";

/// Local file path.
pub const PATH: &str = "path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Number of faces returned by the detector.
pub const FACE_COUNT: &str = "face_count";

/// Number of gallery entries.
pub const ENTRY_COUNT: &str = "entry_count";

/// Squared distance of the nearest match.
pub const DISTANCE: &str = "distance";

/// Byte length of a blob or file.
pub const BYTES: &str = "bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_distinct_snake_case() {
        let fields = [
            REQUEST_ID,
            SUBSYSTEM,
            COMPONENT,
            OPERATION,
            LABEL,
            SYNC_KEY,
            PATH,
            DURATION_MS,
            RESULT_COUNT,
            FACE_COUNT,
            ENTRY_COUNT,
            DISTANCE,
            BYTES,
            SUCCESS,
            ERROR_MSG,
        ];
        let unique: std::collections::HashSet<_> = fields.iter().collect();
        assert_eq!(unique.len(), fields.len());
        assert!(fields
            .iter()
            .all(|f| f.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
    }
}
