//! At-most-once detector initialisation.
//!
//! Loading a face model is slow and must happen exactly once per process even
//! when the first recognition and the first enrollment race each other.
//! [`LazyDetector`] wraps a constructor in a `tokio::sync::OnceCell`: the
//! first caller runs the constructor plus a health probe, concurrent callers
//! wait for that result, and later callers get the cached instance. A failed
//! initialisation leaves the cell empty so the next caller retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use visage_core::{DetectedFace, Error, FaceDetector, Result};

type Factory = Box<dyn Fn() -> Result<Arc<dyn FaceDetector>> + Send + Sync>;

/// Lazily constructed, process-wide face detector.
pub struct LazyDetector {
    cell: OnceCell<Arc<dyn FaceDetector>>,
    factory: Factory,
    require_healthy: bool,
    init_attempts: AtomicUsize,
    pending_name: String,
}

impl LazyDetector {
    /// Wrap a constructor. The detector is built on first use.
    pub fn new<F>(pending_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn FaceDetector>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
            require_healthy: false,
            init_attempts: AtomicUsize::new(0),
            pending_name: pending_name.into(),
        }
    }

    /// Fail initialisation when the health probe reports the model unavailable.
    pub fn require_healthy(mut self, require: bool) -> Self {
        self.require_healthy = require;
        self
    }

    /// Get the detector, initialising it on first call.
    pub async fn get(&self) -> Result<Arc<dyn FaceDetector>> {
        self.cell
            .get_or_try_init(|| self.initialise())
            .await
            .cloned()
    }

    pub fn is_initialised(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of times the constructor has run (successfully or not).
    pub fn init_attempts(&self) -> usize {
        self.init_attempts.load(Ordering::SeqCst)
    }

    async fn initialise(&self) -> Result<Arc<dyn FaceDetector>> {
        let start = Instant::now();
        self.init_attempts.fetch_add(1, Ordering::SeqCst);

        let detector = (self.factory)()?;
        let healthy = detector.health_check().await.unwrap_or(false);
        if !healthy {
            if self.require_healthy {
                return Err(Error::Detection(format!(
                    "detector {} failed its health check",
                    detector.model_name()
                )));
            }
            warn!(
                subsystem = "inference",
                component = "lazy_detector",
                model = detector.model_name(),
                "Detector health check failed; continuing, requests may fail"
            );
        }

        info!(
            subsystem = "inference",
            component = "lazy_detector",
            op = "initialise",
            model = detector.model_name(),
            healthy,
            duration_ms = start.elapsed().as_millis() as u64,
            "Face detector initialised"
        );
        Ok(detector)
    }
}

#[async_trait]
impl FaceDetector for LazyDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>> {
        self.get().await?.detect(image).await
    }

    async fn health_check(&self) -> Result<bool> {
        match self.get().await {
            Ok(detector) => detector.health_check().await,
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        match self.cell.get() {
            Some(detector) => detector.model_name(),
            None => &self.pending_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFaceDetector;

    fn counting_factory() -> LazyDetector {
        LazyDetector::new("mock", || {
            let detector: Arc<dyn FaceDetector> = Arc::new(MockFaceDetector::new());
            Ok(detector)
        })
    }

    #[tokio::test]
    async fn test_initialises_once_under_concurrent_access() {
        let lazy = Arc::new(counting_factory());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move { lazy.get().await.is_ok() }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(lazy.init_attempts(), 1);
        assert!(lazy.is_initialised());
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let lazy = LazyDetector::new("flaky", move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Detection("model files missing".to_string()))
            } else {
                let detector: Arc<dyn FaceDetector> = Arc::new(MockFaceDetector::new());
                Ok(detector)
            }
        });

        assert!(lazy.get().await.is_err());
        assert!(!lazy.is_initialised());
        assert!(lazy.get().await.is_ok());
        assert_eq!(lazy.init_attempts(), 2);
    }

    #[tokio::test]
    async fn test_require_healthy_rejects_unhealthy_detector() {
        let lazy = LazyDetector::new("sick", || {
            let detector: Arc<dyn FaceDetector> =
                Arc::new(MockFaceDetector::new().with_health(false));
            Ok(detector)
        })
        .require_healthy(true);

        assert!(lazy.get().await.is_err());
        assert!(!lazy.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_model_name_before_and_after_init() {
        let lazy = counting_factory();
        assert_eq!(lazy.model_name(), "mock");
        lazy.get().await.unwrap();
        assert_eq!(lazy.model_name(), "mock-face-detector");
    }
}
