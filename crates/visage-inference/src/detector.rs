//! HTTP client for a face detection/embedding sidecar.
//!
//! The sidecar hosts the detection model (an ArcFace-family pipeline) and
//! exposes two endpoints:
//!
//! - `POST {base_url}/detect` with `{"image": "<base64>"}`, answering
//!   `{"faces": [{"bbox": [x1, y1, x2, y2], "embedding": [...]}]}` and
//!   optionally `"model": "..."`, which is logged but never replaces the
//!   configured model name
//! - `GET {base_url}/health`, answering 200 once the model is loaded

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use visage_core::{DetectedFace, DetectorConfig, Error, FaceDetector, Result};

/// Face detector reached over HTTP.
pub struct HttpFaceDetector {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFaceDetector {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "buffalo_l".to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(visage_core::defaults::DETECTOR_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.base_url.clone()).with_timeout(config.timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name returned by `model_name()` and attached to detection spans.
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct DetectRequest {
    image: String, // base64 encoded
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    #[instrument(skip(self, image), fields(subsystem = "inference", component = "http_detector", op = "detect", model = %self.model, bytes = image.len()))]
    async fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>> {
        use base64::Engine;
        let start = Instant::now();

        let request = DetectRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image),
        };

        let url = format!("{}/detect", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Detection(format!("Detection request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!(
                "Detector returned {}: {}",
                status, body
            )));
        }

        let result: DetectResponse = response
            .json()
            .await
            .map_err(|e| Error::Detection(format!("Failed to parse detector response: {}", e)))?;

        debug!(
            sidecar_model = result.model.as_deref().unwrap_or("(unreported)"),
            face_count = result.faces.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Detection complete"
        );
        Ok(result.faces)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(
                visage_core::defaults::DETECTOR_HEALTH_TIMEOUT_SECS,
            ))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
