//! Core data models for visage.

use serde::{Deserialize, Serialize};

use crate::defaults::UNKNOWN_LABEL;
use crate::error::{Error, Result};

// =============================================================================
// EMBEDDING
// =============================================================================

/// A unit-length face embedding.
///
/// The only way to build one is through [`Embedding::normalized`] (or
/// [`Embedding::from_unit`] for vectors read back from a trusted index), so
/// every vector that reaches the index or a query has already been scaled to
/// length 1. The recognition threshold is only meaningful under that
/// invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Normalize a raw model output to unit length.
    ///
    /// Fails on an empty vector, non-finite components, or zero norm.
    pub fn normalized(raw: &[f32]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidInput("embedding is empty".to_string()));
        }
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "embedding contains non-finite values".to_string(),
            ));
        }
        let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return Err(Error::InvalidInput("embedding has zero norm".to_string()));
        }
        Ok(Self(raw.iter().map(|v| v / norm).collect()))
    }

    /// Normalize and additionally require the given dimension.
    pub fn normalized_with_dimension(raw: &[f32], dimension: usize) -> Result<Self> {
        if raw.len() != dimension {
            return Err(Error::InvalidInput(format!(
                "embedding has dimension {}, expected {}",
                raw.len(),
                dimension
            )));
        }
        Self::normalized(raw)
    }

    /// Wrap a vector that was stored already normalized.
    ///
    /// Used when reconstructing rows from a persisted index; no rescaling is
    /// applied so reconstructed vectors are bit-identical to what was stored.
    pub fn from_unit(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Squared Euclidean distance to another vector of the same dimension.
    pub fn squared_distance(&self, other: &[f32]) -> f32 {
        squared_l2(&self.0, other)
    }
}

/// Squared Euclidean distance between two equal-length slices.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// =============================================================================
// DETECTION
// =============================================================================

/// Face bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A face as reported by the detection model: raw (un-normalized) embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Vec<f32>,
}

impl DetectedFace {
    pub fn new(bbox: BoundingBox, embedding: Vec<f32>) -> Self {
        Self { bbox, embedding }
    }

    /// Normalized embedding, required to have `dimension` components.
    pub fn unit_embedding(&self, dimension: usize) -> Result<Embedding> {
        Embedding::normalized_with_dimension(&self.embedding, dimension)
    }
}

// =============================================================================
// RECOGNITION
// =============================================================================

/// Outcome of matching one face against the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Identity {
    Known(String),
    Unknown,
}

impl Identity {
    pub fn is_known(&self) -> bool {
        matches!(self, Identity::Known(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identity::Known(name) => name,
            Identity::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        if s == UNKNOWN_LABEL {
            Identity::Unknown
        } else {
            Identity::Known(s)
        }
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        match id {
            Identity::Known(name) => name,
            Identity::Unknown => UNKNOWN_LABEL.to_string(),
        }
    }
}

/// One recognized face: where it is, who it is, and how close the match was.
///
/// `distance` is `None` when the gallery was empty or the embedding could
/// not be normalized, i.e. there was nothing to compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedFace {
    pub bbox: BoundingBox,
    pub label: Identity,
    pub distance: Option<f32>,
}

/// Apply the strict recognition threshold to a nearest-neighbour hit.
pub fn classify(distance: f32, threshold: f32, label: &str) -> Identity {
    if distance < threshold {
        Identity::Known(label.to_string())
    } else {
        Identity::Unknown
    }
}

/// An enrolled identity with the number of stored embeddings for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub name: String,
    pub entries: usize,
}
