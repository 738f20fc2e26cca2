//! Exact nearest-neighbour index over face embeddings with parallel labels.
//!
//! [`FlatIndex`] is a row-major matrix of unit vectors searched by brute force
//! under squared Euclidean distance. [`EmbeddingStore`] pairs it with the
//! ordered label list: row `i` of the index belongs to `labels[i]`, and every
//! operation here preserves that correspondence.
//!
//! The index supports append only. Removal goes through
//! [`EmbeddingStore::rebuild_excluding`], which reconstructs the retained rows
//! into a fresh store.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::warn;
use visage_core::defaults::EMBEDDING_DIMENSION;
use visage_core::{squared_l2, Embedding, Error, IdentitySummary, Result};

/// One search hit: distance and row position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub distance: f32,
    pub position: usize,
}

/// Nearest stored entry with its label resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch<'a> {
    pub distance: f32,
    pub position: usize,
    pub label: &'a str,
}

/// Flat (brute force) L2 index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Empty index accepting vectors of `dimension` components.
    ///
    /// A zero `dimension` yields an index that stays empty and rejects every
    /// [`FlatIndex::add`].
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build from row-major data; `data.len()` must be a multiple of `dimension`.
    pub fn from_rows(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput("index dimension must be > 0".to_string()));
        }
        if data.len() % dimension != 0 {
            return Err(Error::InvalidInput(format!(
                "{} values do not form rows of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.dimension).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its position.
    pub fn add(&mut self, embedding: &Embedding) -> Result<usize> {
        if self.dimension == 0 {
            return Err(Error::InvalidInput("index dimension must be > 0".to_string()));
        }
        if embedding.dimension() != self.dimension {
            return Err(Error::InvalidInput(format!(
                "embedding has dimension {}, index expects {}",
                embedding.dimension(),
                self.dimension
            )));
        }
        let position = self.len();
        self.data.extend_from_slice(embedding.as_slice());
        Ok(position)
    }

    pub fn row(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` closest rows to `query`, ascending by distance, ties by position.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.is_empty() || query.len() != self.dimension {
            return Vec::new();
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                distance: squared_l2(query, row),
                position,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        hits
    }

    /// Every stored vector in insertion order.
    pub fn reconstruct_all(&self) -> Vec<Embedding> {
        if self.dimension == 0 {
            return Vec::new();
        }
        self.data
            .chunks_exact(self.dimension)
            .map(|row| Embedding::from_unit(row.to_vec()))
            .collect()
    }

    /// Raw row-major storage.
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }
}

/// The gallery: index rows paired positionally with identity labels.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    index: FlatIndex,
    labels: Vec<String>,
}

impl Default for EmbeddingStore {
    fn default() -> Self {
        Self::new(EMBEDDING_DIMENSION)
    }
}

impl EmbeddingStore {
    /// Empty store of the given dimensionality.
    pub fn new(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            labels: Vec::new(),
        }
    }

    /// Pair an index with its labels, rejecting any length mismatch.
    pub fn from_parts(index: FlatIndex, labels: Vec<String>) -> Result<Self> {
        if labels.len() != index.len() {
            return Err(Error::Codec(format!(
                "metadata has {} labels but index holds {} entries",
                labels.len(),
                index.len()
            )));
        }
        Ok(Self { index, labels })
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    /// The `k` nearest entries to `query`.
    ///
    /// Empty when the store is empty or the query has a different
    /// dimensionality than the store.
    pub fn search(&self, query: &Embedding, k: usize) -> Vec<Neighbor> {
        if query.dimension() != self.dimension() {
            warn!(
                subsystem = "gallery",
                component = "store",
                query_dimension = query.dimension(),
                store_dimension = self.dimension(),
                "Query dimension mismatch; returning no neighbours"
            );
            return Vec::new();
        }
        self.index.search(query.as_slice(), k)
    }

    /// Nearest entry with its label.
    pub fn nearest(&self, query: &Embedding) -> Option<NearestMatch<'_>> {
        let hit = self.search(query, 1).into_iter().next()?;
        let label = self.label(hit.position)?;
        Some(NearestMatch {
            distance: hit.distance,
            position: hit.position,
            label,
        })
    }

    /// Append an entry. Duplicate labels are allowed (one per enrollment).
    pub fn insert(&mut self, embedding: Embedding, label: impl Into<String>) -> Result<usize> {
        let position = self.index.add(&embedding)?;
        self.labels.push(label.into());
        debug_assert_eq!(self.labels.len(), self.index.len());
        Ok(position)
    }

    /// A new store holding every entry not labelled `label`, in original order.
    ///
    /// Returns `None` when no entry carries the label.
    pub fn rebuild_excluding(&self, label: &str) -> Option<EmbeddingStore> {
        if !self.labels.iter().any(|l| l == label) {
            return None;
        }

        let mut rebuilt = EmbeddingStore::new(self.dimension());
        for (embedding, entry_label) in self.reconstruct_all().into_iter().zip(&self.labels) {
            if entry_label != label {
                rebuilt.index.data.extend_from_slice(embedding.as_slice());
                rebuilt.labels.push(entry_label.clone());
            }
        }
        Some(rebuilt)
    }

    /// Every stored vector in insertion order.
    pub fn reconstruct_all(&self) -> Vec<Embedding> {
        self.index.reconstruct_all()
    }

    /// Number of entries stored under `label`.
    pub fn count_label(&self, label: &str) -> usize {
        self.labels.iter().filter(|l| *l == label).count()
    }

    /// Distinct labels with entry counts, in first-enrolled order.
    pub fn identities(&self) -> Vec<IdentitySummary> {
        let mut summaries: Vec<IdentitySummary> = Vec::new();
        for label in &self.labels {
            match summaries.iter_mut().find(|s| &s.name == label) {
                Some(summary) => summary.entries += 1,
                None => summaries.push(IdentitySummary {
                    name: label.clone(),
                    entries: 1,
                }),
            }
        }
        summaries
    }
}
