//! The local index/metadata file pair.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::fs;
use tracing::{debug, warn};
use visage_core::defaults::EMBEDDING_DIMENSION;
use visage_core::{Error, Result, VisageConfig};
use visage_storage::write_atomic;

use crate::codec::{decode_index, decode_metadata, encode_index, encode_metadata};
use crate::store::{EmbeddingStore, FlatIndex};

/// Modification time and size of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Stamps of both files of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairStamp {
    pub index: FileStamp,
    pub metadata: FileStamp,
}

/// Result of reading the pair from disk.
#[derive(Debug)]
pub enum LoadOutcome {
    /// At least one file does not exist.
    Missing,
    /// Both exist but cannot be decoded, or disagree on length.
    Corrupt(String),
    Loaded(EmbeddingStore),
}

/// Paths of the index file and its metadata companion.
#[derive(Debug, Clone)]
pub struct GalleryFiles {
    index_path: PathBuf,
    metadata_path: PathBuf,
    dimension: usize,
}

impl GalleryFiles {
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
            dimension: EMBEDDING_DIMENSION,
        }
    }

    /// Files named by the configuration's data directory and file names.
    pub fn from_config(config: &VisageConfig) -> Self {
        Self::new(config.index_path(), config.metadata_path())
    }

    /// Embedding dimension the index must carry to load.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Current stamps, or `None` when either file is absent.
    pub async fn stamps(&self) -> Option<PairStamp> {
        let index = stamp(&self.index_path).await?;
        let metadata = stamp(&self.metadata_path).await?;
        Some(PairStamp { index, metadata })
    }

    /// Whether both files exist.
    pub async fn exists(&self) -> bool {
        self.stamps().await.is_some()
    }

    /// Read and validate the pair.
    pub async fn load(&self) -> LoadOutcome {
        let index_bytes = match read_optional(&self.index_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Missing,
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };
        let metadata_bytes = match read_optional(&self.metadata_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Missing,
            Err(e) => return LoadOutcome::Corrupt(e.to_string()),
        };

        let decoded = decode_index(&index_bytes, self.dimension).and_then(|index| {
            let labels = decode_metadata(&metadata_bytes)?;
            EmbeddingStore::from_parts(index, labels)
        });
        match decoded {
            Ok(store) => {
                debug!(
                    subsystem = "gallery",
                    component = "persistence",
                    op = "load",
                    entry_count = store.len(),
                    "Gallery loaded from disk"
                );
                LoadOutcome::Loaded(store)
            }
            Err(e) => LoadOutcome::Corrupt(e.to_string()),
        }
    }

    /// Write both files, index first.
    ///
    /// Each file is replaced atomically; both are encoded before either is
    /// written so an encoding failure leaves the pair untouched.
    pub async fn save(&self, store: &EmbeddingStore) -> Result<()> {
        let index_bytes = encode_index(store.index());
        let metadata_bytes = encode_metadata(store.labels())?;

        write_atomic(&self.index_path, &index_bytes)
            .await
            .map_err(|e| storage_error("index", &self.index_path, e))?;
        write_atomic(&self.metadata_path, &metadata_bytes)
            .await
            .map_err(|e| storage_error("metadata", &self.metadata_path, e))?;

        debug!(
            subsystem = "gallery",
            component = "persistence",
            op = "save",
            entry_count = store.len(),
            bytes = index_bytes.len() + metadata_bytes.len(),
            "Gallery written to disk"
        );
        Ok(())
    }

    /// Create whichever file of the pair is absent, empty.
    ///
    /// Existing files are left alone. Returns whether anything was created.
    pub async fn ensure_exists(&self) -> Result<bool> {
        let mut created = false;
        if stamp(&self.index_path).await.is_none() {
            write_atomic(&self.index_path, &encode_index(&FlatIndex::new(self.dimension)))
                .await
                .map_err(|e| storage_error("index", &self.index_path, e))?;
            created = true;
        }
        if stamp(&self.metadata_path).await.is_none() {
            write_atomic(&self.metadata_path, &encode_metadata(&[])?)
                .await
                .map_err(|e| storage_error("metadata", &self.metadata_path, e))?;
            created = true;
        }
        if created {
            warn!(
                subsystem = "gallery",
                component = "persistence",
                index_path = %self.index_path.display(),
                metadata_path = %self.metadata_path.display(),
                "Gallery files were missing; created empty ones"
            );
        }
        Ok(created)
    }
}

async fn stamp(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    Some(FileStamp {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn storage_error(what: &str, path: &Path, err: Error) -> Error {
    Error::Storage(format!(
        "failed to write {} file {}: {}",
        what,
        path.display(),
        err
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use visage_core::Embedding;

    fn files_in(dir: &TempDir) -> GalleryFiles {
        GalleryFiles::new(dir.path().join("index.bin"), dir.path().join("metadata.json"))
            .with_dimension(4)
    }

    fn sample_store() -> EmbeddingStore {
        let mut store = EmbeddingStore::new(4);
        store
            .insert(Embedding::normalized(&[1.0, 0.0, 0.0, 0.0]).unwrap(), "alice")
            .unwrap();
        store
            .insert(Embedding::normalized(&[0.0, 2.0, 0.0, 0.0]).unwrap(), "bob")
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_files() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        assert!(files.stamps().await.is_none());
        assert!(!files.exists().await);
        assert!(matches!(files.load().await, LoadOutcome::Missing));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        let store = sample_store();
        files.save(&store).await.unwrap();

        match files.load().await {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, store),
            other => panic!("expected Loaded, got {:?}", other),
        }
        assert!(files.exists().await);
    }

    #[tokio::test]
    async fn test_save_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let files = GalleryFiles::new(
            dir.path().join("nested/data/index.bin"),
            dir.path().join("nested/data/metadata.json"),
        )
        .with_dimension(4);
        files.save(&sample_store()).await.unwrap();
        assert!(files.exists().await);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        files.save(&sample_store()).await.unwrap();
        std::fs::write(files.metadata_path(), r#"["alice","bob","carol"]"#).unwrap();

        match files.load().await {
            LoadOutcome::Corrupt(reason) => assert!(reason.contains("3 labels")),
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_index_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        std::fs::write(files.index_path(), b"definitely not an index").unwrap();
        std::fs::write(files.metadata_path(), b"[]").unwrap();
        assert!(matches!(files.load().await, LoadOutcome::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        files_in(&dir).save(&sample_store()).await.unwrap();
        let wide = GalleryFiles::new(dir.path().join("index.bin"), dir.path().join("metadata.json"));
        assert!(matches!(wide.load().await, LoadOutcome::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_empty_pair_once() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        assert!(files.ensure_exists().await.unwrap());
        assert!(!files.ensure_exists().await.unwrap());

        match files.load().await {
            LoadOutcome::Loaded(store) => {
                assert!(store.is_empty());
                assert_eq!(store.dimension(), 4);
            }
            other => panic!("expected Loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ensure_exists_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        files.save(&sample_store()).await.unwrap();
        std::fs::remove_file(files.metadata_path()).unwrap();
        let index_before = std::fs::read(files.index_path()).unwrap();

        assert!(files.ensure_exists().await.unwrap());
        assert_eq!(std::fs::read(files.index_path()).unwrap(), index_before);
        assert_eq!(std::fs::read(files.metadata_path()).unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_stamps_change_on_rewrite() {
        let dir = TempDir::new().unwrap();
        let files = files_in(&dir);
        files.ensure_exists().await.unwrap();
        let before = files.stamps().await.unwrap();

        files.save(&sample_store()).await.unwrap();
        let after = files.stamps().await.unwrap();
        assert_ne!(before, after);
    }
}
