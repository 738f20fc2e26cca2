//! Filesystem blob store and atomic file writes.
//!
//! Blobs live as plain files directly under the base directory, one file per
//! key. Keys may not contain path separators or parent components, so a key
//! can never escape the base directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;
use visage_core::{BlobStore, Error, Result};

/// Write `data` to `path` atomically: temp file in the same directory, fsync,
/// then rename over the target.
///
/// Readers observe either the old content or the new content, never a
/// truncated file. Parent directories are created as needed.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| {
            warn!(parent = %parent.display(), error = %e, "write_atomic: create_dir_all failed");
            e
        })?;
    }

    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let mut file = fs::File::create(&temp_path).await.map_err(|e| {
        warn!(temp_path = %temp_path.display(), error = %e, "write_atomic: File::create failed");
        e
    })?;
    if let Err(e) = write_and_sync(&mut file, data).await {
        drop(file);
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    drop(file);

    fs::rename(&temp_path, path).await.map_err(|e| {
        warn!(from = %temp_path.display(), to = %path.display(), error = %e, "write_atomic: rename failed");
        e
    })?;

    debug!(path = %path.display(), bytes = data.len(), "write_atomic: committed");
    Ok(())
}

async fn write_and_sync(file: &mut fs::File, data: &[u8]) -> Result<()> {
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Blob store backed by a directory.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Validate that the directory can be written, read, and cleaned up.
    ///
    /// Performs a full round trip at startup to catch permission errors and
    /// missing mounts early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.base_path.join(".visage-health-check");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let data = b"visage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');
    if bad {
        return Err(Error::InvalidInput(format!("invalid blob key: {:?}", key)));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key)?;
        Ok(fs::try_exists(full_path).await?)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("blob {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(sync_key = %key, full_path = %full_path.display(), bytes = data.len(), "fs_blob: put");
        write_atomic(&full_path, data).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fs"
    }
}
