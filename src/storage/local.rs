//! Local-disk storage provider.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{
    ArtifactInfo, ArtifactMetadata, SaveOptions, StorageError, StorageProvider, StorageResult,
    validate_filename,
};

/// Stores artifacts as flat files under a root directory.
///
/// [`url`](StorageProvider::url) returns the file path; downloads are
/// served by the HTTP layer, never straight from disk.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    root: PathBuf,
}

impl LocalStorageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> StorageResult<PathBuf> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

/// Some filesystems have no birth time; fall back to mtime, then to now.
fn created_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn modified_time(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn not_found_or(filename: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(filename.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn init(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        log::info!("Local storage initialized at {}", self.root.display());
        Ok(())
    }

    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        options: &SaveOptions,
    ) -> StorageResult<ArtifactInfo> {
        let path = self.path_for(filename)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &content).await.map_err(|e| {
            log::error!("❌ Failed to write {}: {}", path.display(), e);
            StorageError::Io(e)
        })?;

        let meta = tokio::fs::metadata(&path).await?;
        log::debug!("File saved to local storage: {} ({} bytes)", path.display(), meta.len());

        Ok(ArtifactInfo {
            filename: filename.to_string(),
            size: meta.len(),
            created_at: created_time(&meta),
            category: options.category.clone(),
            content_type: options.content_type.clone(),
            provider: self.name().to_string(),
            location: path.display().to_string(),
            metadata: options.metadata.clone(),
        })
    }

    async fn get(&self, filename: &str) -> StorageResult<Bytes> {
        let path = self.path_for(filename)?;
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or(filename, e))?;
        log::debug!("File retrieved from local storage: {}", filename);
        Ok(Bytes::from(content))
    }

    async fn delete(&self, filename: &str) -> StorageResult<bool> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("File deleted from local storage: {}", filename);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                log::error!("❌ Failed to delete {}: {}", path.display(), e);
                Err(StorageError::Io(e))
            }
        }
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        let path = self.path_for(filename)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn metadata(&self, filename: &str) -> StorageResult<ArtifactMetadata> {
        let path = self.path_for(filename)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found_or(filename, e))?;

        Ok(ArtifactMetadata {
            filename: filename.to_string(),
            size: meta.len(),
            created_at: created_time(&meta),
            modified_at: modified_time(&meta),
            location: path.display().to_string(),
        })
    }

    fn url(&self, filename: &str) -> String {
        self.root.join(filename).display().to_string()
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
