//! Artifact storage.
//!
//! Generated PDFs (and, optionally, uploaded HTML inputs) are persisted
//! through a [`StorageProvider`], chosen once at startup and shared behind
//! the [`ArtifactStore`] facade.
//!
//! # Available Providers
//!
//! | Provider | Backend | Feature |
//! |----------|---------|---------|
//! | [`LocalStorageProvider`] | a directory on local disk | always |
//! | [`ObjectStoreProvider`] | S3-compatible bucket, or in-memory | `s3-storage` |
//!
//! # Contract
//!
//! Every provider honours the same rules:
//!
//! - `save` creates intermediate directories/prefixes transparently
//! - `get` / `metadata` of a missing artifact → [`StorageError::NotFound`]
//! - `delete` of a missing artifact → `Ok(false)`, never an error
//! - filenames failing [`validate_filename`] are rejected before any I/O
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_gateway::storage::{ArtifactStore, LocalStorageProvider, SaveRequest};
//!
//! let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new("./temp")));
//! store.init().await?;
//!
//! let info = store.save_file(pdf_bytes, SaveRequest::pdf()).await?;
//! println!("Saved {} ({} bytes)", info.filename, info.size);
//! ```

mod local;
#[cfg(feature = "s3-storage")]
mod object;

pub use local::LocalStorageProvider;
#[cfg(feature = "s3-storage")]
pub use object::ObjectStoreProvider;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::StorageConfig;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by storage providers.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No artifact is stored under this name.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The name is empty or could escape the storage root.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// Local filesystem failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object store backend failure.
    #[cfg(feature = "s3-storage")]
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Invalid provider configuration.
    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

/// Result type alias using [`StorageError`].
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Reject names that are empty or contain `..`, `/` or `\`.
///
/// Artifacts are always stored flat under the provider root, so a valid
/// name never needs a path separator.
///
/// ```rust
/// use html2pdf_gateway::storage::validate_filename;
///
/// assert!(validate_filename("3f2c.pdf").is_ok());
/// assert!(validate_filename("../etc/passwd").is_err());
/// ```
pub fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

// ============================================================================
// Data types
// ============================================================================

/// Per-save options passed to a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub category: String,
    pub content_type: Option<String>,
    /// Free-form annotations (`uploaded_at`, `original_name`, ...).
    pub metadata: BTreeMap<String, String>,
}

/// What a provider reports after a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub category: String,
    pub content_type: Option<String>,
    /// Provider name, see [`StorageProvider::name`].
    pub provider: String,
    /// Filesystem path or object URL.
    pub location: String,
    pub metadata: BTreeMap<String, String>,
}

/// Stat-like information about a stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactMetadata {
    pub filename: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub location: String,
}

// ============================================================================
// StorageProvider
// ============================================================================

/// Backend that stores artifact bytes by filename.
///
/// # Thread Safety
///
/// Providers are shared by every request task, hence `Send + Sync`.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Prepare the backend (create the root directory, log the bucket...).
    async fn init(&self) -> StorageResult<()>;

    /// Store `content` under `filename`, replacing any previous artifact.
    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        options: &SaveOptions,
    ) -> StorageResult<ArtifactInfo>;

    /// Read the full artifact.
    async fn get(&self, filename: &str) -> StorageResult<Bytes>;

    /// Remove the artifact. `Ok(false)` if it did not exist.
    async fn delete(&self, filename: &str) -> StorageResult<bool>;

    async fn exists(&self, filename: &str) -> StorageResult<bool>;

    async fn metadata(&self, filename: &str) -> StorageResult<ArtifactMetadata>;

    /// Where the artifact lives: a path for local disk, a URL for buckets.
    fn url(&self, filename: &str) -> String;

    /// Provider name used in logs and [`ArtifactInfo::provider`].
    fn name(&self) -> &'static str;
}

// ============================================================================
// ArtifactStore facade
// ============================================================================

/// Describes an artifact to save through [`ArtifactStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Use this exact name instead of generating one.
    pub filename: Option<String>,
    /// Extension for generated names, with or without the leading dot.
    pub extension: String,
    pub prefix: Option<String>,
    pub category: Option<String>,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl SaveRequest {
    /// A generated-name PDF in category `pdf`.
    pub fn pdf() -> Self {
        Self {
            extension: ".pdf".to_string(),
            category: Some("pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            ..Self::default()
        }
    }

    /// Store under `filename` instead of a generated name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

impl Default for SaveRequest {
    fn default() -> Self {
        Self {
            filename: None,
            extension: ".pdf".to_string(),
            prefix: None,
            category: None,
            content_type: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Storage service used by the conversion layer.
///
/// Wraps the configured provider, generates names and logs every outcome.
/// Cheap to clone.
#[derive(Clone)]
pub struct ArtifactStore {
    provider: Arc<dyn StorageProvider>,
}

impl ArtifactStore {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Pick the provider described by `config`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Configuration`] when S3 is requested but the crate
    /// was built without `s3-storage`, or the S3 client cannot be built.
    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        let provider: Arc<dyn StorageProvider> = match config {
            StorageConfig::Local { root } => Arc::new(LocalStorageProvider::new(root)),
            #[cfg(feature = "s3-storage")]
            StorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                endpoint,
            } => Arc::new(ObjectStoreProvider::s3(
                bucket,
                region,
                access_key_id.as_deref(),
                secret_access_key.as_deref(),
                endpoint.as_deref(),
            )?),
            #[cfg(not(feature = "s3-storage"))]
            StorageConfig::S3 { .. } => {
                return Err(StorageError::Configuration(
                    "S3 storage requires the `s3-storage` feature".to_string(),
                ));
            }
        };
        Ok(Self::new(provider))
    }

    /// Initialize the provider. Call once at startup.
    pub async fn init(&self) -> StorageResult<()> {
        self.provider.init().await?;
        log::info!("✅ Storage service initialized (provider: {})", self.provider.name());
        Ok(())
    }

    /// `[prefix-]<uuid-v4>.<ext>`; the extension may include its dot.
    ///
    /// ```rust
    /// use html2pdf_gateway::storage::ArtifactStore;
    ///
    /// let name = ArtifactStore::generate_filename("pdf", Some("report"));
    /// assert!(name.starts_with("report-"));
    /// assert!(name.ends_with(".pdf"));
    /// ```
    pub fn generate_filename(extension: &str, prefix: Option<&str>) -> String {
        let uuid = uuid::Uuid::new_v4();
        let ext = extension.trim_start_matches('.');
        match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}-{}.{}", prefix, uuid, ext),
            None => format!("{}.{}", uuid, ext),
        }
    }

    /// Save generated content. Category defaults to `general`.
    pub async fn save_file(
        &self,
        content: Bytes,
        request: SaveRequest,
    ) -> StorageResult<ArtifactInfo> {
        let options = SaveOptions {
            category: request.category.unwrap_or_else(|| "general".to_string()),
            content_type: request.content_type,
            metadata: request.metadata,
        };
        self.save_with(
            content,
            request.filename,
            &request.extension,
            request.prefix,
            options,
        )
        .await
    }

    /// Save an uploaded file, keeping its original name in the metadata.
    /// Category defaults to `upload`; the extension comes from the
    /// original name.
    pub async fn save_uploaded_file(
        &self,
        content: Bytes,
        original_name: &str,
        request: SaveRequest,
    ) -> StorageResult<ArtifactInfo> {
        let extension = std::path::Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
            .to_string();

        let mut metadata = request.metadata;
        metadata.insert("original_name".to_string(), original_name.to_string());

        let options = SaveOptions {
            category: request.category.unwrap_or_else(|| "upload".to_string()),
            content_type: request.content_type,
            metadata,
        };
        let info = self
            .save_with(content, request.filename, &extension, request.prefix, options)
            .await?;

        log::info!(
            "Uploaded file saved: {} (original: {}, {} bytes)",
            info.filename,
            original_name,
            info.size
        );
        Ok(info)
    }

    async fn save_with(
        &self,
        content: Bytes,
        filename: Option<String>,
        extension: &str,
        prefix: Option<String>,
        mut options: SaveOptions,
    ) -> StorageResult<ArtifactInfo> {
        let filename =
            filename.unwrap_or_else(|| Self::generate_filename(extension, prefix.as_deref()));
        validate_filename(&filename)?;

        options
            .metadata
            .entry("uploaded_at".to_string())
            .or_insert_with(|| Utc::now().to_rfc3339());

        match self.provider.save(content, &filename, &options).await {
            Ok(info) => {
                log::info!(
                    "File saved: {} ({} bytes, category: {})",
                    info.filename,
                    info.size,
                    info.category
                );
                Ok(info)
            }
            Err(e) => {
                log::error!("❌ Failed to save {} via {}: {}", filename, self.provider.name(), e);
                Err(e)
            }
        }
    }

    pub async fn get_file(&self, filename: &str) -> StorageResult<Bytes> {
        validate_filename(filename)?;
        self.provider.get(filename).await
    }

    /// Delete an artifact; `Ok(false)` if it was already gone.
    pub async fn delete_file(&self, filename: &str) -> StorageResult<bool> {
        validate_filename(filename)?;
        let deleted = self.provider.delete(filename).await?;
        if deleted {
            log::info!("File deleted: {}", filename);
        } else {
            log::warn!("⚠️ File not found for deletion: {}", filename);
        }
        Ok(deleted)
    }

    pub async fn file_exists(&self, filename: &str) -> StorageResult<bool> {
        validate_filename(filename)?;
        self.provider.exists(filename).await
    }

    pub async fn file_metadata(&self, filename: &str) -> StorageResult<ArtifactMetadata> {
        validate_filename(filename)?;
        self.provider.metadata(filename).await
    }

    pub fn file_url(&self, filename: &str) -> StorageResult<String> {
        validate_filename(filename)?;
        Ok(self.provider.url(filename))
    }

    /// Name of the configured provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("provider", &self.provider.name())
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("a.pdf").is_ok());
        assert!(validate_filename("report-1234.pdf").is_ok());

        for bad in ["", "..", "../a.pdf", "a/b.pdf", "a\\b.pdf", "x..pdf"] {
            assert!(
                matches!(validate_filename(bad), Err(StorageError::InvalidFilename(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_generate_filename_shapes() {
        let plain = ArtifactStore::generate_filename(".pdf", None);
        let (stem, ext) = plain.rsplit_once('.').unwrap();
        assert_eq!(ext, "pdf");
        assert!(uuid::Uuid::parse_str(stem).is_ok());

        let no_dot = ArtifactStore::generate_filename("html", None);
        assert!(no_dot.ends_with(".html"));
        assert!(!no_dot.contains(".."));

        let prefixed = ArtifactStore::generate_filename(".pdf", Some("invoice"));
        assert!(prefixed.starts_with("invoice-"));

        let empty_prefix = ArtifactStore::generate_filename(".pdf", Some(""));
        assert!(!empty_prefix.starts_with('-'));
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = ArtifactStore::generate_filename(".pdf", None);
        let b = ArtifactStore::generate_filename(".pdf", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_pdf_save_request() {
        let request = SaveRequest::pdf().with_filename("x.pdf");
        assert_eq!(request.filename.as_deref(), Some("x.pdf"));
        assert_eq!(request.category.as_deref(), Some("pdf"));
        assert_eq!(request.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_facade_rejects_traversal_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new(dir.path())));

        assert!(matches!(
            store.get_file("../secret").await,
            Err(StorageError::InvalidFilename(_))
        ));
        assert!(matches!(
            store.delete_file("a/b").await,
            Err(StorageError::InvalidFilename(_))
        ));
    }

    #[tokio::test]
    async fn test_save_uploaded_file_keeps_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new(dir.path())));
        store.init().await.unwrap();

        let info = store
            .save_uploaded_file(Bytes::from_static(b"<p>hi</p>"), "page.htm", SaveRequest::default())
            .await
            .unwrap();

        assert!(info.filename.ends_with(".htm"));
        assert_eq!(info.category, "upload");
        assert_eq!(info.metadata.get("original_name").map(String::as_str), Some("page.htm"));
        assert!(info.metadata.contains_key("uploaded_at"));
    }

    #[tokio::test]
    async fn test_save_file_defaults_to_general() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new(dir.path())));

        let request = SaveRequest {
            category: None,
            ..SaveRequest::pdf()
        };
        let info = store.save_file(Bytes::from_static(b"%PDF"), request).await.unwrap();
        assert_eq!(info.category, "general");
        assert!(store.file_exists(&info.filename).await.unwrap());
    }
}
