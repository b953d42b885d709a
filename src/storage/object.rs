//! Object-store provider (S3 and compatible, or in-memory for tests).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};

use super::{
    ArtifactInfo, ArtifactMetadata, SaveOptions, StorageError, StorageProvider, StorageResult,
    validate_filename,
};

/// Stores artifacts as objects at the bucket root.
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    name: &'static str,
}

impl ObjectStoreProvider {
    /// S3 bucket via `AmazonS3Builder`.
    ///
    /// Credentials and endpoint are optional; when absent the builder's own
    /// defaults apply. A custom endpoint allows S3-compatible services.
    ///
    /// # Errors
    ///
    /// [`StorageError::Configuration`] if the client cannot be built.
    pub fn s3(
        bucket: &str,
        region: &str,
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region);

        if let Some(key) = access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Configuration(format!("S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            region: region.to_string(),
            name: "s3",
        })
    }

    /// Process-local in-memory store.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: "memory".to_string(),
            region: "local".to_string(),
            name: "memory",
        }
    }

    fn location(filename: &str) -> StorageResult<ObjectPath> {
        validate_filename(filename)?;
        Ok(ObjectPath::from(filename))
    }
}

fn map_not_found(filename: &str, e: object_store::Error) -> StorageError {
    match e {
        object_store::Error::NotFound { .. } => StorageError::NotFound(filename.to_string()),
        other => StorageError::ObjectStore(other),
    }
}

#[async_trait]
impl StorageProvider for ObjectStoreProvider {
    async fn init(&self) -> StorageResult<()> {
        log::info!(
            "Object storage provider initialized (bucket: {}, region: {})",
            self.bucket,
            self.region
        );
        Ok(())
    }

    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        options: &SaveOptions,
    ) -> StorageResult<ArtifactInfo> {
        let location = Self::location(filename)?;
        let size = content.len() as u64;

        let mut attributes = Attributes::new();
        if let Some(content_type) = &options.content_type {
            attributes.insert(Attribute::ContentType, content_type.clone().into());
        }
        let put = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(content), put)
            .await
            .map_err(|e| {
                log::error!("❌ Failed to put {} into {}: {}", filename, self.bucket, e);
                StorageError::ObjectStore(e)
            })?;

        log::debug!("Object stored: {}/{} ({} bytes)", self.bucket, filename, size);

        Ok(ArtifactInfo {
            filename: filename.to_string(),
            size,
            created_at: chrono::Utc::now(),
            category: options.category.clone(),
            content_type: options.content_type.clone(),
            provider: self.name.to_string(),
            location: self.url(filename),
            metadata: options.metadata.clone(),
        })
    }

    async fn get(&self, filename: &str) -> StorageResult<Bytes> {
        let location = Self::location(filename)?;
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_not_found(filename, e))?;
        Ok(result.bytes().await?)
    }

    async fn delete(&self, filename: &str) -> StorageResult<bool> {
        // Object stores treat deleting a missing key as success, so probe first.
        if !self.exists(filename).await? {
            return Ok(false);
        }
        let location = Self::location(filename)?;
        match self.store.delete(&location).await {
            Ok(()) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::ObjectStore(e)),
        }
    }

    async fn exists(&self, filename: &str) -> StorageResult<bool> {
        let location = Self::location(filename)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::ObjectStore(e)),
        }
    }

    async fn metadata(&self, filename: &str) -> StorageResult<ArtifactMetadata> {
        let location = Self::location(filename)?;
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| map_not_found(filename, e))?;

        // Object stores keep a single timestamp.
        Ok(ArtifactMetadata {
            filename: filename.to_string(),
            size: meta.size as u64,
            created_at: meta.last_modified,
            modified_at: meta.last_modified,
            location: self.url(filename),
        })
    }

    fn url(&self, filename: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, filename
        )
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for ObjectStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreProvider")
            .field("name", &self.name)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_options() -> SaveOptions {
        SaveOptions {
            category: "pdf".into(),
            content_type: Some("application/pdf".into()),
            ..SaveOptions::default()
        }
    }

    #[tokio::test]
    async fn test_roundtrip_through_memory() {
        let provider = ObjectStoreProvider::in_memory();
        provider.init().await.unwrap();

        let info = provider
            .save(Bytes::from_static(b"%PDF-1.7"), "doc.pdf", &pdf_options())
            .await
            .unwrap();
        assert_eq!(info.size, 8);
        assert_eq!(info.provider, "memory");

        assert!(provider.exists("doc.pdf").await.unwrap());
        assert_eq!(provider.get("doc.pdf").await.unwrap(), Bytes::from_static(b"%PDF-1.7"));
        assert_eq!(provider.metadata("doc.pdf").await.unwrap().size, 8);
    }

    #[tokio::test]
    async fn test_missing_object_contract() {
        let provider = ObjectStoreProvider::in_memory();

        assert!(!provider.exists("gone.pdf").await.unwrap());
        assert!(!provider.delete("gone.pdf").await.unwrap());
        assert!(matches!(
            provider.get("gone.pdf").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            provider.metadata("gone.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let provider = ObjectStoreProvider::in_memory();
        provider
            .save(Bytes::from_static(b"x"), "x.pdf", &pdf_options())
            .await
            .unwrap();

        assert!(provider.delete("x.pdf").await.unwrap());
        assert!(matches!(
            provider.get("x.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_public_url_format() {
        let provider =
            ObjectStoreProvider::s3("my-bucket", "eu-west-1", Some("AKIA"), Some("secret"), None)
                .unwrap();
        assert_eq!(
            provider.url("a.pdf"),
            "https://my-bucket.s3.eu-west-1.amazonaws.com/a.pdf"
        );
    }
}
