use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    bulk_import::{BulkImporter, IngestConfig},
    stream_limit::limit_stream,
    transform_cache::TransformCache,
    upload_metadata::{capture_head, UploadMetadata, HEAD_CAPTURE_SIZE},
};
use crate::{
    domain::{
        errors::{MediaError, MediaResult, StorageError},
        models::{
            unique_upload_name, BulkImportReport, ImportRequest, PresignedUrl,
            TransformParams, TransformedArtifact, UploadResult,
        },
        value_objects::ObjectRef,
    },
    ports::{
        services::MediaService,
        storage::{ByteStream, StorageProvider},
        transform::ImageTransformer,
    },
};

/// Largest original accepted by `upload_original` unless configured (10 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Implementation of MediaService over a storage provider and a transform engine
#[derive(Clone)]
pub struct MediaServiceImpl {
    storage: Arc<dyn StorageProvider>,
    cache: TransformCache,
    importer: BulkImporter,
    max_upload_size: u64,
}

impl MediaServiceImpl {
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        transformer: Arc<dyn ImageTransformer>,
        max_upload_size: u64,
        ingest: IngestConfig,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            cache: TransformCache::new(storage.clone(), transformer),
            importer: BulkImporter::new(storage.clone(), ingest)?,
            storage,
            max_upload_size,
        })
    }

    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }
}

#[async_trait]
impl MediaService for MediaServiceImpl {
    async fn upload_original(&self, stream: ByteStream, filename: &str) -> MediaResult<UploadResult> {
        let logical_name = unique_upload_name(filename);
        let (stream, received) = limit_stream(stream, self.max_upload_size);
        let (stream, head) = capture_head(stream, HEAD_CAPTURE_SIZE);

        let object_ref = match self.storage.upload(stream, &logical_name).await {
            Ok(object_ref) => object_ref,
            Err(_) if received.load(Ordering::Relaxed) > self.max_upload_size => {
                return Err(MediaError::PayloadTooLarge {
                    limit: self.max_upload_size,
                })
            }
            Err(err) => return Err(err.into()),
        };

        let size = received.load(Ordering::Relaxed);
        if size == 0 {
            if let Err(err) = self.storage.delete(&object_ref).await {
                warn!(object_ref = %object_ref, error = %err, "failed to remove empty upload");
            }
            return Err(MediaError::EmptyPayload);
        }

        let metadata = UploadMetadata::sniff(&head.bytes(), None, filename);
        info!(
            object_ref = %object_ref,
            size,
            content_type = %metadata.content_type,
            "uploaded original"
        );
        Ok(UploadResult {
            internal_url: self.storage.internal_url(&object_ref),
            public_url: self.storage.public_url(&object_ref),
            width: metadata.width(),
            height: metadata.height(),
            content_type: metadata.content_type,
            object_ref,
            size,
        })
    }

    async fn fetch_transformed(
        &self,
        source: &ObjectRef,
        params: TransformParams,
    ) -> MediaResult<TransformedArtifact> {
        let spec = params.validate()?;
        self.cache.fetch(source, &spec).await
    }

    async fn delete_object(&self, object_ref: &ObjectRef) -> MediaResult<()> {
        self.storage.delete(object_ref).await?;
        Ok(())
    }

    async fn bulk_import_from_urls(
        &self,
        requests: Vec<ImportRequest>,
        max_bytes: u64,
    ) -> BulkImportReport {
        self.importer.import_all(requests, max_bytes).await
    }

    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration) -> MediaResult<PresignedUrl> {
        Ok(self.storage.presigned_url(object_ref, ttl).await?)
    }

    async fn health_check(&self) -> MediaResult<()> {
        Ok(self.storage.health_check().await?)
    }
}

/// Builder for MediaServiceImpl
#[derive(Default)]
pub struct MediaServiceBuilder {
    storage: Option<Arc<dyn StorageProvider>>,
    transformer: Option<Arc<dyn ImageTransformer>>,
    max_upload_size: Option<u64>,
    ingest: Option<IngestConfig>,
}

impl MediaServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn ImageTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn max_upload_size(mut self, max_upload_size: u64) -> Self {
        self.max_upload_size = Some(max_upload_size);
        self
    }

    pub fn ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = Some(ingest);
        self
    }

    pub fn build(self) -> Result<MediaServiceImpl, &'static str> {
        let storage = self.storage.ok_or("Storage is required")?;
        let transformer = self.transformer.ok_or("Transformer is required")?;

        MediaServiceImpl::new(
            storage,
            transformer,
            self.max_upload_size.unwrap_or(DEFAULT_MAX_UPLOAD_SIZE),
            self.ingest.unwrap_or_default(),
        )
        .map_err(|_| "Failed to build download client")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        adapters::outbound::{
            storage::{ChunkPolicy, S3Storage},
            transform::RasterTransformer,
        },
        ports::storage::bytes_stream,
    };

    fn service(max_upload_size: u64) -> MediaServiceImpl {
        MediaServiceBuilder::new()
            .storage(Arc::new(S3Storage::in_memory(ChunkPolicy::default())))
            .transformer(Arc::new(RasterTransformer::new()))
            .max_upload_size(max_upload_size)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_original_generates_unique_refs() {
        let service = service(1024);
        let a = service
            .upload_original(bytes_stream(Bytes::from_static(b"abc")), "cat photo.jpg")
            .await
            .unwrap();
        let b = service
            .upload_original(bytes_stream(Bytes::from_static(b"abc")), "cat photo.jpg")
            .await
            .unwrap();

        assert_ne!(a.object_ref, b.object_ref);
        assert!(a.object_ref.as_str().ends_with("-cat_photo.jpg"));
        assert_eq!(a.size, 3);
        assert_eq!(a.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_upload_original_rejects_oversize() {
        let service = service(4);
        let err = service
            .upload_original(bytes_stream(Bytes::from_static(b"too long")), "a.bin")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::PayloadTooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn test_upload_original_rejects_empty() {
        let service = service(4);
        let err = service
            .upload_original(bytes_stream(Bytes::new()), "a.bin")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyPayload));
    }

    #[tokio::test]
    async fn test_invalid_params_never_touch_storage() {
        let service = service(1024);
        let missing = ObjectRef::new("uploads/missing.jpg").unwrap();
        let params = TransformParams::builder().width(-5).build();
        let err = service.fetch_transformed(&missing, params).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidTransform(_)));
    }
}
