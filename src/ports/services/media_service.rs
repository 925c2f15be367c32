use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{
        errors::MediaResult,
        models::{BulkImportReport, ImportRequest, PresignedUrl, TransformParams, TransformedArtifact, UploadResult},
        value_objects::ObjectRef,
    },
    ports::storage::ByteStream,
};

/// Port for the media operations exposed to inbound adapters.
/// Every operation is independent; implementations hold no per-request state.
#[async_trait]
pub trait MediaService: Send + Sync + 'static {
    /// Store an original under a generated unique name derived from `filename`
    async fn upload_original(&self, stream: ByteStream, filename: &str) -> MediaResult<UploadResult>;

    /// Serve a transformed derivative of `source`, through the cache unless
    /// `params.fresh` is set
    async fn fetch_transformed(
        &self,
        source: &ObjectRef,
        params: TransformParams,
    ) -> MediaResult<TransformedArtifact>;

    /// Delete an object. Absent objects are not an error.
    async fn delete_object(&self, object_ref: &ObjectRef) -> MediaResult<()>;

    /// Pull remote files into storage. Per-URL failures are reported in the
    /// result, never as an error of the whole batch.
    async fn bulk_import_from_urls(
        &self,
        requests: Vec<ImportRequest>,
        max_bytes: u64,
    ) -> BulkImportReport;

    /// Time-boxed direct access URL
    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration) -> MediaResult<PresignedUrl>;

    /// Probe the storage backend
    async fn health_check(&self) -> MediaResult<()>;
}
