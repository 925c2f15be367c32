mod bulk_import;
mod media_service_impl;
mod stream_limit;
mod transform_cache;
mod upload_metadata;

pub use bulk_import::{
    derive_file_name, BulkImporter, ImportError, IngestConfig, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_IMPORT_CONCURRENCY,
};
pub use media_service_impl::{MediaServiceBuilder, MediaServiceImpl, DEFAULT_MAX_UPLOAD_SIZE};
pub use stream_limit::limit_stream;
pub use transform_cache::TransformCache;
pub use upload_metadata::{capture_head, CapturedHead, UploadMetadata, HEAD_CAPTURE_SIZE};
