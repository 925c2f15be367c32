pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - core business entities and value objects
pub use domain::{
    // Value objects
    CacheKey,
    ObjectRef,
    // Models
    BulkImportReport,
    CacheStatus,
    CropAnchor,
    FitMode,
    ImportRequest,
    ImportResult,
    OutputFormat,
    Preset,
    PresignedUrl,
    TransformParams,
    TransformSpec,
    TransformedArtifact,
    UploadResult,
    // Errors
    ErrorKind,
    MediaError,
    MediaResult,
    StorageError,
    StorageResult,
    TransformError,
    TransformSpecError,
    ValidationError,
};

// Port types - interfaces for external systems
pub use ports::{BackendKind, ByteStream, CompletedPart, ImageTransformer, MediaService, StorageProvider};

// Service implementations - business logic
pub use services::{BulkImporter, IngestConfig, MediaServiceBuilder, MediaServiceImpl, TransformCache};

// Application factory and configuration
pub use app::{
    create_app_from_env, create_in_memory_app, create_s3_app, create_seaweedfs_app, AppBuilder,
    AppConfig, AppDependencies, AppError, AppServices, StorageBackend,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::{
    storage::{ChunkPolicy, FilerConfig, FilerStorage, S3Config, S3Storage},
    transform::RasterTransformer,
};

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        create_in_memory_app, AppBuilder, AppServices, ChunkPolicy, FilerStorage, ImageTransformer,
        ImportRequest, MediaService, MediaServiceImpl, ObjectRef, RasterTransformer, S3Storage,
        StorageProvider, TransformParams,
    };
}
