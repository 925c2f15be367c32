pub mod services;
pub mod storage;
pub mod transform;

// Re-export all port traits for convenience
pub use services::MediaService;
pub use storage::{BackendKind, ByteStream, CompletedPart, StorageProvider};
pub use transform::ImageTransformer;
