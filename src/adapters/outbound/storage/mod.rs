// Infrastructure error types
pub mod error;

// Shared chunked upload driver
pub mod chunked;

// Provider-specific implementations
pub mod s3;
pub mod seaweedfs;

// Re-export key types
pub use chunked::ChunkPolicy;
pub use error::StoreError;
pub use s3::{S3Config, S3Storage};
pub use seaweedfs::{FilerConfig, FilerStorage};
