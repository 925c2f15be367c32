use thiserror::Error;

/// Failures of the image transform engine. None of these are retryable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("failed to encode transformed image: {0}")]
    EncodeFailure(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("resized image would be {width}x{height}, above the {max} pixel limit per side")]
    OutputTooLarge { width: u64, height: u64, max: u32 },
}

pub type TransformResult<T> = Result<T, TransformError>;
