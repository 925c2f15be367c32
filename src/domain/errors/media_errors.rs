use http::StatusCode;
use thiserror::Error;

use super::{StorageError, TransformError, TransformSpecError, ValidationError};

/// Coarse classification callers use to decide between fixing input,
/// retrying later, or giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Transient,
    Internal,
}

/// Errors surfaced by the media service operations
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid transformation parameters: {0}")]
    InvalidTransform(#[from] TransformSpecError),

    #[error("invalid object reference: {0}")]
    InvalidObjectRef(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("payload too large: more than {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("payload is empty")]
    EmptyPayload,

    #[error("transform task failed: {0}")]
    TaskFailed(String),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::InvalidTransform(_)
            | MediaError::InvalidObjectRef(_)
            | MediaError::PayloadTooLarge { .. }
            | MediaError::EmptyPayload => ErrorKind::BadInput,
            MediaError::Transform(TransformError::DecodeFailure(_))
            | MediaError::Transform(TransformError::UnsupportedFormat(_))
            | MediaError::Transform(TransformError::OutputTooLarge { .. }) => ErrorKind::BadInput,
            MediaError::Transform(TransformError::EncodeFailure(_)) => ErrorKind::Internal,
            MediaError::Storage(err) => match err {
                StorageError::ObjectNotFound { .. } => ErrorKind::NotFound,
                StorageError::BackendUnavailable { .. } | StorageError::TimedOut { .. } => {
                    ErrorKind::Transient
                }
                StorageError::InvalidObjectRef { .. } => ErrorKind::BadInput,
                StorageError::QuotaExceeded { .. }
                | StorageError::IoFailure { .. }
                | StorageError::SigningFailure { .. } => ErrorKind::Internal,
            },
            MediaError::TaskFailed(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Status an HTTP front end should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            MediaError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            MediaError::Transform(TransformError::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            MediaError::Storage(StorageError::QuotaExceeded { .. }) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            _ => match self.kind() {
                ErrorKind::BadInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let not_found = MediaError::from(StorageError::ObjectNotFound {
            key: "uploads/a.jpg".to_string(),
        });
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert!(!not_found.is_retryable());

        let unavailable = MediaError::from(StorageError::backend("put failed", "connection reset"));
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let invalid = MediaError::from(TransformSpecError::new(vec![
            ValidationError::QualityOutOfRange(150),
        ]));
        assert_eq!(invalid.kind(), ErrorKind::BadInput);
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transform_errors_are_not_retryable() {
        let err = MediaError::from(TransformError::DecodeFailure("truncated".to_string()));
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert!(!err.is_retryable());

        let err = MediaError::from(TransformError::UnsupportedFormat("avif".to_string()));
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let err = MediaError::from(TransformError::OutputTooLarge {
            width: 16384,
            height: 3_276_800_000,
            max: 16384,
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
