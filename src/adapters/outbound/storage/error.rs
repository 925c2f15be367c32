use std::io;

use http::StatusCode;
use thiserror::Error as ThisError;

use crate::domain::errors::StorageError;

/// Infrastructure-level failures raised inside the storage adapters before
/// they are folded into the domain [`StorageError`].
#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {status} - {message}")]
    Http { status: StatusCode, message: String },

    #[error("Signing error: {0}")]
    Signing(String),
}

impl StoreError {
    /// Build an [`StoreError::Http`] from a response status and body excerpt
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        StoreError::Http {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: message.into(),
        }
    }
}

/// Convert object_store errors to domain storage errors
impl From<object_store::Error> for StorageError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StorageError::ObjectNotFound { key: path },
            object_store::Error::InvalidPath { source } => StorageError::InvalidObjectRef {
                reason: source.to_string(),
            },
            object_store::Error::NotSupported { source } => StorageError::BackendUnavailable {
                message: "operation not supported by backend".to_string(),
                source: Some(source.to_string()),
            },
            object_store::Error::JoinError { source } => StorageError::io(source.to_string()),
            other => StorageError::backend("object store operation failed", other),
        }
    }
}

/// Convert reqwest transport errors to domain storage errors
impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return StoreError::http(status.as_u16(), err.to_string()).into();
        }
        if err.is_timeout() {
            return StorageError::TimedOut {
                message: err.to_string(),
            };
        }
        if err.is_body() || err.is_decode() {
            return StorageError::io(format!("transfer interrupted: {}", err));
        }
        StorageError::backend("request to storage backend failed", err)
    }
}

/// Convert standard io::Error raised while reading a caller stream
impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => StorageError::TimedOut {
                message: err.to_string(),
            },
            _ => StorageError::io(err.to_string()),
        }
    }
}

/// Convert infrastructure StoreError to domain StorageError
impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ObjectStore(e) => e.into(),
            StoreError::Transport(e) => e.into(),
            StoreError::Io(e) => e.into(),
            StoreError::Http { status, message } => match status {
                StatusCode::NOT_FOUND => StorageError::ObjectNotFound { key: message },
                StatusCode::PAYLOAD_TOO_LARGE | StatusCode::INSUFFICIENT_STORAGE => {
                    StorageError::QuotaExceeded { message }
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::BackendUnavailable {
                    message: format!("credentials rejected ({})", status),
                    source: Some(message),
                },
                s if s.is_server_error() => StorageError::BackendUnavailable {
                    message: format!("backend answered {}", s),
                    source: Some(message),
                },
                s => StorageError::io(format!("backend answered {}: {}", s, message)),
            },
            StoreError::Signing(message) => StorageError::SigningFailure { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_path() {
        let err = object_store::Error::NotFound {
            path: "uploads/a.jpg".to_string(),
            source: "missing".into(),
        };
        match StorageError::from(err) {
            StorageError::ObjectNotFound { key } => assert_eq!(key, "uploads/a.jpg"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_http_status_mapping() {
        let quota: StorageError = StoreError::http(507, "disk full").into();
        assert!(matches!(quota, StorageError::QuotaExceeded { .. }));

        let down: StorageError = StoreError::http(503, "overloaded").into();
        assert!(down.is_retryable());

        let denied: StorageError = StoreError::http(403, "bad key").into();
        assert!(matches!(denied, StorageError::BackendUnavailable { .. }));

        let missing: StorageError = StoreError::http(404, "uploads/a.jpg").into();
        assert!(missing.is_not_found());

        let bad: StorageError = StoreError::http(400, "bad request").into();
        assert!(matches!(bad, StorageError::IoFailure { .. }));
    }

    #[test]
    fn test_stream_timeout_keeps_its_kind() {
        let stalled = io::Error::new(io::ErrorKind::TimedOut, "source went quiet");
        match StorageError::from(stalled) {
            StorageError::TimedOut { message } => assert_eq!(message, "source went quiet"),
            other => panic!("unexpected {:?}", other),
        }

        // the wording no longer matters, only the kind
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "timed out waiting");
        assert!(matches!(StorageError::from(reset), StorageError::IoFailure { .. }));
    }
}
