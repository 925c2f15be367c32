/// Errors that can occur during storage operations
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Object not found
    ObjectNotFound { key: String },

    /// Backend could not be reached or rejected our credentials
    BackendUnavailable {
        message: String,
        source: Option<String>, // Store error as string to allow Clone
    },

    /// Backend refused the write for lack of space or size limits
    QuotaExceeded { message: String },

    /// Stream read/write failure mid-transfer
    IoFailure { message: String },

    /// A transfer stalled past its deadline
    TimedOut { message: String },

    /// Presigned URL could not be generated
    SigningFailure { message: String },

    /// Logical name is not a valid object reference
    InvalidObjectRef { reason: String },
}

impl StorageError {
    pub fn backend(message: impl Into<String>, source: impl std::fmt::Display) -> Self {
        StorageError::BackendUnavailable {
            message: message.into(),
            source: Some(source.to_string()),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        StorageError::IoFailure {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::ObjectNotFound { .. })
    }

    /// Only connectivity failures are worth retrying, and never internally
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::BackendUnavailable { .. })
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::ObjectNotFound { key } => {
                write!(f, "Object not found: {}", key)
            }
            StorageError::BackendUnavailable { message, source } => match source {
                Some(source) => write!(f, "Storage backend unavailable: {} ({})", message, source),
                None => write!(f, "Storage backend unavailable: {}", message),
            },
            StorageError::QuotaExceeded { message } => {
                write!(f, "Storage quota exceeded: {}", message)
            }
            StorageError::IoFailure { message } => {
                write!(f, "I/O failure during transfer: {}", message)
            }
            StorageError::TimedOut { message } => {
                write!(f, "Transfer timed out: {}", message)
            }
            StorageError::SigningFailure { message } => {
                write!(f, "Failed to sign URL: {}", message)
            }
            StorageError::InvalidObjectRef { reason } => {
                write!(f, "Invalid object reference: {}", reason)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
