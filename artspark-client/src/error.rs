//! Client error types

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
///
/// Every context operation surfaces exactly one of these per user action.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Caller-supplied fields failed required-field/shape checks (never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced id does not exist upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or backing store unreachable
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Call exceeded its deadline; handled like `RemoteUnavailable`
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Caller lacks the role required for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Remote store rejected the request for another reason
    #[error("Remote store error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// On-device storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Unified error code for the presentation layer
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Validation(_) => ErrorCode::ValidationFailed,
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            ClientError::Timeout(_) => ErrorCode::Timeout,
            ClientError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ClientError::Remote { .. } => ErrorCode::InternalError,
            ClientError::InvalidResponse(_) => ErrorCode::InvalidRequest,
            ClientError::Config(_) => ErrorCode::ConfigError,
            ClientError::Storage(_) | ClientError::Serialization(_) => ErrorCode::StorageError,
        }
    }

    /// Store unreachable or too slow; reads may degrade to the local store
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ClientError::RemoteUnavailable(_) | ClientError::Timeout(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Whether the UI should offer a retry
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Same kind and text, for every caller that shared one failed call
    pub fn duplicate(&self) -> ClientError {
        match self {
            ClientError::Validation(m) => ClientError::Validation(m.clone()),
            ClientError::NotFound(m) => ClientError::NotFound(m.clone()),
            ClientError::RemoteUnavailable(m) => ClientError::RemoteUnavailable(m.clone()),
            ClientError::Timeout(m) => ClientError::Timeout(m.clone()),
            ClientError::PermissionDenied(m) => ClientError::PermissionDenied(m.clone()),
            ClientError::Remote { status, message } => ClientError::Remote {
                status: *status,
                message: message.clone(),
            },
            ClientError::InvalidResponse(m) => ClientError::InvalidResponse(m.clone()),
            ClientError::Config(m) => ClientError::Config(m.clone()),
            ClientError::Storage(e) => {
                ClientError::Storage(std::io::Error::new(e.kind(), e.to_string()))
            }
            ClientError::Serialization(e) => ClientError::InvalidResponse(e.to_string()),
        }
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::RequiredField
            | ErrorCode::ValueOutOfRange
            | ErrorCode::ImageOrderTaken => ClientError::Validation(err.message),
            ErrorCode::NotFound => ClientError::NotFound(err.message),
            ErrorCode::PermissionDenied => ClientError::PermissionDenied(err.message),
            ErrorCode::RemoteUnavailable => ClientError::RemoteUnavailable(err.message),
            ErrorCode::Timeout => ClientError::Timeout(err.message),
            ErrorCode::ConfigError => ClientError::Config(err.message),
            _ => ClientError::Remote {
                status: err.code.code(),
                message: err.message,
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            // connect/request/body errors: the store could not be reached
            ClientError::RemoteUnavailable(err.to_string())
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
