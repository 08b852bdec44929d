//! Unified error codes for the ArtSpark data layer
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 6xxx: Catalog errors
//! - 9xxx: System errors (remote store, local storage)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values so that the presentation layer can match on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 6xxx: Catalog ====================
    /// Image display order already used within the artwork
    ImageOrderTaken = 6002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Remote store unreachable
    RemoteUnavailable = 9003,
    /// Remote call exceeded its deadline
    Timeout = 9004,
    /// Local storage read/write failed
    StorageError = 9005,
    /// Backend configuration missing or invalid
    ConfigError = 9006,
}

impl ErrorCode {
    /// Numeric value of the code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            ErrorCode::PermissionDenied => "Permission denied",

            ErrorCode::ImageOrderTaken => "Image display order already used",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::RemoteUnavailable => "Remote store unavailable",
            ErrorCode::Timeout => "Request timed out",
            ErrorCode::StorageError => "Local storage error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }

    /// Whether the failing action may succeed if simply retried later.
    ///
    /// Validation failures are never retryable.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::RemoteUnavailable | ErrorCode::Timeout)
    }

    /// Whether this code describes a missing resource
    pub const fn is_not_found(&self) -> bool {
        matches!(self, ErrorCode::NotFound)
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            2001 => Ok(ErrorCode::PermissionDenied),

            6002 => Ok(ErrorCode::ImageOrderTaken),

            9001 => Ok(ErrorCode::InternalError),
            9003 => Ok(ErrorCode::RemoteUnavailable),
            9004 => Ok(ErrorCode::Timeout),
            9005 => Ok(ErrorCode::StorageError),
            9006 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
