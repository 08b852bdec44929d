//! Unified error system for the ArtSpark data layer
//!
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::required("title");
//! assert_eq!(err.code, ErrorCode::RequiredField);
//!
//! let err = AppError::not_found("artwork 42").with_detail("id", "42");
//! assert!(err.code.is_not_found());
//! ```

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
