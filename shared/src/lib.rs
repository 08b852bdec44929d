//! Shared types for the ArtSpark data layer
//!
//! Entity models for the hosted store tables (artworks, artwork_images,
//! reviews, ratings, contact_messages, profiles), their create/update
//! payloads, and the structured error taxonomy.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
