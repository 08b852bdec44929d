//! ArtSpark Client - data-sync layer for the portfolio site
//!
//! Caches artworks, galleries, reviews, ratings and contact messages in
//! memory, applies mutations optimistically, and talks to either the hosted
//! store or on-device storage through one gateway interface.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod layer;
pub mod logger;
pub mod session;
pub mod storage;
pub mod theme;

pub use cache::{CacheStatus, EntityCache, LoadOutcome, LoadState};
pub use config::{Backend, ClientConfig};
pub use context::{
    ArtworkContext, Audience, ContactContext, GalleryContext, RatingContext, Refresh,
    ReviewContext,
};
pub use error::{ClientError, ClientResult};
pub use gateway::{BackendKind, Gateways, LocalGateway, RemoteGateway, StoreGateway};
pub use layer::DataLayer;
pub use session::{BootstrapOutcome, Identity, SessionContext};
pub use storage::{EntityKind, LocalStore};
pub use theme::{ResolvedTheme, ThemeMode, ThemeState, ThemeStore};

// Re-export shared models for convenience
pub use shared::models;
