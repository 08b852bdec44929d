//! Store gateway - the only path to the backing store.
//!
//! `StoreGateway` has two implementations:
//! - [`RemoteGateway`]: hosted relational store over its REST dialect
//! - [`LocalGateway`]: on-device collections with the same shapes and merge rules
//!
//! [`connect`] picks one of them once, from the resolved configuration.
//! Gateways never cache; that belongs to the contexts.

mod local;
mod remote;

pub use local::LocalGateway;
pub use remote::RemoteGateway;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use shared::models::{
    Artwork, ArtworkCreate, ArtworkImage, ArtworkUpdate, ContactMessage, ContactMessageCreate,
    Profile, Rating, RatingUpsert, Review, ReviewCreate, ReviewUpdate,
};

use crate::config::{Backend, ClientConfig};
use crate::error::ClientResult;
use crate::storage::LocalStore;

/// Which implementation sits behind a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Store operations used by the contexts.
///
/// Error contract shared by both implementations:
/// - `Validation` for missing required fields or a duplicate image order
/// - `NotFound` when updating an id that does not exist
/// - `RemoteUnavailable` / `Timeout` when the store cannot be reached
/// - deleting a missing id succeeds
#[async_trait]
pub trait StoreGateway: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    // ========== Artworks ==========

    /// All artworks, newest first, images sorted by display order
    async fn fetch_artworks(&self) -> ClientResult<Vec<Artwork>>;

    /// Create an artwork; payload images get display orders 0..N
    async fn create_artwork(&self, fields: &ArtworkCreate) -> ClientResult<Artwork>;

    async fn update_artwork(&self, id: &str, update: &ArtworkUpdate) -> ClientResult<Artwork>;

    /// Delete an artwork and its images
    async fn delete_artwork(&self, id: &str) -> ClientResult<()>;

    /// Increment the stored view counter by one
    async fn increment_views(&self, id: &str) -> ClientResult<()>;

    async fn upload_image(
        &self,
        artwork_id: &str,
        image_url: &str,
        display_order: i32,
    ) -> ClientResult<ArtworkImage>;

    // ========== Reviews ==========

    /// All reviews (approved or not), newest first
    async fn fetch_reviews(&self) -> ClientResult<Vec<Review>>;
    async fn create_review(&self, review: &ReviewCreate) -> ClientResult<Review>;
    async fn update_review(&self, id: &str, update: &ReviewUpdate) -> ClientResult<Review>;

    /// Add one to the stored helpful-vote counter, whatever the caller last saw
    async fn increment_helpful(&self, id: &str) -> ClientResult<Review>;

    async fn delete_review(&self, id: &str) -> ClientResult<()>;

    // ========== Ratings ==========

    async fn fetch_ratings(&self) -> ClientResult<Vec<Rating>>;

    /// Insert or replace the row keyed by (artwork_id, user_id)
    async fn upsert_rating(&self, rating: &RatingUpsert) -> ClientResult<Rating>;
    async fn delete_rating(&self, id: &str) -> ClientResult<()>;

    // ========== Contact messages ==========

    /// All messages, newest first
    async fn fetch_contact_messages(&self) -> ClientResult<Vec<ContactMessage>>;
    async fn create_contact_message(
        &self,
        message: &ContactMessageCreate,
    ) -> ClientResult<ContactMessage>;
    async fn mark_message_read(&self, id: &str) -> ClientResult<ContactMessage>;
    async fn delete_contact_message(&self, id: &str) -> ClientResult<()>;

    // ========== Profiles ==========

    /// Profile row of a user; `None` when the user has none
    async fn fetch_profile(&self, user_id: &str) -> ClientResult<Option<Profile>>;
}

/// The gateway selected at startup, plus the on-device pieces around it
#[derive(Debug, Clone)]
pub struct Gateways {
    /// Gateway every context operation goes through
    pub primary: Arc<dyn StoreGateway>,
    /// Local copy of the last successful remote reads, served when the
    /// remote store is unreachable. `None` in local mode.
    pub mirror: Option<Arc<LocalGateway>>,
    /// Device storage (theme preference and local collections)
    pub store: LocalStore,
}

impl Gateways {
    /// Assemble from parts (used to inject a custom primary gateway)
    pub fn new(
        primary: Arc<dyn StoreGateway>,
        mirror: Option<Arc<LocalGateway>>,
        store: LocalStore,
    ) -> Self {
        Self {
            primary,
            mirror,
            store,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.primary.kind()
    }
}

/// Select the gateway implementation for this process
pub fn connect(config: &ClientConfig) -> ClientResult<Gateways> {
    let store = LocalStore::open(&config.data_dir)?;

    match config.backend() {
        Backend::Remote { url, anon_key } => {
            let remote = RemoteGateway::new(&url, &anon_key, config.request_timeout)?;
            let mirror = config
                .offline_reads
                .then(|| Arc::new(LocalGateway::new(store.clone())));
            tracing::info!(url = %url, offline_reads = config.offline_reads, "Using remote store");
            Ok(Gateways::new(Arc::new(remote), mirror, store))
        }
        Backend::Local => {
            tracing::warn!(
                data_dir = %config.data_dir.display(),
                "Store credentials missing or placeholder, using on-device storage"
            );
            let local = Arc::new(LocalGateway::new(store.clone()));
            Ok(Gateways::new(local, None, store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connect_without_credentials_is_local() {
        let dir = TempDir::new().unwrap();
        let gateways = connect(&ClientConfig::new(dir.path())).unwrap();
        assert_eq!(gateways.kind(), BackendKind::Local);
        assert!(gateways.mirror.is_none());
    }

    #[test]
    fn test_connect_with_credentials_is_remote() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::new(dir.path()).with_store("http://127.0.0.1:9", "anon");
        let gateways = connect(&config).unwrap();
        assert_eq!(gateways.kind(), BackendKind::Remote);
        assert!(gateways.mirror.is_some());

        let gateways = connect(&config.with_offline_reads(false)).unwrap();
        assert!(gateways.mirror.is_none());
    }
}
