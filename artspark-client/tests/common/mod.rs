#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use artspark_client::models::{
    Artwork, ArtworkCreate, ArtworkImage, ArtworkUpdate, ContactMessage, ContactMessageCreate,
    Profile, ProfileRole, Rating, RatingUpsert, Review, ReviewCreate, ReviewUpdate,
};
use artspark_client::{
    BackendKind, ClientConfig, ClientError, ClientResult, DataLayer, Gateways, Identity,
    LocalGateway, LocalStore, StoreGateway,
};
use async_trait::async_trait;

pub const ADMIN_ID: &str = "admin-1";
pub const ADMIN_EMAIL: &str = "atelier@artspark.ma";

pub fn admin_identity() -> Identity {
    Identity::new(ADMIN_ID, ADMIN_EMAIL)
}

pub fn visitor_identity() -> Identity {
    Identity::new("visitor-1", "visiteur@example.ma")
}

/// Local-only config rooted at `dir`
pub fn local_config(dir: &Path) -> ClientConfig {
    ClientConfig::new(dir).with_bootstrap_timeout(Duration::from_millis(500))
}

/// Write the admin profile row into the on-device profiles collection
pub fn seed_admin_profile(dir: &Path) {
    let store = LocalStore::open(dir).unwrap();
    LocalGateway::new(store)
        .mirror(&[
            Profile {
                id: ADMIN_ID.into(),
                email: ADMIN_EMAIL.into(),
                role: ProfileRole::Admin,
            },
            Profile {
                id: "visitor-1".into(),
                email: "visiteur@example.ma".into(),
                role: ProfileRole::User,
            },
        ])
        .unwrap();
}

pub async fn local_admin_layer(dir: &Path) -> DataLayer {
    seed_admin_profile(dir);
    let layer = DataLayer::connect(local_config(dir), Some(admin_identity()))
        .await
        .unwrap();
    assert!(layer.session().is_admin());
    layer
}

pub fn artwork(title: &str, category: &str) -> ArtworkCreate {
    ArtworkCreate::new(title, category, format!("{} sur papier", title))
}

pub fn review(artwork_id: &str, rating: u8) -> ReviewCreate {
    ReviewCreate {
        artwork_id: artwork_id.into(),
        user_name: "Yasmine".into(),
        user_email: "yasmine@example.ma".into(),
        rating,
        comment: "Très belle lumière".into(),
    }
}

pub fn contact_message() -> ContactMessageCreate {
    ContactMessageCreate {
        name: "Karim".into(),
        email: "karim@example.ma".into(),
        subject: Some("Commande".into()),
        message: "L'aquarelle est-elle encore disponible ?".into(),
    }
}

/// Local gateway posing as the remote store, with a switch to make every
/// call fail as unreachable and optional delays on artwork reads and
/// profile lookups.
#[derive(Debug)]
pub struct FlakyGateway {
    inner: Arc<LocalGateway>,
    failing: AtomicBool,
    profile_delay_ms: AtomicU64,
    artwork_delay_ms: AtomicU64,
    artwork_fetches: AtomicUsize,
}

impl FlakyGateway {
    pub fn new(inner: Arc<LocalGateway>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            profile_delay_ms: AtomicU64::new(0),
            artwork_delay_ms: AtomicU64::new(0),
            artwork_fetches: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &LocalGateway {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_profile_delay(&self, delay: Duration) {
        self.profile_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_artwork_delay(&self, delay: Duration) {
        self.artwork_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `fetch_artworks` calls so far
    pub fn artwork_fetches(&self) -> usize {
        self.artwork_fetches.load(Ordering::SeqCst)
    }

    fn check(&self) -> ClientResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ClientError::RemoteUnavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreGateway for FlakyGateway {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn fetch_artworks(&self) -> ClientResult<Vec<Artwork>> {
        self.artwork_fetches.fetch_add(1, Ordering::SeqCst);
        // read now, answer late: the reply predates anything written meanwhile
        let artworks = match self.check() {
            Ok(()) => self.inner.fetch_artworks().await,
            Err(e) => Err(e),
        };
        let delay = self.artwork_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        artworks
    }

    async fn create_artwork(&self, fields: &ArtworkCreate) -> ClientResult<Artwork> {
        self.check()?;
        self.inner.create_artwork(fields).await
    }

    async fn update_artwork(&self, id: &str, update: &ArtworkUpdate) -> ClientResult<Artwork> {
        self.check()?;
        self.inner.update_artwork(id, update).await
    }

    async fn delete_artwork(&self, id: &str) -> ClientResult<()> {
        self.check()?;
        self.inner.delete_artwork(id).await
    }

    async fn increment_views(&self, id: &str) -> ClientResult<()> {
        self.check()?;
        self.inner.increment_views(id).await
    }

    async fn upload_image(
        &self,
        artwork_id: &str,
        image_url: &str,
        display_order: i32,
    ) -> ClientResult<ArtworkImage> {
        self.check()?;
        self.inner
            .upload_image(artwork_id, image_url, display_order)
            .await
    }

    async fn fetch_reviews(&self) -> ClientResult<Vec<Review>> {
        self.check()?;
        self.inner.fetch_reviews().await
    }

    async fn create_review(&self, review: &ReviewCreate) -> ClientResult<Review> {
        self.check()?;
        self.inner.create_review(review).await
    }

    async fn update_review(&self, id: &str, update: &ReviewUpdate) -> ClientResult<Review> {
        self.check()?;
        self.inner.update_review(id, update).await
    }

    async fn increment_helpful(&self, id: &str) -> ClientResult<Review> {
        self.check()?;
        self.inner.increment_helpful(id).await
    }

    async fn delete_review(&self, id: &str) -> ClientResult<()> {
        self.check()?;
        self.inner.delete_review(id).await
    }

    async fn fetch_ratings(&self) -> ClientResult<Vec<Rating>> {
        self.check()?;
        self.inner.fetch_ratings().await
    }

    async fn upsert_rating(&self, rating: &RatingUpsert) -> ClientResult<Rating> {
        self.check()?;
        self.inner.upsert_rating(rating).await
    }

    async fn delete_rating(&self, id: &str) -> ClientResult<()> {
        self.check()?;
        self.inner.delete_rating(id).await
    }

    async fn fetch_contact_messages(&self) -> ClientResult<Vec<ContactMessage>> {
        self.check()?;
        self.inner.fetch_contact_messages().await
    }

    async fn create_contact_message(
        &self,
        message: &ContactMessageCreate,
    ) -> ClientResult<ContactMessage> {
        self.check()?;
        self.inner.create_contact_message(message).await
    }

    async fn mark_message_read(&self, id: &str) -> ClientResult<ContactMessage> {
        self.check()?;
        self.inner.mark_message_read(id).await
    }

    async fn delete_contact_message(&self, id: &str) -> ClientResult<()> {
        self.check()?;
        self.inner.delete_contact_message(id).await
    }

    async fn fetch_profile(&self, user_id: &str) -> ClientResult<Option<Profile>> {
        let delay = self.profile_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check()?;
        self.inner.fetch_profile(user_id).await
    }
}

/// Layer over a [`FlakyGateway`] backed by `dir`, with a separate mirror
/// directory for offline reads.
pub async fn flaky_layer(
    dir: &Path,
    identity: Option<Identity>,
) -> (DataLayer, Arc<FlakyGateway>) {
    seed_admin_profile(dir);
    let store = LocalStore::open(dir).unwrap();
    let flaky = Arc::new(FlakyGateway::new(Arc::new(LocalGateway::new(store.clone()))));

    let mirror_store = LocalStore::open(dir.join("mirror")).unwrap();
    let gateways = Gateways::new(
        flaky.clone(),
        Some(Arc::new(LocalGateway::new(mirror_store))),
        store,
    );
    let layer = DataLayer::from_gateways(local_config(dir), gateways, identity).await;
    (layer, flaky)
}
