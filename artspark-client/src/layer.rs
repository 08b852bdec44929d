//! DataLayer - wires gateway, session, contexts and theme together
//!
//! One `DataLayer` per process. Views hold an `Arc<DataLayer>` and go
//! through the contexts; the refresh task reloads stale caches in the
//! background until the layer is dropped.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::context::{
    ArtworkContext, ContactContext, GalleryContext, RatingContext, Refresh, ReviewContext,
};
use crate::error::ClientResult;
use crate::gateway::{self, BackendKind, Gateways};
use crate::session::{BootstrapOutcome, Identity, SessionContext};
use crate::theme::{ResolvedTheme, ThemeStore};

#[derive(Debug)]
pub struct DataLayer {
    config: ClientConfig,
    gateways: Gateways,
    session: Arc<SessionContext>,
    artworks: Arc<ArtworkContext>,
    galleries: GalleryContext,
    reviews: ReviewContext,
    ratings: RatingContext,
    contact: ContactContext,
    theme: ThemeStore,
}

impl DataLayer {
    /// Select the backend, then bootstrap the session for `identity`.
    ///
    /// Bootstrap is bounded by `config.bootstrap_timeout`; past it the
    /// session starts anonymous and non-admin.
    pub async fn connect(config: ClientConfig, identity: Option<Identity>) -> ClientResult<Self> {
        let gateways = gateway::connect(&config)?;
        Ok(Self::from_gateways(config, gateways, identity).await)
    }

    /// Build on already selected gateways
    pub async fn from_gateways(
        config: ClientConfig,
        gateways: Gateways,
        identity: Option<Identity>,
    ) -> Self {
        let session = Arc::new(
            SessionContext::bootstrap(
                gateways.primary.as_ref(),
                identity,
                config.bootstrap_timeout,
            )
            .await,
        );
        tracing::info!(
            backend = %gateways.kind(),
            outcome = ?session.outcome(),
            "Data layer ready"
        );

        let artworks = Arc::new(ArtworkContext::new(
            &config,
            gateways.clone(),
            session.clone(),
        ));
        let galleries = GalleryContext::new(artworks.clone());
        let reviews = ReviewContext::new(&config, gateways.clone(), session.clone());
        let ratings = RatingContext::new(&config, gateways.clone(), session.clone());
        let contact = ContactContext::new(&config, gateways.clone(), session.clone());
        let theme = ThemeStore::load(gateways.store.clone(), ResolvedTheme::Light);

        Self {
            config,
            gateways,
            session,
            artworks,
            galleries,
            reviews,
            ratings,
            contact,
            theme,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    pub fn backend(&self) -> BackendKind {
        self.gateways.kind()
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn artworks(&self) -> &ArtworkContext {
        &self.artworks
    }

    pub fn galleries(&self) -> &GalleryContext {
        &self.galleries
    }

    pub fn reviews(&self) -> &ReviewContext {
        &self.reviews
    }

    pub fn ratings(&self) -> &RatingContext {
        &self.ratings
    }

    pub fn contact(&self) -> &ContactContext {
        &self.contact
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    /// Sign in another identity; caches are kept, the inbox is reloaded on
    /// the next refresh if the new session is admin.
    pub async fn sign_in(&self, identity: Identity) -> BootstrapOutcome {
        self.session
            .sign_in(
                self.gateways.primary.as_ref(),
                identity,
                self.config.bootstrap_timeout,
            )
            .await
    }

    pub fn sign_out(&self) {
        self.session.sign_out();
    }

    fn contexts(&self) -> [&dyn Refresh; 4] {
        [
            self.artworks.as_ref(),
            &self.reviews,
            &self.ratings,
            &self.contact,
        ]
    }

    /// Load every collection the session may read.
    ///
    /// All loads run even if one fails; the first failure is returned.
    pub async fn load_all(&self) -> ClientResult<()> {
        let (artworks, reviews, ratings) = tokio::join!(
            self.artworks.load(),
            self.reviews.load(),
            self.ratings.load()
        );
        let contact = if self.session.is_admin() {
            self.contact.load().await
        } else {
            Ok(())
        };

        let mut first_error = None;
        for (name, result) in [
            ("artworks", artworks),
            ("reviews", reviews),
            ("ratings", ratings),
            ("contact_messages", contact),
        ] {
            if let Err(e) = result {
                tracing::warn!(context = name, error = %e, "Initial load failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reload whatever is stale now
    pub async fn refresh_stale(&self) {
        for context in self.contexts() {
            if let Err(e) = context.ensure_fresh().await {
                tracing::warn!(context = context.name(), error = %e, "Refresh failed");
            }
        }
    }

    /// Reload stale caches every `config.refresh_interval` until the last
    /// strong reference to the layer is gone.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let layer: Weak<Self> = Arc::downgrade(self);
        let period = self.config.refresh_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(layer) = layer.upgrade() else {
                    tracing::debug!("Data layer dropped, stopping refresh task");
                    break;
                };
                layer.refresh_stale().await;
            }
        })
    }
}
