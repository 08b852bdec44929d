//! ArtworkContext - artwork cache and admin mutations

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{Artwork, ArtworkCreate, ArtworkImage, ArtworkUpdate};
use tokio::sync::watch;

use super::{Refresh, load_into};
use crate::cache::{CacheStatus, EntityCache, provisional_id};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateways;
use crate::session::SessionContext;

#[derive(Debug)]
pub struct ArtworkContext {
    gateways: Gateways,
    session: Arc<SessionContext>,
    cache: EntityCache<Artwork>,
}

impl ArtworkContext {
    pub fn new(config: &ClientConfig, gateways: Gateways, session: Arc<SessionContext>) -> Self {
        Self {
            gateways,
            session,
            cache: EntityCache::new("artworks", config.stale_after),
        }
    }

    pub fn cache(&self) -> &EntityCache<Artwork> {
        &self.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.cache.subscribe()
    }

    pub async fn load(&self) -> ClientResult<()> {
        load_into(&self.cache, self.gateways.mirror.as_deref(), || {
            self.gateways.primary.fetch_artworks()
        })
        .await
    }

    // ========== Reads ==========

    pub fn artworks(&self) -> Vec<Artwork> {
        self.cache.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Artwork> {
        self.cache.get(id)
    }

    pub fn featured(&self) -> Vec<Artwork> {
        self.cache
            .read(|items| items.iter().filter(|a| a.featured).cloned().collect())
    }

    pub fn available(&self) -> Vec<Artwork> {
        self.cache
            .read(|items| items.iter().filter(|a| a.available).cloned().collect())
    }

    pub fn by_category(&self, category: &str) -> Vec<Artwork> {
        self.cache.read(|items| {
            items
                .iter()
                .filter(|a| a.category == category)
                .cloned()
                .collect()
        })
    }

    // ========== Admin mutations ==========

    /// Create an artwork; it shows up immediately under a provisional id
    pub async fn create(&self, fields: ArtworkCreate) -> ClientResult<Artwork> {
        self.session.require_admin()?;
        fields.validate_fields()?;

        let temp_id = provisional_id();
        let optimistic = fields.to_artwork(temp_id.clone(), Utc::now(), |i| {
            format!("{}-img-{}", temp_id, i)
        });
        let pending = self.cache.apply_insert(optimistic);

        let created = self
            .cache
            .run(
                pending,
                self.gateways.primary.create_artwork(&fields),
                |a: &Artwork| Some(a.clone()),
            )
            .await?;

        tracing::info!(id = %created.id, title = %created.title, "Artwork created");
        Ok(created)
    }

    pub async fn update(&self, id: &str, update: ArtworkUpdate) -> ClientResult<Artwork> {
        self.session.require_admin()?;
        update.validate_fields()?;

        let pending = self.cache.apply_update(id, |a| a.apply(&update));
        self.cache
            .run(
                pending,
                self.gateways.primary.update_artwork(id, &update),
                |a: &Artwork| Some(a.clone()),
            )
            .await
    }

    /// Delete an artwork; deleting an unknown id succeeds
    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.session.require_admin()?;

        let pending = self.cache.apply_remove(id);
        self.cache
            .run(pending, self.gateways.primary.delete_artwork(id), |_| None)
            .await?;
        tracing::info!(id = %id, "Artwork deleted");
        Ok(())
    }

    pub async fn toggle_available(&self, id: &str) -> ClientResult<Artwork> {
        let current = self
            .get(id)
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", id)))?;
        self.update(id, ArtworkUpdate::available(!current.available))
            .await
    }

    pub async fn toggle_featured(&self, id: &str) -> ClientResult<Artwork> {
        let current = self
            .get(id)
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", id)))?;
        self.update(id, ArtworkUpdate::featured(!current.featured))
            .await
    }

    /// Set `available` on every cached artwork; returns how many changed.
    ///
    /// Each artwork settles on its own. Failed ones are rolled back and the
    /// first error is returned after all were attempted.
    pub async fn set_all_available(&self, available: bool) -> ClientResult<usize> {
        self.session.require_admin()?;

        let update = ArtworkUpdate::available(available);
        let pending = self
            .cache
            .apply_update_where(|a| a.available != available, |a| a.available = available);

        let mut changed = 0;
        let mut first_error = None;
        for p in pending {
            let id = p.id().to_string();
            match self.gateways.primary.update_artwork(&id, &update).await {
                Ok(artwork) => {
                    self.cache.commit(p, Some(artwork));
                    changed += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Bulk availability update failed");
                    self.cache.rollback(p);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => {
                self.cache.record_error(e.to_string());
                Err(e)
            }
            None => {
                tracing::info!(available, changed, "Availability reset");
                Ok(changed)
            }
        }
    }

    /// Attach an image after the artwork's current last image
    pub async fn upload_image(&self, artwork_id: &str, image_url: &str) -> ClientResult<ArtworkImage> {
        self.session.require_admin()?;

        let order = self
            .get(artwork_id)
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", artwork_id)))?
            .next_display_order();
        let temp_id = provisional_id();

        let pending = self.cache.apply_update(artwork_id, |a| {
            a.images.push(ArtworkImage {
                id: temp_id.clone(),
                artwork_id: a.id.clone(),
                image_url: image_url.to_string(),
                display_order: order,
                created_at: None,
                updated_at: None,
            });
            a.sort_images();
        });

        self.cache
            .run(
                pending,
                self.gateways
                    .primary
                    .upload_image(artwork_id, image_url, order),
                |image: &ArtworkImage| {
                    let mut artwork = self.cache.get(artwork_id)?;
                    artwork.images.retain(|i| i.id != temp_id);
                    artwork.images.push(image.clone());
                    artwork.sort_images();
                    Some(artwork)
                },
            )
            .await
    }

    /// Count a view once per session.
    ///
    /// Returns `false` when this session already counted the artwork. On
    /// failure the count is rolled back and the marker cleared.
    pub async fn increment_views(&self, id: &str) -> ClientResult<bool> {
        if !self.session.mark_viewed(id) {
            return Ok(false);
        }

        let pending = self.cache.apply_update(id, |a| a.views += 1);
        let result = self
            .cache
            .run(pending, self.gateways.primary.increment_views(id), |_| None)
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                self.session.unmark_viewed(id);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Refresh for ArtworkContext {
    fn name(&self) -> &'static str {
        "artworks"
    }

    fn is_stale(&self) -> bool {
        self.cache.is_stale()
    }

    async fn refresh(&self) -> ClientResult<()> {
        self.load().await
    }
}
