//! RatingContext - one star rating per (artwork, user)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{Rating, RatingUpsert, average_rating};
use tokio::sync::watch;

use super::{Refresh, load_into};
use crate::cache::{CacheStatus, EntityCache, provisional_id};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::gateway::Gateways;
use crate::session::SessionContext;

#[derive(Debug)]
pub struct RatingContext {
    gateways: Gateways,
    session: Arc<SessionContext>,
    cache: EntityCache<Rating>,
}

impl RatingContext {
    pub fn new(config: &ClientConfig, gateways: Gateways, session: Arc<SessionContext>) -> Self {
        Self {
            gateways,
            session,
            cache: EntityCache::new("ratings", config.stale_after),
        }
    }

    pub fn cache(&self) -> &EntityCache<Rating> {
        &self.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.cache.subscribe()
    }

    pub async fn load(&self) -> ClientResult<()> {
        load_into(&self.cache, self.gateways.mirror.as_deref(), || {
            self.gateways.primary.fetch_ratings()
        })
        .await
    }

    /// Rate an artwork as the current user, replacing any earlier rating
    pub async fn add_rating(&self, artwork_id: &str, rating: u8) -> ClientResult<Rating> {
        let upsert = RatingUpsert {
            artwork_id: artwork_id.to_string(),
            user_id: self.session.user_key(),
            rating,
        };
        upsert.validate_fields()?;

        let existing = self.cache.read(|items| {
            items
                .iter()
                .find(|r| r.is_for(&upsert.artwork_id, &upsert.user_id))
                .map(|r| r.id.clone())
        });
        let pending = match existing {
            Some(id) => self.cache.apply_update(&id, |r| {
                r.rating = rating;
                r.updated_at = Some(Utc::now());
            }),
            None => self
                .cache
                .apply_insert(upsert.to_rating(provisional_id(), Utc::now())),
        };

        let stored = self
            .cache
            .run(
                pending,
                self.gateways.primary.upsert_rating(&upsert),
                |r: &Rating| Some(r.clone()),
            )
            .await?;

        tracing::debug!(artwork_id = %artwork_id, rating, "Rating stored");
        Ok(stored)
    }

    /// Mean rating of an artwork, one decimal; 0 when unrated
    pub fn average_rating(&self, artwork_id: &str) -> f64 {
        self.cache
            .read(|items| average_rating(items.iter().filter(|r| r.artwork_id == artwork_id)))
    }

    pub fn rating_count(&self, artwork_id: &str) -> usize {
        self.cache
            .read(|items| items.iter().filter(|r| r.artwork_id == artwork_id).count())
    }

    /// The current user's rating of an artwork
    pub fn user_rating(&self, artwork_id: &str) -> Option<u8> {
        let user = self.session.user_key();
        self.cache.read(|items| {
            items
                .iter()
                .find(|r| r.is_for(artwork_id, &user))
                .map(|r| r.rating)
        })
    }
}

#[async_trait]
impl Refresh for RatingContext {
    fn name(&self) -> &'static str {
        "ratings"
    }

    fn is_stale(&self) -> bool {
        self.cache.is_stale()
    }

    async fn refresh(&self) -> ClientResult<()> {
        self.load().await
    }
}
