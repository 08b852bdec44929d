//! ReviewContext - visitor reviews with admin moderation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{Review, ReviewCreate, ReviewRating, ReviewUpdate};
use tokio::sync::watch;

use super::{Refresh, load_into};
use crate::cache::{CacheStatus, EntityCache, provisional_id};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateways;
use crate::session::SessionContext;

/// Who is looking at reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Approved reviews only
    Public,
    /// Everything, including reviews awaiting approval
    Admin,
}

impl Audience {
    pub fn can_see(self, review: &Review) -> bool {
        match self {
            Audience::Public => review.approved,
            Audience::Admin => true,
        }
    }
}

/// Average (one decimal), count and star distribution of `reviews`
pub fn summarize_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> ReviewRating {
    let mut summary = ReviewRating::default();
    let mut total = 0u64;
    for review in reviews {
        if !(1..=5).contains(&review.rating) {
            continue;
        }
        summary.count += 1;
        summary.distribution[(review.rating - 1) as usize] += 1;
        total += review.rating as u64;
    }
    if summary.count > 0 {
        let average = total as f64 / summary.count as f64;
        summary.average = (average * 10.0).round() / 10.0;
    }
    summary
}

#[derive(Debug)]
pub struct ReviewContext {
    gateways: Gateways,
    session: Arc<SessionContext>,
    cache: EntityCache<Review>,
}

impl ReviewContext {
    pub fn new(config: &ClientConfig, gateways: Gateways, session: Arc<SessionContext>) -> Self {
        Self {
            gateways,
            session,
            cache: EntityCache::new("reviews", config.stale_after),
        }
    }

    pub fn cache(&self) -> &EntityCache<Review> {
        &self.cache
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheStatus> {
        self.cache.subscribe()
    }

    pub async fn load(&self) -> ClientResult<()> {
        load_into(&self.cache, self.gateways.mirror.as_deref(), || {
            self.gateways.primary.fetch_reviews()
        })
        .await
    }

    /// Audience of the current session
    pub fn audience(&self) -> Audience {
        if self.session.is_admin() {
            Audience::Admin
        } else {
            Audience::Public
        }
    }

    /// Reviews of an artwork visible to the current session, newest first
    pub fn artwork_reviews(&self, artwork_id: &str) -> Vec<Review> {
        let audience = self.audience();
        let mut reviews: Vec<Review> = self.cache.read(|items| {
            items
                .iter()
                .filter(|r| r.artwork_id == artwork_id && audience.can_see(r))
                .cloned()
                .collect()
        });
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }

    /// Rating summary over the reviews the current session can see
    pub fn artwork_rating(&self, artwork_id: &str) -> ReviewRating {
        let audience = self.audience();
        self.cache.read(|items| {
            summarize_reviews(
                items
                    .iter()
                    .filter(|r| r.artwork_id == artwork_id && audience.can_see(r)),
            )
        })
    }

    /// Reviews awaiting approval
    pub fn pending_reviews(&self) -> ClientResult<Vec<Review>> {
        self.session.require_admin()?;
        Ok(self
            .cache
            .read(|items| items.iter().filter(|r| !r.approved).cloned().collect()))
    }

    /// Submit a visitor review; it stays hidden from the public until approved
    pub async fn add_review(&self, review: ReviewCreate) -> ClientResult<Review> {
        review.validate_fields()?;

        let pending = self
            .cache
            .apply_insert(review.to_review(provisional_id(), Utc::now()));
        let created = self
            .cache
            .run(
                pending,
                self.gateways.primary.create_review(&review),
                |r: &Review| Some(r.clone()),
            )
            .await?;

        tracing::info!(id = %created.id, artwork_id = %created.artwork_id, "Review submitted");
        Ok(created)
    }

    pub async fn approve(&self, id: &str) -> ClientResult<Review> {
        self.session.require_admin()?;

        let update = ReviewUpdate {
            approved: Some(true),
            ..Default::default()
        };
        let pending = self.cache.apply_update(id, |r| r.apply(&update));
        self.cache
            .run(
                pending,
                self.gateways.primary.update_review(id, &update),
                |r: &Review| Some(r.clone()),
            )
            .await
    }

    /// Add one helpful vote to a review this session has loaded
    pub async fn mark_helpful(&self, id: &str) -> ClientResult<Review> {
        if self.cache.get(id).is_none() {
            return Err(ClientError::NotFound(format!("review {}", id)));
        }

        let pending = self.cache.apply_update(id, |r| r.helpful_count += 1);
        self.cache
            .run(
                pending,
                self.gateways.primary.increment_helpful(id),
                |r: &Review| Some(r.clone()),
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.session.require_admin()?;

        let pending = self.cache.apply_remove(id);
        self.cache
            .run(pending, self.gateways.primary.delete_review(id), |_| None)
            .await
    }
}

#[async_trait]
impl Refresh for ReviewContext {
    fn name(&self) -> &'static str {
        "reviews"
    }

    fn is_stale(&self) -> bool {
        self.cache.is_stale()
    }

    async fn refresh(&self) -> ClientResult<()> {
        self.load().await
    }
}
