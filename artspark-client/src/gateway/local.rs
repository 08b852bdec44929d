//! On-device gateway
//!
//! Same shapes and merge rules as the hosted store, backed by
//! [`LocalStore`] collections. Every mutation is a read-modify-write of
//! one collection under `write_lock`.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Artwork, ArtworkCreate, ArtworkImage, ArtworkUpdate, ContactMessage, ContactMessageCreate,
    Profile, Rating, RatingUpsert, Review, ReviewCreate, ReviewUpdate,
};
use shared::util::snowflake_id;

use super::{BackendKind, StoreGateway};
use crate::error::{ClientError, ClientResult};
use crate::storage::{LocalStore, Stored};

#[derive(Debug)]
pub struct LocalGateway {
    store: LocalStore,
    write_lock: Mutex<()>,
}

impl LocalGateway {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Replace a local collection with rows read from the remote store
    pub fn mirror<T: Stored>(&self, items: &[T]) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        self.store.save(T::KIND, items)
    }

    /// Current contents of a local collection
    pub fn snapshot<T: Stored>(&self) -> ClientResult<Vec<T>> {
        self.store.load(T::KIND)
    }

    fn load<T: Stored>(&self) -> ClientResult<Vec<T>> {
        self.store.load(T::KIND)
    }

    fn save<T: Stored>(&self, items: &[T]) -> ClientResult<()> {
        self.store.save(T::KIND, items)
    }
}

/// Snowflake id not already in `taken`
fn fresh_id(taken: &HashSet<String>) -> String {
    loop {
        let id = snowflake_id().to_string();
        if !taken.contains(&id) {
            return id;
        }
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> Option<DateTime<Utc>>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl StoreGateway for LocalGateway {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn fetch_artworks(&self) -> ClientResult<Vec<Artwork>> {
        let mut artworks: Vec<Artwork> = self.load()?;
        for artwork in &mut artworks {
            artwork.sort_images();
        }
        newest_first(&mut artworks, |a| a.created_at);
        Ok(artworks)
    }

    async fn create_artwork(&self, fields: &ArtworkCreate) -> ClientResult<Artwork> {
        fields.validate_fields()?;

        let _guard = self.write_lock.lock();
        let mut artworks: Vec<Artwork> = self.load()?;

        let mut taken: HashSet<String> = artworks
            .iter()
            .flat_map(|a| std::iter::once(a.id.clone()).chain(a.images.iter().map(|i| i.id.clone())))
            .collect();
        let id = fresh_id(&taken);
        taken.insert(id.clone());

        let artwork = fields.to_artwork(id, Utc::now(), |_| {
            let image_id = fresh_id(&taken);
            taken.insert(image_id.clone());
            image_id
        });

        artworks.insert(0, artwork.clone());
        self.save(&artworks)?;

        tracing::debug!(id = %artwork.id, images = artwork.images.len(), "Artwork created locally");
        Ok(artwork)
    }

    async fn update_artwork(&self, id: &str, update: &ArtworkUpdate) -> ClientResult<Artwork> {
        update.validate_fields()?;

        let _guard = self.write_lock.lock();
        let mut artworks: Vec<Artwork> = self.load()?;
        let artwork = artworks
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", id)))?;

        artwork.apply(update);
        artwork.updated_at = Some(Utc::now());
        artwork.sort_images();
        let updated = artwork.clone();

        self.save(&artworks)?;
        Ok(updated)
    }

    async fn delete_artwork(&self, id: &str) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        let mut artworks: Vec<Artwork> = self.load()?;
        let before = artworks.len();
        // images are nested in the row and go with it
        artworks.retain(|a| a.id != id);
        if artworks.len() != before {
            self.save(&artworks)?;
        }
        Ok(())
    }

    async fn increment_views(&self, id: &str) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        let mut artworks: Vec<Artwork> = self.load()?;
        match artworks.iter_mut().find(|a| a.id == id) {
            Some(artwork) => {
                artwork.views += 1;
                self.save(&artworks)
            }
            None => {
                tracing::debug!(id = %id, "View increment for unknown artwork ignored");
                Ok(())
            }
        }
    }

    async fn upload_image(
        &self,
        artwork_id: &str,
        image_url: &str,
        display_order: i32,
    ) -> ClientResult<ArtworkImage> {
        let _guard = self.write_lock.lock();
        let mut artworks: Vec<Artwork> = self.load()?;
        let taken: HashSet<String> = artworks
            .iter()
            .flat_map(|a| a.images.iter().map(|i| i.id.clone()))
            .collect();

        let artwork = artworks
            .iter_mut()
            .find(|a| a.id == artwork_id)
            .ok_or_else(|| ClientError::NotFound(format!("artwork {}", artwork_id)))?;

        if artwork.images.iter().any(|i| i.display_order == display_order) {
            return Err(AppError::with_message(
                ErrorCode::ImageOrderTaken,
                format!("display order {} already used for artwork {}", display_order, artwork_id),
            )
            .with_detail("display_order", display_order)
            .into());
        }

        let now = Utc::now();
        let image = ArtworkImage {
            id: fresh_id(&taken),
            artwork_id: artwork_id.to_string(),
            image_url: image_url.to_string(),
            display_order,
            created_at: Some(now),
            updated_at: Some(now),
        };
        artwork.images.push(image.clone());
        artwork.sort_images();

        self.save(&artworks)?;
        Ok(image)
    }

    async fn fetch_reviews(&self) -> ClientResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self.load()?;
        newest_first(&mut reviews, |r| r.created_at);
        Ok(reviews)
    }

    async fn create_review(&self, review: &ReviewCreate) -> ClientResult<Review> {
        review.validate_fields()?;

        let _guard = self.write_lock.lock();
        let mut reviews: Vec<Review> = self.load()?;
        let taken: HashSet<String> = reviews.iter().map(|r| r.id.clone()).collect();
        let created = review.to_review(fresh_id(&taken), Utc::now());

        reviews.insert(0, created.clone());
        self.save(&reviews)?;
        Ok(created)
    }

    async fn update_review(&self, id: &str, update: &ReviewUpdate) -> ClientResult<Review> {
        let _guard = self.write_lock.lock();
        let mut reviews: Vec<Review> = self.load()?;
        let review = reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("review {}", id)))?;

        review.apply(update);
        review.updated_at = Some(Utc::now());
        let updated = review.clone();

        self.save(&reviews)?;
        Ok(updated)
    }

    async fn increment_helpful(&self, id: &str) -> ClientResult<Review> {
        let _guard = self.write_lock.lock();
        let mut reviews: Vec<Review> = self.load()?;
        let review = reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("review {}", id)))?;

        review.helpful_count += 1;
        review.updated_at = Some(Utc::now());
        let updated = review.clone();

        self.save(&reviews)?;
        Ok(updated)
    }

    async fn delete_review(&self, id: &str) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        let mut reviews: Vec<Review> = self.load()?;
        let before = reviews.len();
        reviews.retain(|r| r.id != id);
        if reviews.len() != before {
            self.save(&reviews)?;
        }
        Ok(())
    }

    async fn fetch_ratings(&self) -> ClientResult<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self.load()?;
        newest_first(&mut ratings, |r| r.created_at);
        Ok(ratings)
    }

    async fn upsert_rating(&self, rating: &RatingUpsert) -> ClientResult<Rating> {
        rating.validate_fields()?;

        let _guard = self.write_lock.lock();
        let mut ratings: Vec<Rating> = self.load()?;
        let now = Utc::now();

        let stored = match ratings
            .iter_mut()
            .find(|r| r.is_for(&rating.artwork_id, &rating.user_id))
        {
            Some(existing) => {
                existing.rating = rating.rating;
                existing.updated_at = Some(now);
                existing.clone()
            }
            None => {
                let taken: HashSet<String> = ratings.iter().map(|r| r.id.clone()).collect();
                let created = rating.to_rating(fresh_id(&taken), now);
                ratings.insert(0, created.clone());
                created
            }
        };

        self.save(&ratings)?;
        Ok(stored)
    }

    async fn delete_rating(&self, id: &str) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        let mut ratings: Vec<Rating> = self.load()?;
        let before = ratings.len();
        ratings.retain(|r| r.id != id);
        if ratings.len() != before {
            self.save(&ratings)?;
        }
        Ok(())
    }

    async fn fetch_contact_messages(&self) -> ClientResult<Vec<ContactMessage>> {
        let mut messages: Vec<ContactMessage> = self.load()?;
        newest_first(&mut messages, |m| m.created_at);
        Ok(messages)
    }

    async fn create_contact_message(
        &self,
        message: &ContactMessageCreate,
    ) -> ClientResult<ContactMessage> {
        message.validate_fields()?;

        let _guard = self.write_lock.lock();
        let mut messages: Vec<ContactMessage> = self.load()?;
        let taken: HashSet<String> = messages.iter().map(|m| m.id.clone()).collect();
        let created = message.to_message(fresh_id(&taken), Utc::now());

        messages.insert(0, created.clone());
        self.save(&messages)?;
        Ok(created)
    }

    async fn mark_message_read(&self, id: &str) -> ClientResult<ContactMessage> {
        let _guard = self.write_lock.lock();
        let mut messages: Vec<ContactMessage> = self.load()?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("contact message {}", id)))?;
        message.read = true;
        let updated = message.clone();

        self.save(&messages)?;
        Ok(updated)
    }

    async fn delete_contact_message(&self, id: &str) -> ClientResult<()> {
        let _guard = self.write_lock.lock();
        let mut messages: Vec<ContactMessage> = self.load()?;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() != before {
            self.save(&messages)?;
        }
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> ClientResult<Option<Profile>> {
        let profiles: Vec<Profile> = self.load()?;
        Ok(profiles.into_iter().find(|p| p.id == user_id))
    }
}
