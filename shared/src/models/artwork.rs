//! Artwork Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::{Validate, ValidationError};

use crate::error::AppResult;
use crate::util::serde_helpers;

fn default_true() -> bool {
    true
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Artwork entity (`artworks` table, with its `artwork_images` rows nested)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    #[serde(deserialize_with = "serde_helpers::id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub size: String,
    pub year: Option<i32>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub materials: BTreeSet<String>,
    pub technique: Option<String>,
    pub artist_name: Option<String>,
    /// Price in Moroccan dirham, display string as stored upstream
    pub price_mad: Option<String>,
    /// Price in euro, display string as stored upstream
    pub price_eur: Option<String>,
    pub reference: Option<String>,
    pub support: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    /// Legacy single-image column, used as cover when no images are attached
    pub image_url: Option<String>,
    #[serde(default)]
    pub views: i64,
    /// Ordered by `display_order`; the first entry is the cover
    #[serde(default, alias = "artwork_images")]
    pub images: Vec<ArtworkImage>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Artwork {
    /// Cover image: first attached image, else the legacy `image_url`
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(|img| img.image_url.as_str())
            .or(self.image_url.as_deref())
    }

    /// Sort attached images by display order (stable for equal orders)
    pub fn sort_images(&mut self) {
        self.images.sort_by_key(|img| img.display_order);
    }

    /// Next free display order for a new image
    pub fn next_display_order(&self) -> i32 {
        self.images
            .iter()
            .map(|img| img.display_order + 1)
            .max()
            .unwrap_or(0)
    }

    /// Merge a partial update into this artwork (images and counters untouched)
    pub fn apply(&mut self, update: &ArtworkUpdate) {
        if let Some(v) = &update.title {
            self.title = v.clone();
        }
        if let Some(v) = &update.description {
            self.description = v.clone();
        }
        if let Some(v) = &update.category {
            self.category = v.clone();
        }
        if let Some(v) = &update.size {
            self.size = v.clone();
        }
        if let Some(v) = update.year {
            self.year = Some(v);
        }
        if let Some(v) = update.available {
            self.available = v;
        }
        if let Some(v) = update.featured {
            self.featured = v;
        }
        if let Some(v) = &update.tags {
            self.tags = v.clone();
        }
        if let Some(v) = &update.materials {
            self.materials = v.clone();
        }
        if let Some(v) = &update.technique {
            self.technique = Some(v.clone());
        }
        if let Some(v) = &update.artist_name {
            self.artist_name = Some(v.clone());
        }
        if let Some(v) = &update.price_mad {
            self.price_mad = Some(v.clone());
        }
        if let Some(v) = &update.price_eur {
            self.price_eur = Some(v.clone());
        }
        if let Some(v) = &update.reference {
            self.reference = Some(v.clone());
        }
        if let Some(v) = &update.support {
            self.support = Some(v.clone());
        }
        if let Some(v) = &update.medium {
            self.medium = Some(v.clone());
        }
        if let Some(v) = &update.dimensions {
            self.dimensions = Some(v.clone());
        }
        if let Some(v) = &update.image_url {
            self.image_url = Some(v.clone());
        }
    }
}

/// Artwork image entity (`artwork_images` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkImage {
    #[serde(deserialize_with = "serde_helpers::id")]
    pub id: String,
    /// Owning artwork; images are deleted with it
    #[serde(default, deserialize_with = "serde_helpers::id")]
    pub artwork_id: String,
    pub image_url: String,
    /// Unique within the owning artwork
    #[serde(default)]
    pub display_order: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert row for `artwork_images`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkImageCreate {
    pub artwork_id: String,
    pub image_url: String,
    pub display_order: i32,
}

/// Create artwork payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ArtworkCreate {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(custom(function = "not_blank"))]
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub materials: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_mad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_eur: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Image URLs attached after the artwork row exists, in display order.
    /// Not part of the `artworks` row itself.
    #[serde(default, skip_serializing)]
    pub images: Vec<String>,
}

impl ArtworkCreate {
    /// Minimal payload with the three required fields
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Attach image URLs (display order follows the given order)
    pub fn with_images<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Check required fields (title, category, description)
    pub fn validate_fields(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    /// Build the full entity the store would return, with the given ids.
    ///
    /// `image_id` maps an image position to its id.
    pub fn to_artwork(
        &self,
        id: String,
        now: DateTime<Utc>,
        mut image_id: impl FnMut(usize) -> String,
    ) -> Artwork {
        let images = self
            .images
            .iter()
            .enumerate()
            .map(|(i, url)| ArtworkImage {
                id: image_id(i),
                artwork_id: id.clone(),
                image_url: url.clone(),
                display_order: i as i32,
                created_at: Some(now),
                updated_at: Some(now),
            })
            .collect();

        Artwork {
            id,
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            category: self.category.trim().to_string(),
            size: self.size.clone().unwrap_or_default(),
            year: self.year,
            available: self.available.unwrap_or(true),
            featured: self.featured.unwrap_or(false),
            tags: self.tags.clone(),
            materials: self.materials.clone(),
            technique: self.technique.clone(),
            artist_name: self.artist_name.clone(),
            price_mad: self.price_mad.clone(),
            price_eur: self.price_eur.clone(),
            reference: self.reference.clone(),
            support: self.support.clone(),
            medium: self.medium.clone(),
            dimensions: self.dimensions.clone(),
            image_url: self.image_url.clone(),
            views: 0,
            images,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Update artwork payload; only `Some` fields are sent upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtworkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_mad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_eur: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ArtworkUpdate {
    /// Availability-only update
    pub fn available(value: bool) -> Self {
        Self {
            available: Some(value),
            ..Default::default()
        }
    }

    /// Featured-flag-only update
    pub fn featured(value: bool) -> Self {
        Self {
            featured: Some(value),
            ..Default::default()
        }
    }

    /// Required fields may be changed but not blanked
    pub fn validate_fields(&self) -> AppResult<()> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
        ] {
            if let Some(v) = value
                && v.trim().is_empty()
            {
                return Err(crate::error::AppError::required(field));
            }
        }
        Ok(())
    }
}
