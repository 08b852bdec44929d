//! Review Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::artwork::not_blank;
use crate::error::AppResult;
use crate::util::serde_helpers;

/// Review entity (`reviews` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "serde_helpers::id")]
    pub id: String,
    /// Artwork reference (not ownership)
    #[serde(deserialize_with = "serde_helpers::id")]
    pub artwork_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    /// 1-5 stars
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    /// Monotonic helpful-vote counter
    #[serde(default)]
    pub helpful_count: i64,
    /// Public views only show approved reviews
    #[serde(default)]
    pub approved: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Visitor review submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewCreate {
    #[validate(custom(function = "not_blank"))]
    pub artwork_id: String,
    #[validate(custom(function = "not_blank"))]
    pub user_name: String,
    #[validate(email)]
    pub user_email: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl ReviewCreate {
    pub fn validate_fields(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    /// Entity as stored: unapproved, no helpful votes yet
    pub fn to_review(&self, id: String, now: DateTime<Utc>) -> Review {
        Review {
            id,
            artwork_id: self.artwork_id.clone(),
            user_name: self.user_name.trim().to_string(),
            user_email: self.user_email.trim().to_lowercase(),
            rating: self.rating,
            comment: self.comment.clone(),
            helpful_count: 0,
            approved: false,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Review update (admin approval, helpful vote)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpful_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Review {
    pub fn apply(&mut self, update: &ReviewUpdate) {
        if let Some(v) = update.approved {
            self.approved = v;
        }
        if let Some(v) = update.helpful_count {
            // never goes backwards
            self.helpful_count = self.helpful_count.max(v);
        }
        if let Some(v) = &update.comment {
            self.comment = v.clone();
        }
    }
}

/// Rating summary computed from reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRating {
    pub average: f64,
    pub count: usize,
    /// Index 0 = one star, index 4 = five stars
    pub distribution: [usize; 5],
}

impl Default for ReviewRating {
    fn default() -> Self {
        Self {
            average: 0.0,
            count: 0,
            distribution: [0; 5],
        }
    }
}
