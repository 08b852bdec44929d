//! Rating Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::artwork::not_blank;
use crate::error::AppResult;
use crate::util::serde_helpers;

/// Rating entity (`ratings` table)
///
/// At most one row per (artwork_id, user_id); writes are upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(deserialize_with = "serde_helpers::id")]
    pub id: String,
    #[serde(deserialize_with = "serde_helpers::id")]
    pub artwork_id: String,
    pub user_id: String,
    /// 1-5 stars
    pub rating: u8,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rating {
    /// Whether this row belongs to the given (artwork, user) pair
    pub fn is_for(&self, artwork_id: &str, user_id: &str) -> bool {
        self.artwork_id == artwork_id && self.user_id == user_id
    }
}

/// Upsert payload, conflict key (artwork_id, user_id)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RatingUpsert {
    #[validate(custom(function = "not_blank"))]
    pub artwork_id: String,
    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
}

impl RatingUpsert {
    pub fn validate_fields(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    pub fn to_rating(&self, id: String, now: DateTime<Utc>) -> Rating {
        Rating {
            id,
            artwork_id: self.artwork_id.clone(),
            user_id: self.user_id.clone(),
            rating: self.rating,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Average of the given ratings, rounded to one decimal; 0 when empty
pub fn average_rating<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> f64 {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(s, c), r| (s + r.rating as u64, c + 1));
    if count == 0 {
        return 0.0;
    }
    ((sum as f64 / count as f64) * 10.0).round() / 10.0
}
