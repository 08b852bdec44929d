//! Contact Message Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::artwork::not_blank;
use crate::error::AppResult;
use crate::util::serde_helpers;

/// Contact message entity (`contact_messages` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(deserialize_with = "serde_helpers::id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Contact form submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContactMessageCreate {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub message: String,
}

impl ContactMessageCreate {
    pub fn validate_fields(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    pub fn to_message(&self, id: String, now: DateTime<Utc>) -> ContactMessage {
        ContactMessage {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.clone(),
            message: self.message.clone(),
            read: false,
            created_at: Some(now),
        }
    }
}
