//! Profile Model

use serde::{Deserialize, Serialize};

/// Role stored on the `profiles` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    #[serde(alias = "ADMIN")]
    Admin,
    #[serde(other)]
    User,
}

/// Profile entity (`profiles` table), keyed by the identity provider's user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub role: ProfileRole,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }

    /// Case-insensitive email comparison
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}
