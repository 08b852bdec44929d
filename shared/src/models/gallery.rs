//! Gallery Model (derived, never persisted)

use serde::Serialize;

use super::Artwork;

/// Artworks of one category, recomputed from the artwork set on read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gallery {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub featured_image: String,
    pub description: String,
    /// All artworks in the category, available or not
    pub artwork_count: usize,
    /// Artworks currently available for sale
    pub available_count: usize,
    pub year: i32,
    pub artworks: Vec<Artwork>,
}

/// Category with its artwork count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}
