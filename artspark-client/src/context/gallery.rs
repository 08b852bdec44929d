//! GalleryContext - galleries derived from the artwork cache
//!
//! A gallery is the set of artworks sharing a category. Nothing here is
//! persisted or fetched: every read derives from the current artwork
//! snapshot, memoized per artwork cache version.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use parking_lot::RwLock;
use shared::models::{Artwork, CategoryCount, Gallery};
use shared::util::slugify;

use super::ArtworkContext;

const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Galleries and category counts for one artwork snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryIndex {
    pub galleries: Vec<Gallery>,
    pub categories: Vec<CategoryCount>,
}

/// Description shown for a category's gallery
pub fn gallery_description(category: &str) -> String {
    let known = match category {
        "Portrait" => "Portraits expressifs capturant l'émotion et la personnalité",
        "Abstrait" => {
            "Collection d'œuvres abstraites explorant les textures et les formes organiques"
        }
        "Aquarelle" => "Œuvres délicates à l'aquarelle explorant la fluidité des couleurs",
        "Photographie" => "Photographies artistiques capturant l'essence des espaces",
        "Fusain" => "Études atmosphériques au fusain jouant avec les lumières et ombres",
        "Huile" => "Peintures à l'huile riches en texture et en profondeur",
        "Mixte" => "Techniques mixtes combinant différents médiums artistiques",
        other => {
            return format!(
                "Collection d'œuvres {} explorant les différentes techniques et styles",
                other.to_lowercase()
            );
        }
    };
    known.to_string()
}

/// Group artworks by category, in order of first appearance.
///
/// The first artwork of a group is its featured artwork: it provides the
/// cover image and the year (`current_year` when it has none).
pub fn build_galleries(artworks: &[Artwork], current_year: i32) -> GalleryIndex {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Artwork>> = HashMap::new();

    for artwork in artworks {
        let category = artwork.category.trim();
        if category.is_empty() {
            continue;
        }
        groups
            .entry(category)
            .or_insert_with(|| {
                order.push(category);
                Vec::new()
            })
            .push(artwork);
    }

    let mut index = GalleryIndex::default();
    for category in order {
        let members = &groups[category];
        let featured = members[0];
        let slug = slugify(category);

        index.categories.push(CategoryCount {
            category: category.to_string(),
            count: members.len(),
        });
        index.galleries.push(Gallery {
            id: slug.clone(),
            slug,
            name: category.to_string(),
            category: category.to_string(),
            featured_image: featured
                .primary_image()
                .unwrap_or(PLACEHOLDER_IMAGE)
                .to_string(),
            description: gallery_description(category),
            artwork_count: members.len(),
            available_count: members.iter().filter(|a| a.available).count(),
            year: featured.year.unwrap_or(current_year),
            artworks: members.iter().map(|a| (*a).clone()).collect(),
        });
    }
    index
}

#[derive(Debug)]
pub struct GalleryContext {
    artworks: Arc<ArtworkContext>,
    memo: RwLock<Option<(u64, Arc<GalleryIndex>)>>,
}

impl GalleryContext {
    pub fn new(artworks: Arc<ArtworkContext>) -> Self {
        Self {
            artworks,
            memo: RwLock::new(None),
        }
    }

    /// Index for the current artwork snapshot
    pub fn index(&self) -> Arc<GalleryIndex> {
        let cache = self.artworks.cache();
        let version = cache.version();

        if let Some((memo_version, index)) = self.memo.read().as_ref()
            && *memo_version == version
        {
            return index.clone();
        }

        let year = Utc::now().year();
        let (version, index) =
            cache.read_versioned(|items, version| (version, build_galleries(items, year)));
        let index = Arc::new(index);
        *self.memo.write() = Some((version, index.clone()));
        index
    }

    pub fn galleries(&self) -> Vec<Gallery> {
        self.index().galleries.clone()
    }

    pub fn categories(&self) -> Vec<CategoryCount> {
        self.index().categories.clone()
    }

    pub fn gallery_by_slug(&self, slug: &str) -> Option<Gallery> {
        self.index()
            .galleries
            .iter()
            .find(|g| g.slug == slug)
            .cloned()
    }

    pub fn gallery_by_category(&self, category: &str) -> Option<Gallery> {
        self.index()
            .galleries
            .iter()
            .find(|g| g.category == category)
            .cloned()
    }
}
