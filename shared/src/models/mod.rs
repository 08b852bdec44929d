//! Data models
//!
//! One module per hosted store table, plus the derived gallery view.

pub mod artwork;
pub mod contact;
pub mod gallery;
pub mod profile;
pub mod rating;
pub mod review;

pub use artwork::{Artwork, ArtworkCreate, ArtworkImage, ArtworkImageCreate, ArtworkUpdate};
pub use contact::{ContactMessage, ContactMessageCreate};
pub use gallery::{CategoryCount, Gallery};
pub use profile::{Profile, ProfileRole};
pub use rating::{Rating, RatingUpsert, average_rating};
pub use review::{Review, ReviewCreate, ReviewRating, ReviewUpdate};
