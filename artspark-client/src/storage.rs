//! LocalStore - on-device key/value storage
//!
//! One pretty-printed JSON file per key under the data directory.
//! Writes go to a temporary file first and are renamed into place, so a
//! crash mid-write leaves the previous collection intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Artwork, ContactMessage, Profile, Rating, Review};

use crate::error::ClientResult;

/// Collections persisted by the fallback adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Artworks,
    Reviews,
    Ratings,
    ContactMessages,
    Profiles,
}

impl EntityKind {
    /// Storage key (kept stable so existing device data stays readable)
    pub fn key(self) -> &'static str {
        match self {
            EntityKind::Artworks => "artspark-artworks",
            EntityKind::Reviews => "artwork-reviews",
            EntityKind::Ratings => "artwork-ratings",
            EntityKind::ContactMessages => "contact-messages",
            EntityKind::Profiles => "profiles",
        }
    }
}

/// Entity types that live in a local collection
pub trait Stored: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;
}

impl Stored for Artwork {
    const KIND: EntityKind = EntityKind::Artworks;
}

impl Stored for Review {
    const KIND: EntityKind = EntityKind::Reviews;
}

impl Stored for Rating {
    const KIND: EntityKind = EntityKind::Ratings;
}

impl Stored for ContactMessage {
    const KIND: EntityKind = EntityKind::ContactMessages;
}

impl Stored for Profile {
    const KIND: EntityKind = EntityKind::Profiles;
}

/// Key → serialized value storage rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) the store directory
    pub fn open(root: impl Into<PathBuf>) -> ClientResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a whole collection; empty when nothing is stored yet
    pub fn load<T: DeserializeOwned>(&self, kind: EntityKind) -> ClientResult<Vec<T>> {
        Ok(self.get(kind.key())?.unwrap_or_default())
    }

    /// Overwrite a whole collection
    pub fn save<T: Serialize>(&self, kind: EntityKind, items: &[T]) -> ClientResult<()> {
        self.set(kind.key(), items)?;
        tracing::debug!(key = kind.key(), count = items.len(), "Collection saved");
        Ok(())
    }

    /// Read a single value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write a single value
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> ClientResult<()> {
        let content = serde_json::to_string_pretty(value)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove a key; missing keys are fine
    pub fn remove(&self, key: &str) -> ClientResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}
