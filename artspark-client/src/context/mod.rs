//! Entity contexts
//!
//! Each context owns one [`EntityCache`](crate::cache::EntityCache) and is
//! the only writer to it. Views call context operations and subscribe to the
//! cache status; they never reach the gateway directly.

mod artwork;
mod contact;
mod gallery;
mod rating;
mod review;

pub use artwork::ArtworkContext;
pub use contact::ContactContext;
pub use gallery::{GalleryContext, GalleryIndex, build_galleries, gallery_description};
pub use rating::RatingContext;
pub use review::{Audience, ReviewContext, summarize_reviews};

use std::future::Future;

use async_trait::async_trait;

use crate::cache::{CacheEntity, EntityCache, LoadOutcome};
use crate::error::ClientResult;
use crate::gateway::LocalGateway;
use crate::storage::Stored;

/// A context whose data can go stale and be reloaded
#[async_trait]
pub trait Refresh: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_stale(&self) -> bool;

    /// Reload unconditionally
    async fn refresh(&self) -> ClientResult<()>;

    /// Reload only when stale
    async fn ensure_fresh(&self) -> ClientResult<()> {
        if self.is_stale() {
            tracing::debug!(context = self.name(), "Stale data, reloading");
            self.refresh().await
        } else {
            Ok(())
        }
    }
}

/// Fetches per load when local changes keep overtaking the result
const LOAD_ATTEMPTS: usize = 3;

/// Load a collection into `cache` through `fetch`.
///
/// Concurrent loads of the same cache share one run. A result overtaken by
/// a local change is fetched again, so a successful read always lands.
/// Successful reads are copied into `mirror`. When the store is unreachable
/// and the mirror holds data, that copy is served instead; the cache then
/// stays stale and keeps the error so the next check retries.
pub(crate) async fn load_into<T, F, Fut>(
    cache: &EntityCache<T>,
    mirror: Option<&LocalGateway>,
    fetch: F,
) -> ClientResult<()>
where
    T: CacheEntity + Stored,
    F: Fn() -> Fut,
    Fut: Future<Output = ClientResult<Vec<T>>>,
{
    cache
        .load_shared(move || async move {
            for attempt in 1..=LOAD_ATTEMPTS {
                if !fetch_once(cache, mirror, fetch()).await? {
                    return Ok(());
                }
                tracing::debug!(cache = cache.name(), attempt, "Load overtaken by a local change");
            }
            tracing::warn!(
                cache = cache.name(),
                "Local changes kept overtaking the load, leaving the cache stale"
            );
            Ok(())
        })
        .await
}

/// One fetch; `Ok(true)` when a mutation overtook it and it should be repeated
async fn fetch_once<T, Fut>(
    cache: &EntityCache<T>,
    mirror: Option<&LocalGateway>,
    fetch: Fut,
) -> ClientResult<bool>
where
    T: CacheEntity + Stored,
    Fut: Future<Output = ClientResult<Vec<T>>>,
{
    let ticket = cache.begin_load();

    match fetch.await {
        Ok(items) => {
            if let Some(mirror) = mirror
                && let Err(e) = mirror.mirror(&items)
            {
                tracing::warn!(cache = cache.name(), error = %e, "Failed to update local copy");
            }
            tracing::debug!(cache = cache.name(), count = items.len(), "Loaded");
            Ok(cache.finish_load(ticket, Ok(items)) == LoadOutcome::Overtaken)
        }
        Err(e) if e.is_unavailable() => {
            let offline = mirror
                .map(|m| m.snapshot::<T>())
                .transpose()
                .unwrap_or_else(|err| {
                    tracing::warn!(cache = cache.name(), error = %err, "Local copy unreadable");
                    None
                })
                .filter(|items| !items.is_empty());

            match offline {
                Some(items) => {
                    tracing::warn!(
                        cache = cache.name(),
                        count = items.len(),
                        error = %e,
                        "Store unreachable, serving local copy"
                    );
                    if cache.finish_load(ticket, Ok(items)) == LoadOutcome::Applied {
                        cache.invalidate();
                        cache.record_error(e.to_string());
                    }
                    Ok(false)
                }
                None => {
                    cache.finish_load(ticket, Err(e.to_string()));
                    Err(e)
                }
            }
        }
        Err(e) => {
            tracing::error!(cache = cache.name(), error = %e, "Load failed");
            cache.finish_load(ticket, Err(e.to_string()));
            Err(e)
        }
    }
}
