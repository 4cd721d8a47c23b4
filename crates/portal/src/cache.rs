//! Read cache for roster and post listings.
//!
//! Both listings are read far more often than they change, so they are kept
//! in a `moka` cache with a configured TTL. Every mutation invalidates the
//! affected entry.
//!
//! Each key carries a generation that [`ListingCache::invalidate`] bumps.
//! A reader records the generation before loading from the store and hands
//! it back when storing the result; a load that overlapped an invalidation
//! is never left in the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use pharmaguard_core::{HealthPost, WeekSchedule};

/// Cache key for listings.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Roster,
    Posts,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Roster(Arc<Vec<WeekSchedule>>),
    Posts(Arc<Vec<HealthPost>>),
}

#[derive(Debug, Default)]
struct Generations {
    roster: AtomicU64,
    posts: AtomicU64,
}

impl Generations {
    const fn of(&self, key: CacheKey) -> &AtomicU64 {
        match key {
            CacheKey::Roster => &self.roster,
            CacheKey::Posts => &self.posts,
        }
    }
}

/// Shared listing cache.
#[derive(Clone)]
pub struct ListingCache {
    cache: Cache<CacheKey, CacheValue>,
    generations: Arc<Generations>,
}

impl ListingCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            generations: Arc::new(Generations::default()),
        }
    }

    /// Current generation of `key`. Read it before loading from the store.
    #[must_use]
    pub fn generation(&self, key: CacheKey) -> u64 {
        self.generations.of(key).load(Ordering::SeqCst)
    }

    pub async fn roster(&self) -> Option<Arc<Vec<WeekSchedule>>> {
        match self.cache.get(&CacheKey::Roster).await {
            Some(CacheValue::Roster(weeks)) => Some(weeks),
            _ => None,
        }
    }

    /// Store a roster loaded at `generation`.
    pub async fn put_roster(&self, weeks: Arc<Vec<WeekSchedule>>, generation: u64) {
        self.put(CacheKey::Roster, CacheValue::Roster(weeks), generation)
            .await;
    }

    pub async fn posts(&self) -> Option<Arc<Vec<HealthPost>>> {
        match self.cache.get(&CacheKey::Posts).await {
            Some(CacheValue::Posts(posts)) => Some(posts),
            _ => None,
        }
    }

    /// Store a post listing loaded at `generation`.
    pub async fn put_posts(&self, posts: Arc<Vec<HealthPost>>, generation: u64) {
        self.put(CacheKey::Posts, CacheValue::Posts(posts), generation)
            .await;
    }

    async fn put(&self, key: CacheKey, value: CacheValue, generation: u64) {
        if self.generation(key) != generation {
            debug!(?key, "Skipping cache fill from a superseded load");
            return;
        }
        self.cache.insert(key, value).await;
        // An invalidation may have landed between the check and the insert.
        if self.generation(key) != generation {
            self.cache.invalidate(&key).await;
        }
    }

    /// Drop one cached listing and supersede loads already in flight.
    pub async fn invalidate(&self, key: CacheKey) {
        self.generations.of(key).fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&key).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn weeks(label: &str) -> Arc<Vec<WeekSchedule>> {
        Arc::new(vec![WeekSchedule::new(label, Vec::new())])
    }

    #[tokio::test]
    async fn test_roster_put_and_invalidate() {
        let cache = ListingCache::new(Duration::from_secs(60));
        assert!(cache.roster().await.is_none());

        let loaded = weeks("01/01/24 au 07/01/24");
        cache
            .put_roster(loaded.clone(), cache.generation(CacheKey::Roster))
            .await;
        assert_eq!(cache.roster().await.unwrap(), loaded);
        assert!(cache.posts().await.is_none());

        cache.invalidate(CacheKey::Roster).await;
        assert!(cache.roster().await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_leaves_other_listing() {
        let cache = ListingCache::new(Duration::from_secs(60));
        cache
            .put_roster(Arc::new(Vec::new()), cache.generation(CacheKey::Roster))
            .await;
        cache
            .put_posts(Arc::new(Vec::new()), cache.generation(CacheKey::Posts))
            .await;
        cache.invalidate(CacheKey::Posts).await;
        assert!(cache.roster().await.is_some());
        assert!(cache.posts().await.is_none());
    }

    #[tokio::test]
    async fn test_load_overlapping_invalidation_is_not_cached() {
        let cache = ListingCache::new(Duration::from_secs(60));
        let generation = cache.generation(CacheKey::Roster);

        cache.invalidate(CacheKey::Roster).await;
        cache
            .put_roster(weeks("01/01/24 au 07/01/24"), generation)
            .await;
        assert!(cache.roster().await.is_none());

        let fresh = weeks("08/01/24 au 14/01/24");
        cache
            .put_roster(fresh.clone(), cache.generation(CacheKey::Roster))
            .await;
        assert_eq!(cache.roster().await.unwrap(), fresh);
    }

    #[tokio::test]
    async fn test_posts_generation_independent_of_roster() {
        let cache = ListingCache::new(Duration::from_secs(60));
        let generation = cache.generation(CacheKey::Posts);
        cache.invalidate(CacheKey::Roster).await;

        cache.put_posts(Arc::new(Vec::new()), generation).await;
        assert!(cache.posts().await.is_some());
    }
}
