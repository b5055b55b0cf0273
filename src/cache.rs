//! Star count cache
//!
//! Entries live for [`STAR_TTL`] from the moment they were fetched and the
//! cache holds at most [`STAR_CAPACITY`] repositories, evicting the least
//! recently used one when full. Reads update recency but never extend an
//! entry's lifetime.

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use tracing::{debug, instrument, warn};

use crate::{
    client::GithubClient,
    clock::Clock,
    domain::STARS_UNAVAILABLE,
    id::RepositoryIdentity,
    rate_limit::RateLimitRefresh,
};

/// Maximum number of cached repositories
pub const STAR_CAPACITY: usize = 5000;

/// Time-to-live of a cached star count
pub const STAR_TTL: Duration = Duration::hours(24);

/// Star count and the moment it was fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub stars: i64,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(stars: i64, cached_at: DateTime<Utc>) -> Self {
        Self { stars, cached_at }
    }

    /// Check if this entry has outlived `ttl` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.cached_at) > ttl
    }
}

pub struct StarCache<C> {
    client: Arc<C>,
    clock: Arc<dyn Clock>,
    refresher: Arc<dyn RateLimitRefresh>,
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl<C: GithubClient> StarCache<C> {
    pub fn new(
        client: Arc<C>,
        clock: Arc<dyn Clock>,
        refresher: Arc<dyn RateLimitRefresh>,
    ) -> Self {
        Self::with_limits(client, clock, refresher, STAR_CAPACITY, STAR_TTL)
    }

    /// A capacity of zero is treated as one
    pub fn with_limits(
        client: Arc<C>,
        clock: Arc<dyn Clock>,
        refresher: Arc<dyn RateLimitRefresh>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            clock,
            refresher,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Star count for `identity`, from cache when fresh, otherwise from GitHub.
    ///
    /// Returns [`STARS_UNAVAILABLE`] when the fetch fails; failures are not
    /// cached, so the next call tries the network again. Concurrent misses
    /// for the same repository each issue their own request.
    #[instrument(skip(self, identity, token), fields(repo = %identity))]
    pub async fn get_star_count(&self, identity: &RepositoryIdentity, token: &str) -> i64 {
        let key = identity.cache_key();

        if let Some(stars) = self.lookup(&key) {
            debug!(stars, "Responding with cached star count");
            return stars;
        }

        let details = match self
            .client
            .get_repository_details(identity.owner(), identity.name(), token)
            .await
        {
            Ok(details) => details,
            Err(e) => {
                warn!(error = %e, "Failed to fetch repository details");
                return STARS_UNAVAILABLE;
            },
        };

        let Some(stars) = details.star_count() else {
            warn!("Repository details carried no usable stargazers_count");
            return STARS_UNAVAILABLE;
        };

        self.store(key, stars);
        debug!(stars, "GitHub responded with star count");

        self.refresher.spawn_refresh();
        stars
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }

        expired.len()
    }

    fn lookup(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        let mut entries = self.lock();

        if entries.peek(key)?.is_expired(now, self.ttl) {
            entries.pop(key);
            return None;
        }

        entries.get(key).map(|entry| entry.stars)
    }

    fn store(&self, key: String, stars: i64) {
        let entry = CacheEntry::new(stars, self.clock.now());
        let mut entries = self.lock();

        // `push` hands back the old pair when replacing, the evicted one otherwise
        let replacing = entries.contains(&key);
        if let Some((evicted, _)) = entries.push(key, entry)
            && !replacing
        {
            debug!(evicted = %evicted, "Evicted least recently used star count");
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
