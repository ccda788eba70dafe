use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use crate::data::types::{Listing, ListingQuery};

/// Cache key: (source scope, make, model), lower-cased so "Tesla" and
/// "tesla" share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: String,
    make: String,
    model: String,
}

impl CacheKey {
    pub fn for_query(scope: &str, query: &ListingQuery) -> Self {
        Self {
            scope: scope.to_lowercase(),
            make: query.make.trim().to_lowercase(),
            model: query
                .model
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase(),
        }
    }
}

struct CacheEntry {
    listings: Vec<Listing>,
    inserted: Instant,
    last_updated: DateTime<Utc>,
}

/// Process-wide TTL cache of the last successful aggregate per query key.
///
/// Entries are overwritten on every successful refresh and never explicitly
/// deleted; stale entries stay readable so a failed refresh can fall back to
/// the last good result. Constructed once per process and shared by
/// reference. Refreshes for the same key are serialized through a per-key
/// async mutex so concurrent misses trigger exactly one upstream fetch.
pub struct ListingCache {
    entries: DashMap<CacheKey, CacheEntry>,
    refresh_locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            refresh_locks: DashMap::new(),
            ttl,
        }
    }

    /// Listings and their refresh time if the entry is still within its TTL.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<(Vec<Listing>, DateTime<Utc>)> {
        self.entries.get(key).and_then(|entry| {
            if entry.inserted.elapsed() <= self.ttl {
                Some((entry.listings.clone(), entry.last_updated))
            } else {
                None
            }
        })
    }

    /// Last good listings regardless of age, for cache-fallback.
    pub fn get_stale(&self, key: &CacheKey) -> Option<(Vec<Listing>, DateTime<Utc>)> {
        self.entries
            .get(key)
            .map(|entry| (entry.listings.clone(), entry.last_updated))
    }

    pub fn insert(&self, key: CacheKey, listings: Vec<Listing>) {
        self.entries.insert(
            key,
            CacheEntry {
                listings,
                inserted: Instant::now(),
                last_updated: Utc::now(),
            },
        );
    }

    /// Per-key refresh lock. Hold it across the re-check + fetch + insert so
    /// concurrent misses for one key collapse into a single refresh.
    pub fn refresh_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
