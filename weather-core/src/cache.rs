//! In-memory response cache with a uniform time-to-live.
//!
//! Entries are stamped with `tokio::time::Instant`, so tests can drive expiry
//! with a paused runtime clock. Expired entries are purged lazily when their
//! key is next read; there is no background sweep.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tokio::time::{Duration, Instant};

use crate::model::{CityMatch, Forecast, LiveConditions, Operation};

/// Cache key: operation namespace plus the normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub query: String,
}

impl CacheKey {
    pub fn new(operation: Operation, query: &str) -> Self {
        Self {
            operation,
            query: query.trim().to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation.as_str(), self.query)
    }
}

/// Decoded provider payload, one variant per key namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Forecast(Forecast),
    Live(LiveConditions),
    Cities(Vec<CityMatch>),
}

impl CachedPayload {
    pub fn into_forecast(self) -> Option<Forecast> {
        match self {
            CachedPayload::Forecast(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_live(self) -> Option<LiveConditions> {
        match self {
            CachedPayload::Live(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_cities(self) -> Option<Vec<CityMatch>> {
        match self {
            CachedPayload::Cities(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    /// `None` when the TTL is too large to represent; the entry never expires.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Unbounded cache: entries leave only by expiry.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: None,
        }
    }

    /// Cache holding at most `max_entries` keys. When full, expired entries are
    /// purged first and then the oldest stored entry is evicted.
    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: Some(max_entries.max(1)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();

        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn put(&mut self, key: K, value: V) {
        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.make_room(max);
            }
        }

        let stored_at = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at,
                expires_at: stored_at.checked_add(self.ttl),
            },
        );
    }

    /// Number of entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn make_room(&mut self, max: usize) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));

        while self.entries.len() >= max {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test(start_paused = true)]
    async fn get_after_put_returns_value() {
        let mut cache = TtlCache::new(TTL);
        cache.put("weather_Beijing".to_string(), 42);

        assert_eq!(cache.get(&"weather_Beijing".to_string()), Some(42));
        assert_eq!(cache.get(&"weather_Shanghai".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl_and_is_purged() {
        let mut cache = TtlCache::new(TTL);
        let key = "live_Beijing".to_string();
        cache.put(key.clone(), "sunny");

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert_eq!(cache.get(&key), Some("sunny"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn put_after_expiry_overwrites_with_fresh_ttl() {
        let mut cache = TtlCache::new(TTL);
        let key = "search_bei".to_string();
        cache.put(key.clone(), 1);

        tokio::time::advance(TTL).await;
        assert_eq!(cache.get(&key), None);

        cache.put(key.clone(), 2);
        tokio::time::advance(TTL / 2).await;
        assert_eq!(cache.get(&key), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_cache_keeps_every_live_key() {
        let mut cache = TtlCache::new(TTL);
        for i in 0..500 {
            cache.put(i, i);
        }

        assert_eq!(cache.len(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_cache_evicts_oldest_entry() {
        let mut cache = TtlCache::with_max_entries(TTL, 2);
        cache.put("a", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("b", 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_cache_prefers_purging_expired_entries() {
        let mut cache = TtlCache::with_max_entries(Duration::from_secs(10), 2);
        cache.put("old", 1);
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put("fresh", 2);
        tokio::time::advance(Duration::from_secs(6)).await;

        cache.put("new", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"fresh"), Some(2));
        assert_eq!(cache.get(&"new"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn overwriting_existing_key_does_not_evict() {
        let mut cache = TtlCache::with_max_entries(TTL, 2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_never_expires() {
        let mut cache = TtlCache::new(Duration::from_secs(u64::MAX));
        cache.put("weather_Beijing", 1);

        tokio::time::advance(Duration::from_secs(10 * 365 * 24 * 3600)).await;
        assert_eq!(cache.get(&"weather_Beijing"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_entries_survive_room_making() {
        let mut cache = TtlCache::with_max_entries(Duration::MAX, 2);
        cache.put("a", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("b", 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn cache_key_trims_query_and_renders_prefix() {
        let key = CacheKey::new(Operation::Forecast, "  Beijing ");

        assert_eq!(key.query, "Beijing");
        assert_eq!(key.to_string(), "weather_Beijing");
        assert_ne!(key, CacheKey::new(Operation::Live, "Beijing"));
    }

    #[test]
    fn payload_accessors_match_variant() {
        let payload = CachedPayload::Cities(vec![]);

        assert_eq!(payload.clone().into_cities(), Some(vec![]));
        assert_eq!(payload.clone().into_forecast(), None);
        assert_eq!(payload.into_live(), None);
    }
}
