//! In-memory response cache with lazy TTL expiry.
//!
//! Entries are only checked (and purged) when read. Nothing sweeps the map in the
//! background and there is no size bound.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<V> {
    payload: V,
    inserted_at: Instant,
}

pub struct ResponseCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

/// Deterministic cache key for a search. The keyword is trimmed and lowercased, so
/// "Economy " and "economy" share an entry; absent fields hash as empty.
pub fn key_for(keyword: Option<&str>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    let keyword = keyword.map(|k| k.trim().to_lowercase()).unwrap_or_default();
    let from = from.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    let to = to.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();

    let mut hasher = Sha256::new();
    for part in [keyword, from, to] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Returns the payload if it is younger than the TTL; a stale entry is removed.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) >= self.ttl {
            debug!(key, "cache entry expired");
            self.entries.remove(key);
            return None;
        }
        Some(entry.payload.clone())
    }

    pub fn put(&mut self, key: impl Into<String>, payload: V) {
        self.put_at(key, payload, Instant::now());
    }

    pub fn put_at(&mut self, key: impl Into<String>, payload: V, now: Instant) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                payload,
                inserted_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        // 5 minutes
        Self::new(300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_after_put_returns_payload() {
        let mut cache = ResponseCache::default();
        let now = Instant::now();
        cache.put_at("k", vec!["a".to_string(), "b".to_string()], now);
        assert_eq!(
            cache.get_at("k", now + Duration::from_secs(1)),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn expired_entry_is_purged_on_read() {
        let mut cache = ResponseCache::new(300);
        let now = Instant::now();
        cache.put_at("k", 42u32, now);

        assert_eq!(cache.get_at("k", now + Duration::from_secs(299)), Some(42));
        assert_eq!(cache.get_at("k", now + Duration::from_secs(300)), None);
        assert!(cache.is_empty());
        assert_eq!(cache.get_at("k", now + Duration::from_secs(301)), None);
    }

    #[test]
    fn put_refreshes_insertion_time() {
        let mut cache = ResponseCache::new(10);
        let now = Instant::now();
        cache.put_at("k", 1u8, now);
        cache.put_at("k", 2u8, now + Duration::from_secs(8));
        assert_eq!(cache.get_at("k", now + Duration::from_secs(15)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_key_is_absent() {
        let mut cache: ResponseCache<u8> = ResponseCache::default();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn key_is_normalized_and_distinguishes_fields() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1);
        let d31 = NaiveDate::from_ymd_opt(2024, 1, 31);

        assert_eq!(key_for(Some(" Economy "), d1, d31), key_for(Some("economy"), d1, d31));
        assert_ne!(key_for(Some("economy"), d1, None), key_for(Some("economy"), None, d1));
        assert_ne!(key_for(None, None, None), key_for(Some("economy"), None, None));
        assert_eq!(key_for(None, None, None).len(), 64);
    }
}
