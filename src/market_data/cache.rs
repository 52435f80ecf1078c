//! TTL cache in front of rate-limited upstreams.
//!
//! Entries are keyed by `(venue, query)`. An expired entry is never served as
//! fresh but stays readable as the last known value when a refetch fails.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::models::Sourced;
use crate::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub venue: String,
    pub query: String,
}

impl CacheKey {
    pub fn new(venue: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            query: query.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.venue, self.query)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The entry for `key` if it is younger than the TTL at `now`.
    pub fn get_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry<V>> {
        self.get_any(key).filter(|entry| self.is_fresh(entry, now))
    }

    /// The entry for `key` regardless of age.
    pub fn get_any(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        self.lock().get(key).cloned()
    }

    pub fn insert_at(&self, key: CacheKey, value: V, fetched_at: DateTime<Utc>) {
        self.lock().insert(key, CacheEntry { value, fetched_at });
    }

    /// Serve `key` from cache while fresh, otherwise call `fetch`.
    ///
    /// A failed fetch falls back to the last known entry (marked stale). `None`
    /// means nothing was ever fetched for this key.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        clock: &dyn Clock,
        fetch: F,
    ) -> Option<Sourced<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let now = clock.now();
        if let Some(entry) = self.get_fresh(key, now) {
            debug!(key = %key, "cache hit");
            return Some(Sourced::live(entry.value, entry.fetched_at));
        }

        match fetch().await {
            Ok(value) => {
                let fetched_at = clock.now();
                self.insert_at(key.clone(), value.clone(), fetched_at);
                Some(Sourced::live(value, fetched_at))
            }
            Err(err) => {
                let last = self.get_any(key);
                warn!(
                    key = %key,
                    error = %err,
                    have_last_known = last.is_some(),
                    "fetch failed"
                );
                last.map(|entry| Sourced::cached(entry.value, entry.fetched_at))
            }
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return true;
        };
        now.signed_duration_since(entry.fetched_at) < ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::market_data::models::Origin;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn fresh_entries_skip_the_fetch() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        let clock = clock();
        let key = CacheKey::new("coingecko", "markets:30");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_fetch(&key, &clock, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(7)
                })
                .await
                .unwrap();
            assert_eq!(got.value, 7);
            assert_eq!(got.origin, Origin::Live);
            clock.advance(Duration::from_secs(10));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let clock = clock();
        let key = CacheKey::new("coinbase", "USD");

        cache.get_or_fetch(&key, &clock, || async { anyhow::Ok(1) }).await;
        clock.advance(Duration::from_secs(10));
        let got = cache.get_or_fetch(&key, &clock, || async { anyhow::Ok(2) }).await.unwrap();

        assert_eq!(got.value, 2);
        assert!(!got.stale);
    }

    #[tokio::test]
    async fn failed_fetch_serves_last_known_as_stale() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let clock = clock();
        let key = CacheKey::new("exchangerate-api", "USD/KRW");

        cache.get_or_fetch(&key, &clock, || async { anyhow::Ok(1380.0) }).await;
        let first_fetch = clock.now();
        clock.advance(Duration::from_secs(3600));

        let got = cache
            .get_or_fetch(&key, &clock, || async { Err::<f64, _>(anyhow!("503")) })
            .await
            .unwrap();
        assert_eq!(got.value, 1380.0);
        assert!(got.stale);
        assert_eq!(got.origin, Origin::Cached);
        assert_eq!(got.fetched_at, Some(first_fetch));
    }

    #[tokio::test]
    async fn failure_without_history_yields_nothing() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(10));
        let got = cache
            .get_or_fetch(&CacheKey::new("upbit", "listing"), &clock(), || async {
                Err::<u32, _>(anyhow!("timeout"))
            })
            .await;
        assert!(got.is_none());
    }

    #[test]
    fn keys_are_scoped_by_venue_and_query() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let now = clock().now();
        cache.insert_at(CacheKey::new("upbit", "listing"), 1, now);

        assert!(cache.get_fresh(&CacheKey::new("upbit", "listing"), now).is_some());
        assert!(cache.get_fresh(&CacheKey::new("binance", "listing"), now).is_none());
        assert!(cache.get_fresh(&CacheKey::new("upbit", "tickers"), now).is_none());
    }
}
