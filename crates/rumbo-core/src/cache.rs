//! In-memory two-tier reading cache.
//!
//! One physical map backs both tiers. Every entry records when it was
//! captured; whether it counts as *fresh* or *stale* is decided at read time
//! by comparing its age against [`CachePolicy`]. Nothing is evicted in the
//! background: expired entries are ignored on read and overwritten by the
//! next successful fetch.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::{CoordinateBucket, Endpoint, NormalizedReading, UtcDateTime};

const FORECAST_SUFFIX: &str = "_forecast";

/// Age limits for the two cache tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub fresh_ttl: Duration,
    pub stale_ceiling: Duration,
}

impl CachePolicy {
    pub fn from_minutes_and_hours(fresh_minutes: u64, stale_hours: u64) -> Self {
        Self {
            fresh_ttl: Duration::from_secs(fresh_minutes.saturating_mul(60)),
            stale_ceiling: Duration::from_secs(stale_hours.saturating_mul(3_600)),
        }
    }

    pub const fn max_age(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Fresh => self.fresh_ttl,
            CacheTier::Stale => self.stale_ceiling,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_minutes_and_hours(30, 6)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Fresh,
    Stale,
}

/// Cache key: `lat,lon` for conditions, `lat,lon_forecast` for forecasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(bucket: CoordinateBucket, endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Conditions => Self(bucket.key()),
            Endpoint::Forecast => Self(format!("{}{FORECAST_SUFFIX}", bucket.key())),
        }
    }

    pub fn conditions(bucket: CoordinateBucket) -> Self {
        Self::new(bucket, Endpoint::Conditions)
    }

    pub fn forecast(bucket: CoordinateBucket) -> Self {
        Self::new(bucket, Endpoint::Forecast)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached payload: a single reading or an ordered forecast.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Conditions(NormalizedReading),
    Forecast(Vec<NormalizedReading>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CachedPayload,
    captured_at: UtcDateTime,
}

/// A cache read that satisfied a tier's age limit.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub payload: CachedPayload,
    pub captured_at: UtcDateTime,
    pub age: Duration,
}

/// Shared reading cache. Cloning shares the underlying map.
///
/// The lock is held only for a single get or insert, never across a provider
/// call; concurrent misses for one key both fetch and the last write wins.
#[derive(Debug, Clone, Default)]
pub struct WeatherCache {
    inner: Arc<tokio::sync::RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl WeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key` if it is younger than `max_age` at `now`.
    pub async fn lookup(
        &self,
        key: &CacheKey,
        max_age: Duration,
        now: UtcDateTime,
    ) -> Option<CacheHit> {
        let store = self.inner.read().await;
        let entry = store.get(key)?;
        let age = age_at(entry.captured_at, now);
        if age < max_age {
            Some(CacheHit {
                payload: entry.payload.clone(),
                captured_at: entry.captured_at,
                age,
            })
        } else {
            None
        }
    }

    /// Stores `payload` captured now, replacing any previous entry.
    pub async fn store(&self, key: CacheKey, payload: CachedPayload) {
        self.store_at(key, payload, UtcDateTime::now()).await;
    }

    /// Stores `payload` with an explicit capture time.
    pub async fn store_at(&self, key: CacheKey, payload: CachedPayload, captured_at: UtcDateTime) {
        let mut store = self.inner.write().await;
        store.insert(
            key,
            CacheEntry {
                payload,
                captured_at,
            },
        );
    }

    /// Raw entry regardless of age.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedPayload> {
        let store = self.inner.read().await;
        store.get(key).map(|entry| entry.payload.clone())
    }

    /// Drops every entry from both tiers.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
    }

    /// Number of entries, including ones too old for either tier.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// Entries stamped in the future count as brand new.
fn age_at(captured_at: UtcDateTime, now: UtcDateTime) -> Duration {
    let elapsed = now.since(captured_at);
    if elapsed.is_negative() {
        Duration::ZERO
    } else {
        elapsed.unsigned_abs()
    }
}
