//! Behavior-driven tests for the hybrid provider.
//!
//! These tests verify HOW the fallback chain and the two cache tiers interact:
//! which provider gets called, what gets cached and what is served when
//! upstreams misbehave.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rumbo_core::{
    CacheKey, CachePolicy, CachedPayload, Coordinates, Endpoint, HybridProvider, NormalizedReading,
    Origin, ProviderError, ProviderErrorKind, SourceFuture, TideState, UtcDateTime, WeatherCache,
    WeatherSource, Waves, Wind,
};

#[derive(Clone)]
enum Behavior {
    Reading { wind_kmh: Option<f64>, wave_m: Option<f64> },
    Fail(ProviderErrorKind),
}

/// Provider stub that records how often it was invoked.
struct StubSource {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubSource {
    fn healthy(name: &'static str) -> Arc<Self> {
        Self::reading(name, Some(14.0), Some(0.8))
    }

    fn reading(name: &'static str, wind_kmh: Option<f64>, wave_m: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior: Behavior::Reading { wind_kmh, wave_m },
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &'static str, kind: ProviderErrorKind) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior: Behavior::Fail(kind),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn produce(&self, at: UtcDateTime) -> Result<NormalizedReading, ProviderError> {
        match &self.behavior {
            Behavior::Reading { wind_kmh, wave_m } => Ok(NormalizedReading::new(
                at,
                self.name,
                TideState::Rising,
            )
            .with_wind(Wind {
                speed_kmh: *wind_kmh,
                direction_deg: Some(90.0),
                relative_direction: None,
            })
            .with_waves(Waves {
                height_m: *wave_m,
                period_s: Some(7.0),
                direction_deg: None,
            })),
            Behavior::Fail(ProviderErrorKind::NotConfigured) => {
                Err(ProviderError::not_configured(self.name))
            }
            Behavior::Fail(ProviderErrorKind::RateLimited) => Err(ProviderError::rate_limited(
                format!("{} quota exhausted", self.name),
            )),
            Behavior::Fail(_) => Err(ProviderError::unavailable(format!(
                "{} connection refused",
                self.name
            ))),
        }
    }
}

impl WeatherSource for StubSource {
    fn name(&self) -> &str {
        self.name
    }

    fn get_conditions<'a>(&'a self, _coords: Coordinates) -> SourceFuture<'a, NormalizedReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.produce(UtcDateTime::now().truncate_to_hour());
        Box::pin(async move { result })
    }

    fn get_forecast<'a>(
        &'a self,
        _coords: Coordinates,
        hours: usize,
    ) -> SourceFuture<'a, Vec<NormalizedReading>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = UtcDateTime::now().truncate_to_hour();
        let result = (0..hours as i64)
            .map(|offset| self.produce(start.plus_hours(offset)))
            .collect::<Result<Vec<_>, _>>();
        Box::pin(async move { result })
    }
}

fn hybrid(sources: &[Arc<StubSource>], cache: WeatherCache) -> HybridProvider {
    HybridProvider::builder()
        .with_sources(
            sources
                .iter()
                .map(|source| source.clone() as Arc<dyn WeatherSource>)
                .collect(),
        )
        .with_cache(cache)
        .with_policy(CachePolicy::from_minutes_and_hours(30, 6))
        .build()
        .expect("explicit sources need no HTTP client")
}

fn mar_del_plata() -> Coordinates {
    Coordinates::new(-38.014, -57.530).expect("valid coordinates")
}

fn cached_reading(provider: &str, wind_kmh: f64) -> NormalizedReading {
    NormalizedReading::new(UtcDateTime::now().truncate_to_hour(), provider, TideState::Falling)
        .with_wind(Wind {
            speed_kmh: Some(wind_kmh),
            ..Wind::default()
        })
}

// =============================================================================
// Fresh cache
// =============================================================================

#[tokio::test]
async fn when_fresh_entry_exists_no_provider_is_called() {
    // Given: A fresh cache entry for the bucket
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    cache
        .store(
            CacheKey::conditions(coords.bucket()),
            CachedPayload::Conditions(cached_reading("windy", 22.0)),
        )
        .await;
    let source = StubSource::healthy("stormglass");
    let provider = hybrid(&[source.clone()], cache);

    // When: Conditions are requested
    let reading = provider.get_conditions(coords).await.expect("cached");

    // Then: The cached reading is returned untouched and the provider is idle
    assert_eq!(reading.provider, "windy");
    assert_eq!(reading.wind.speed_kmh, Some(22.0));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn when_nearby_coordinates_share_a_bucket_second_call_is_cached() {
    // Given: A single healthy provider
    let source = StubSource::healthy("openmeteo");
    let provider = hybrid(&[source.clone()], WeatherCache::new());
    let first = Coordinates::new(-38.014, -57.530).expect("valid");
    let second = Coordinates::new(-38.011, -57.532).expect("valid");

    // When: Two requests ~300 m apart are made
    let live = provider.resolve_conditions(first).await.expect("live");
    let cached = provider.resolve_conditions(second).await.expect("cached");

    // Then: Both land in bucket -38.01,-57.53 and only one provider call happens
    assert_eq!(first.bucket().key(), "-38.01,-57.53");
    assert_eq!(second.bucket().key(), "-38.01,-57.53");
    assert_eq!(live.origin, Origin::Provider(String::from("openmeteo")));
    assert_eq!(cached.origin, Origin::FreshCache);
    assert_eq!(cached.data, live.data);
    assert_eq!(source.calls(), 1);
}

// =============================================================================
// Fallback chain
// =============================================================================

#[tokio::test]
async fn when_first_provider_fails_next_one_serves_and_rest_are_skipped() {
    // Given: Providers [A, B, C] where A is down
    let a = StubSource::failing("a", ProviderErrorKind::Unavailable);
    let b = StubSource::healthy("b");
    let c = StubSource::healthy("c");
    let provider = hybrid(&[a.clone(), b.clone(), c.clone()], WeatherCache::new());

    // When: Conditions are requested
    let reading = provider.get_conditions(mar_del_plata()).await.expect("b serves");

    // Then: B's reading is returned and C is never invoked
    assert_eq!(reading.provider, "b");
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 0);
}

#[tokio::test]
async fn when_provider_returns_zombie_reading_chain_moves_on() {
    // Given: A provider returning neither wind speed nor wave height
    let zombie = StubSource::reading("zombie", None, None);
    let healthy = StubSource::healthy("healthy");
    let provider = hybrid(&[zombie.clone(), healthy.clone()], WeatherCache::new());

    // When: Conditions are requested
    let served = provider
        .resolve_conditions(mar_del_plata())
        .await
        .expect("healthy serves");

    // Then: The zombie is recorded as a failure and never cached
    assert_eq!(served.data.provider, "healthy");
    assert_eq!(served.failures.len(), 1);
    assert_eq!(served.failures[0].provider, "zombie");
    assert_eq!(served.failures[0].code, "provider.no_data");
    assert_eq!(zombie.calls(), 1);

    let stored = provider
        .cache()
        .peek(&CacheKey::conditions(mar_del_plata().bucket()))
        .await;
    assert_eq!(stored, Some(CachedPayload::Conditions(served.data)));
}

#[tokio::test]
async fn wave_only_reading_is_not_a_zombie() {
    // Given: A provider reporting waves but no wind
    let source = StubSource::reading("marine", None, Some(1.2));
    let provider = hybrid(&[source], WeatherCache::new());

    // When: Conditions are requested
    let reading = provider.get_conditions(mar_del_plata()).await.expect("usable");

    // Then: The reading is accepted with wind left absent, not zeroed
    assert_eq!(reading.waves.height_m, Some(1.2));
    assert_eq!(reading.wind.speed_kmh, None);
}

// =============================================================================
// Stale cache and total failure
// =============================================================================

#[tokio::test]
async fn when_all_providers_fail_two_hour_old_entry_is_served_as_stale() {
    // Given: Every provider failing and a 2 h old entry with a 6 h ceiling
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    cache
        .store_at(
            CacheKey::conditions(coords.bucket()),
            CachedPayload::Conditions(cached_reading("windy", 15.0)),
            UtcDateTime::now().plus_hours(-2),
        )
        .await;
    let provider = hybrid(
        &[
            StubSource::failing("stormglass", ProviderErrorKind::RateLimited),
            StubSource::failing("windy", ProviderErrorKind::Unavailable),
        ],
        cache,
    );

    // When: Conditions are requested
    let served = provider.resolve_conditions(coords).await.expect("stale served");

    // Then: The old reading comes back tagged as stale
    assert_eq!(served.data.provider, "stale:windy");
    assert_eq!(served.data.wind.speed_kmh, Some(15.0));
    assert!(matches!(
        served.origin,
        Origin::StaleCache { age_minutes } if (119..=121).contains(&age_minutes)
    ));
    assert_eq!(served.failures.len(), 2);
}

#[tokio::test]
async fn entry_older_than_stale_ceiling_is_never_served() {
    // Given: Every provider failing and a 7 h old entry
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    cache
        .store_at(
            CacheKey::conditions(coords.bucket()),
            CachedPayload::Conditions(cached_reading("windy", 15.0)),
            UtcDateTime::now().plus_hours(-7),
        )
        .await;
    let provider = hybrid(&[StubSource::failing("windy", ProviderErrorKind::Unavailable)], cache);

    // When: Conditions are requested
    let result = provider.get_conditions(coords).await;

    // Then: The request fails
    assert!(result.is_err());
}

#[tokio::test]
async fn when_everything_fails_single_service_unavailable_is_returned() {
    // Given: Failing providers and an empty cache
    let provider = hybrid(
        &[
            StubSource::failing("stormglass", ProviderErrorKind::NotConfigured),
            StubSource::failing("openmeteo", ProviderErrorKind::Unavailable),
        ],
        WeatherCache::new(),
    );

    // When: Conditions are requested
    let error = provider
        .get_conditions(mar_del_plata())
        .await
        .expect_err("nothing to serve");

    // Then: One error summarizes every attempt for the bucket
    assert_eq!(error.bucket, "-38.01,-57.53");
    assert_eq!(error.failures.len(), 2);
    assert_eq!(error.failures[0].code, "provider.not_configured");
    assert_eq!(error.failures[1].provider, "openmeteo");
    assert!(error.to_string().contains("temporarily unavailable"));
}

// =============================================================================
// Forecast
// =============================================================================

#[tokio::test]
async fn cached_forecast_is_truncated_to_requested_hours_in_order() {
    // Given: A fresh 24-entry forecast in the cache
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    let start = UtcDateTime::now().truncate_to_hour();
    let forecast = (0..24)
        .map(|offset| {
            let mut reading = cached_reading("windy", 10.0 + offset as f64);
            reading.timestamp = start.plus_hours(offset);
            reading
        })
        .collect::<Vec<_>>();
    cache
        .store(
            CacheKey::forecast(coords.bucket()),
            CachedPayload::Forecast(forecast.clone()),
        )
        .await;
    let source = StubSource::healthy("stormglass");
    let provider = hybrid(&[source.clone()], cache);

    // When: 12 hours are requested
    let served = provider.get_forecast(coords, 12).await.expect("cached forecast");

    // Then: Exactly the first 12 entries come back without a provider call
    assert_eq!(served, forecast[..12].to_vec());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn forecast_and_conditions_do_not_share_cache_entries() {
    // Given: A cached conditions reading only
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    cache
        .store(
            CacheKey::conditions(coords.bucket()),
            CachedPayload::Conditions(cached_reading("windy", 10.0)),
        )
        .await;
    let source = StubSource::healthy("openmeteo");
    let provider = hybrid(&[source.clone()], cache);

    // When: A forecast is requested
    let served = provider.resolve_forecast(coords, 6).await.expect("live forecast");

    // Then: The forecast comes from the provider and lands under the forecast key
    assert_eq!(served.origin, Origin::Provider(String::from("openmeteo")));
    assert_eq!(served.data.len(), 6);
    assert_eq!(source.calls(), 1);
    assert_eq!(CacheKey::forecast(coords.bucket()).as_str(), "-38.01,-57.53_forecast");
    assert!(provider
        .cache()
        .peek(&CacheKey::forecast(coords.bucket()))
        .await
        .is_some());
}

#[tokio::test]
async fn zero_hour_forecast_is_empty_and_calls_nothing() {
    let source = StubSource::healthy("openmeteo");
    let provider = hybrid(&[source.clone()], WeatherCache::new());

    let forecast = provider.get_forecast(mar_del_plata(), 0).await.expect("empty");

    assert!(forecast.is_empty());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn forecast_requests_are_capped_at_forty_eight_hours() {
    let source = StubSource::healthy("openmeteo");
    let provider = hybrid(&[source], WeatherCache::new());

    let forecast = provider.get_forecast(mar_del_plata(), 96).await.expect("forecast");

    assert_eq!(forecast.len(), 48);
}

#[tokio::test]
async fn all_zombie_forecast_falls_through_to_next_provider() {
    // Given: A returns only readings without wind or waves, B is healthy
    let zombie = StubSource::reading("zombie", None, None);
    let healthy = StubSource::healthy("healthy");
    let provider = hybrid(&[zombie.clone(), healthy.clone()], WeatherCache::new());

    // When: A 6 hour forecast is requested
    let served = provider
        .resolve_forecast(mar_del_plata(), 6)
        .await
        .expect("healthy serves");

    // Then: B's forecast is served and A's attempt is recorded as no data
    assert_eq!(served.origin, Origin::Provider(String::from("healthy")));
    assert_eq!(served.data.len(), 6);
    assert!(served.data.iter().all(|reading| reading.provider == "healthy"));
    assert_eq!(served.failures.len(), 1);
    assert_eq!(served.failures[0].code, "provider.no_data");
    assert_eq!(zombie.calls(), 1);
    assert_eq!(healthy.calls(), 1);
}

#[tokio::test]
async fn when_all_providers_fail_stale_forecast_is_served() {
    // Given: Every provider failing and a 3 h old forecast entry
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    let start = UtcDateTime::now().truncate_to_hour();
    let forecast = (0..8)
        .map(|offset| {
            let mut reading = cached_reading("openmeteo", 12.0);
            reading.timestamp = start.plus_hours(offset);
            reading
        })
        .collect::<Vec<_>>();
    cache
        .store_at(
            CacheKey::forecast(coords.bucket()),
            CachedPayload::Forecast(forecast),
            UtcDateTime::now().plus_hours(-3),
        )
        .await;
    let provider = hybrid(&[StubSource::failing("windy", ProviderErrorKind::Unavailable)], cache);

    // When: A 4 hour forecast is requested
    let served = provider.resolve_forecast(coords, 4).await.expect("stale served");

    // Then: The first 4 cached entries come back tagged as stale
    assert!(matches!(served.origin, Origin::StaleCache { .. }));
    assert_eq!(served.data.len(), 4);
    assert!(served
        .data
        .iter()
        .all(|reading| reading.provider == "stale:openmeteo"));
    assert_eq!(served.data[3].timestamp, start.plus_hours(3));
    assert_eq!(served.failures.len(), 1);
}

#[tokio::test]
async fn when_forecast_fails_everywhere_without_cache_service_is_unavailable() {
    // Given: Failing providers and only a conditions entry in the cache
    let cache = WeatherCache::new();
    let coords = mar_del_plata();
    cache
        .store(
            CacheKey::conditions(coords.bucket()),
            CachedPayload::Conditions(cached_reading("windy", 10.0)),
        )
        .await;
    let provider = hybrid(
        &[
            StubSource::failing("stormglass", ProviderErrorKind::RateLimited),
            StubSource::failing("openmeteo", ProviderErrorKind::Unavailable),
        ],
        cache,
    );

    // When: A forecast is requested
    let error = provider
        .get_forecast(coords, 12)
        .await
        .expect_err("nothing to serve");

    // Then: The error names the forecast endpoint and every attempt
    assert_eq!(error.endpoint, Endpoint::Forecast);
    assert_eq!(error.bucket, "-38.01,-57.53");
    assert_eq!(error.failures.len(), 2);
    assert_eq!(error.failures[0].code, "provider.rate_limited");
}

// =============================================================================
// End-to-end and cache lifecycle
// =============================================================================

#[tokio::test]
async fn unconfigured_provider_is_skipped_and_next_reading_is_cached_exactly() {
    // Given: Empty cache, A without API key, B returning wind 18.3 / wave 0.6
    let a = StubSource::failing("A", ProviderErrorKind::NotConfigured);
    let b = StubSource::reading("B", Some(18.3), Some(0.6));
    let provider = hybrid(&[a.clone(), b.clone()], WeatherCache::new());

    // When: Conditions are requested for (-38.014, -57.530)
    let reading = provider
        .get_conditions(mar_del_plata())
        .await
        .expect("B serves");

    // Then: B's reading is returned and cached under -38.01,-57.53
    assert_eq!(reading.provider, "B");
    assert_eq!(reading.wind.speed_kmh, Some(18.3));
    assert_eq!(reading.waves.height_m, Some(0.6));

    let key = CacheKey::conditions(mar_del_plata().bucket());
    assert_eq!(key.as_str(), "-38.01,-57.53");
    assert_eq!(
        provider.cache().peek(&key).await,
        Some(CachedPayload::Conditions(reading))
    );
}

#[tokio::test]
async fn clear_cache_forces_a_provider_call() {
    // Given: A provider that has already populated the cache
    let source = StubSource::healthy("openmeteo");
    let provider = hybrid(&[source.clone()], WeatherCache::new());
    provider.get_conditions(mar_del_plata()).await.expect("live");

    // When: The cache is cleared and conditions are requested again
    provider.clear_cache().await;
    assert!(provider.cache().is_empty().await);
    provider.get_conditions(mar_del_plata()).await.expect("live again");

    // Then: The provider was called twice
    assert_eq!(source.calls(), 2);
}
