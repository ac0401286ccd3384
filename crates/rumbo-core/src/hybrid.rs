//! The hybrid provider: an ordered provider fallback chain behind a
//! two-tier cache.
//!
//! Resolution of one request:
//!
//! 1. A fresh-tier cache hit for the coordinate bucket is returned without
//!    any provider call.
//! 2. Providers are tried one at a time in priority order. The first usable
//!    result is cached and returned; later providers are never called.
//!    Failures and zombie readings are logged and absorbed.
//! 3. When every provider failed, a stale-tier entry for the bucket is served
//!    with its `provider` rewritten to `stale:<provider>`.
//! 4. Otherwise the request fails with [`ServiceUnavailable`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::adapters::{OpenMeteoAdapter, OpenWeatherAdapter, StormglassAdapter, WindyAdapter};
use crate::cache::{CacheKey, CachePolicy, CacheTier, CachedPayload, WeatherCache};
use crate::config::RumboConfig;
use crate::data_source::{Endpoint, ProviderError, SourceFuture, WeatherSource};
use crate::http_client::{HttpClient, HttpError, ReqwestHttpClient, ResilientHttpClient};
use crate::retry::RetryConfig;
use crate::tide::{AstronomicalTides, TideSource, WorldTidesSource};
use crate::{Coordinates, NormalizedReading, ProviderFailure, ProviderId, ServiceUnavailable, UtcDateTime};

/// Longest forecast served, in hours.
pub const MAX_FORECAST_HOURS: usize = 48;
/// Forecast length used when the caller does not ask for one.
pub const DEFAULT_FORECAST_HOURS: usize = 12;

/// Where a served result came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Nothing was requested (`hours == 0`).
    Skipped,
    FreshCache,
    Provider(String),
    StaleCache { age_minutes: u64 },
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::FreshCache => "fresh_cache",
            Self::Provider(_) => "provider",
            Self::StaleCache { .. } => "stale_cache",
        }
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::FreshCache | Self::StaleCache { .. })
    }
}

/// Successful resolution with its trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub data: T,
    pub origin: Origin,
    /// Providers called, in order.
    pub source_chain: Vec<String>,
    /// Failures absorbed before the result was found.
    pub failures: Vec<ProviderFailure>,
    pub latency_ms: u64,
}

/// Payload kinds the hybrid provider resolves.
trait Resolvable: Clone {
    fn is_usable(&self) -> bool;
    fn into_payload(self) -> CachedPayload;
    fn from_payload(payload: CachedPayload) -> Option<Self>;
    fn into_stale_served(self) -> Self;
}

impl Resolvable for NormalizedReading {
    fn is_usable(&self) -> bool {
        !self.is_zombie()
    }

    fn into_payload(self) -> CachedPayload {
        CachedPayload::Conditions(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Conditions(reading) => Some(reading),
            CachedPayload::Forecast(_) => None,
        }
    }

    fn into_stale_served(self) -> Self {
        NormalizedReading::into_stale_served(self)
    }
}

impl Resolvable for Vec<NormalizedReading> {
    fn is_usable(&self) -> bool {
        self.iter().any(|reading| !reading.is_zombie())
    }

    fn into_payload(self) -> CachedPayload {
        CachedPayload::Forecast(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Forecast(readings) => Some(readings),
            CachedPayload::Conditions(_) => None,
        }
    }

    fn into_stale_served(self) -> Self {
        self.into_iter()
            .map(NormalizedReading::into_stale_served)
            .collect()
    }
}

/// Ordered provider chain with a shared two-tier cache.
pub struct HybridProvider {
    sources: Vec<Arc<dyn WeatherSource>>,
    cache: WeatherCache,
    policy: CachePolicy,
}

impl HybridProvider {
    pub fn new(sources: Vec<Arc<dyn WeatherSource>>, cache: WeatherCache, policy: CachePolicy) -> Self {
        Self {
            sources,
            cache,
            policy,
        }
    }

    pub fn builder() -> HybridProviderBuilder {
        HybridProviderBuilder::new()
    }

    /// Provider names in priority order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|source| source.name().to_owned())
            .collect()
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn get_conditions(
        &self,
        coords: Coordinates,
    ) -> Result<NormalizedReading, ServiceUnavailable> {
        self.resolve_conditions(coords).await.map(|served| served.data)
    }

    pub async fn get_forecast(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Vec<NormalizedReading>, ServiceUnavailable> {
        self.resolve_forecast(coords, hours)
            .await
            .map(|served| served.data)
    }

    /// Current conditions with resolution trace.
    pub async fn resolve_conditions(
        &self,
        coords: Coordinates,
    ) -> Result<Served<NormalizedReading>, ServiceUnavailable> {
        self.resolve(Endpoint::Conditions, coords, |source| {
            source.get_conditions(coords)
        })
        .await
    }

    /// Hourly forecast of at most `hours` entries (capped at [`MAX_FORECAST_HOURS`])
    /// with resolution trace. `hours == 0` yields an empty forecast without
    /// touching cache or providers.
    pub async fn resolve_forecast(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Served<Vec<NormalizedReading>>, ServiceUnavailable> {
        if hours == 0 {
            return Ok(Served {
                data: Vec::new(),
                origin: Origin::Skipped,
                source_chain: Vec::new(),
                failures: Vec::new(),
                latency_ms: 0,
            });
        }

        let hours = hours.min(MAX_FORECAST_HOURS);
        let mut served = self
            .resolve(Endpoint::Forecast, coords, |source| {
                source.get_forecast(coords, hours)
            })
            .await?;
        served.data.truncate(hours);
        Ok(served)
    }

    /// Drops every entry from both cache tiers.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("weather cache cleared");
    }

    async fn resolve<T, F>(
        &self,
        endpoint: Endpoint,
        coords: Coordinates,
        mut invoke: F,
    ) -> Result<Served<T>, ServiceUnavailable>
    where
        T: Resolvable,
        F: for<'a> FnMut(&'a dyn WeatherSource) -> SourceFuture<'a, T>,
    {
        let started = Instant::now();
        let key = CacheKey::new(coords.bucket(), endpoint);

        if let Some(hit) = self
            .cache
            .lookup(&key, self.policy.max_age(CacheTier::Fresh), UtcDateTime::now())
            .await
        {
            if let Some(data) = T::from_payload(hit.payload) {
                debug!(endpoint = %endpoint, bucket = %key, age_secs = hit.age.as_secs(), "fresh cache hit");
                return Ok(Served {
                    data,
                    origin: Origin::FreshCache,
                    source_chain: Vec::new(),
                    failures: Vec::new(),
                    latency_ms: elapsed_ms(started),
                });
            }
        }

        let mut source_chain = Vec::with_capacity(self.sources.len());
        let mut failures = Vec::new();

        for source in &self.sources {
            let name = source.name().to_owned();
            source_chain.push(name.clone());

            match invoke(source.as_ref()).await {
                Ok(data) if data.is_usable() => {
                    self.cache.store(key.clone(), data.clone().into_payload()).await;
                    if !failures.is_empty() {
                        info!(
                            endpoint = %endpoint,
                            bucket = %key,
                            provider = %name,
                            failed = failures.len(),
                            "provider fallback succeeded"
                        );
                    }
                    return Ok(Served {
                        data,
                        origin: Origin::Provider(name),
                        source_chain,
                        failures,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Ok(_) => {
                    let rejected = ProviderError::no_data(format!(
                        "{name} returned neither wind speed nor wave height"
                    ));
                    warn!(endpoint = %endpoint, bucket = %key, provider = %name, "zombie data rejected");
                    failures.push(to_failure(&name, &rejected));
                }
                Err(failure) if failure.is_not_configured() => {
                    info!(endpoint = %endpoint, provider = %name, "provider not configured, skipping");
                    failures.push(to_failure(&name, &failure));
                }
                Err(failure) => {
                    warn!(
                        endpoint = %endpoint,
                        bucket = %key,
                        provider = %name,
                        code = failure.code(),
                        error = %failure,
                        "provider failed"
                    );
                    failures.push(to_failure(&name, &failure));
                }
            }
        }

        if let Some(hit) = self
            .cache
            .lookup(&key, self.policy.max_age(CacheTier::Stale), UtcDateTime::now())
            .await
        {
            if let Some(data) = T::from_payload(hit.payload) {
                let age_minutes = hit.age.as_secs() / 60;
                warn!(
                    endpoint = %endpoint,
                    bucket = %key,
                    age_minutes,
                    failed = failures.len(),
                    "all providers failed, serving stale cache"
                );
                return Ok(Served {
                    data: data.into_stale_served(),
                    origin: Origin::StaleCache { age_minutes },
                    source_chain,
                    failures,
                    latency_ms: elapsed_ms(started),
                });
            }
        }

        error!(
            endpoint = %endpoint,
            bucket = %key,
            failed = failures.len(),
            "all providers failed and no usable cache entry"
        );
        Err(ServiceUnavailable {
            endpoint,
            bucket: coords.bucket().key(),
            failures,
            latency_ms: elapsed_ms(started),
        })
    }
}

fn to_failure(provider: &str, error: &ProviderError) -> ProviderFailure {
    ProviderFailure {
        provider: provider.to_owned(),
        code: error.code(),
        message: error.message().to_owned(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Assembles a [`HybridProvider`] from configuration.
///
/// | Input | Default |
/// |-------|---------|
/// | Config | [`RumboConfig::default`] |
/// | HTTP client | pooled reqwest client behind a retrying decorator |
/// | Tide source | WorldTides when a key is configured, astronomical otherwise |
/// | Sources | one adapter per configured provider, in configured order |
/// | Cache | new empty cache |
#[derive(Default)]
pub struct HybridProviderBuilder {
    config: RumboConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    tides: Option<Arc<dyn TideSource>>,
    sources: Option<Vec<Arc<dyn WeatherSource>>>,
    cache: Option<WeatherCache>,
    policy: Option<CachePolicy>,
}

impl HybridProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RumboConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport shared by every adapter; used as-is, without a retry wrapper.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_tides(mut self, tides: Arc<dyn TideSource>) -> Self {
        self.tides = Some(tides);
        self
    }

    /// Explicit provider chain; replaces the configured one.
    pub fn with_sources(mut self, sources: Vec<Arc<dyn WeatherSource>>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_cache(mut self, cache: WeatherCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Fails only when the HTTP client cannot be constructed.
    pub fn build(self) -> Result<HybridProvider, HttpError> {
        let policy = self.policy.unwrap_or(self.config.cache_policy);
        let cache = self.cache.unwrap_or_default();

        let sources = match self.sources {
            Some(sources) => sources,
            None => {
                let http_client = match self.http_client {
                    Some(http_client) => http_client,
                    None => default_http_client(&self.config)?,
                };
                let tides = self
                    .tides
                    .unwrap_or_else(|| default_tides(&self.config, http_client.clone()));
                self.config
                    .provider_order
                    .iter()
                    .map(|provider| {
                        adapter_for(*provider, &self.config, http_client.clone(), tides.clone())
                    })
                    .collect()
            }
        };

        Ok(HybridProvider::new(sources, cache, policy))
    }
}

fn default_http_client(config: &RumboConfig) -> Result<Arc<dyn HttpClient>, HttpError> {
    let reqwest_client = ReqwestHttpClient::new(&config.http)?;
    Ok(Arc::new(ResilientHttpClient::new(
        Arc::new(reqwest_client),
        RetryConfig::exponential(config.http.max_attempts),
    )))
}

fn default_tides(config: &RumboConfig, http_client: Arc<dyn HttpClient>) -> Arc<dyn TideSource> {
    match &config.worldtides_api_key {
        Some(key) => Arc::new(WorldTidesSource::new(http_client, Some(key.clone()))),
        None => Arc::new(AstronomicalTides),
    }
}

fn adapter_for(
    provider: ProviderId,
    config: &RumboConfig,
    http_client: Arc<dyn HttpClient>,
    tides: Arc<dyn TideSource>,
) -> Arc<dyn WeatherSource> {
    let key = config.api_key(provider).map(str::to_owned);
    match provider {
        ProviderId::Stormglass => Arc::new(StormglassAdapter::new(http_client, key, tides)),
        ProviderId::Windy => Arc::new(WindyAdapter::new(http_client, key, tides)),
        ProviderId::OpenWeather => Arc::new(OpenWeatherAdapter::new(http_client, key, tides)),
        ProviderId::OpenMeteo => Arc::new(OpenMeteoAdapter::new(http_client, tides)),
    }
}
