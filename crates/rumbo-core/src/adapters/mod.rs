//! Provider adapters translating upstream weather APIs into [`NormalizedReading`]s.

pub mod openmeteo;
pub mod openweather;
pub mod stormglass;
pub mod windy;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::ProviderError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::QuotaThrottle;
use crate::tide::{estimate_tide_state, TideSource};
use crate::timeline;
use crate::{Atmosphere, Coordinates, NormalizedReading, UtcDateTime, Waves, Wind};

pub use openmeteo::OpenMeteoAdapter;
pub use openweather::OpenWeatherAdapter;
pub use stormglass::StormglassAdapter;
pub use windy::WindyAdapter;

/// Guarded access to one upstream API: breaker, local quota, status mapping
/// and JSON decoding.
#[derive(Clone)]
pub(crate) struct Upstream {
    name: &'static str,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    throttle: QuotaThrottle,
}

impl Upstream {
    pub(crate) fn new(policy: &ProviderPolicy, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            name: policy.name,
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::new(policy.name, policy.circuit_breaker)),
            throttle: QuotaThrottle::from_policy(policy),
        }
    }

    pub(crate) fn set_circuit_breaker(&mut self, circuit_breaker: Arc<CircuitBreaker>) {
        self.circuit_breaker = circuit_breaker;
    }

    pub(crate) async fn fetch_json<T>(&self, request: HttpRequest) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + Send,
    {
        if let Err(wait) = self.circuit_breaker.check() {
            return Err(ProviderError::unavailable(format!(
                "{} circuit is open; next probe in {}s",
                self.name,
                wait.as_secs()
            )));
        }

        if let Err(interval) = self.throttle.acquire() {
            return Err(ProviderError::rate_limited(format!(
                "{} local quota exhausted; one request frees up every {:.0}s",
                self.name,
                interval.as_secs_f64()
            )));
        }

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            ProviderError::unavailable(format!("{} transport error: {}", self.name, error.message()))
        })?;

        if !response.is_success() {
            self.circuit_breaker.record_failure();
            return Err(match response.status {
                402 | 429 => ProviderError::rate_limited(format!(
                    "{} quota exhausted upstream (status {})",
                    self.name, response.status
                )),
                status => ProviderError::upstream_status(self.name, status),
            });
        }

        self.circuit_breaker.record_success();

        serde_json::from_str(&response.body).map_err(|error| {
            ProviderError::malformed(format!("failed to parse {} response: {error}", self.name))
        })
    }
}

/// Returns the key when present and non-blank.
pub(crate) fn require_key<'a>(
    provider: &str,
    api_key: Option<&'a str>,
) -> Result<&'a str, ProviderError> {
    api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ProviderError::not_configured(provider))
}

/// One hour of provider data before tide enrichment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HourlySample {
    pub time: UtcDateTime,
    pub wind: Wind,
    pub waves: Waves,
    pub atmosphere: Atmosphere,
}

/// Selects up to `hours` samples starting at the current hour and turns them
/// into readings tagged with `provider` and an estimated tide state.
pub(crate) async fn readings_from_samples(
    provider: &str,
    coords: Coordinates,
    samples: Vec<HourlySample>,
    now: UtcDateTime,
    hours: usize,
    tides: &dyn TideSource,
) -> Result<Vec<NormalizedReading>, ProviderError> {
    if samples.is_empty() {
        return Err(ProviderError::no_data(format!(
            "{provider} returned an empty time series"
        )));
    }

    let times = samples.iter().map(|sample| sample.time).collect::<Vec<_>>();
    let range = timeline::window(timeline::start_index(&times, now), samples.len(), hours.max(1));
    let selected = samples
        .into_iter()
        .skip(range.start)
        .take(range.len())
        .collect::<Vec<_>>();

    let tide_times = selected.iter().map(|sample| sample.time).collect::<Vec<_>>();
    let tide_states = tides.tide_states(coords, tide_times).await;

    let readings = selected
        .into_iter()
        .enumerate()
        .map(|(index, sample)| {
            let tide = tide_states
                .get(index)
                .copied()
                .unwrap_or_else(|| estimate_tide_state(coords, sample.time));
            NormalizedReading::new(sample.time, provider, tide)
                .with_wind(sample.wind)
                .with_waves(sample.waves)
                .with_atmosphere(sample.atmosphere)
        })
        .collect::<Vec<_>>();

    if readings.iter().all(NormalizedReading::is_zombie) {
        return Err(ProviderError::no_data(format!(
            "{provider} returned neither wind speed nor wave height"
        )));
    }

    Ok(readings)
}

/// First reading of a one-hour selection.
pub(crate) fn first_reading(
    provider: &str,
    readings: Vec<NormalizedReading>,
) -> Result<NormalizedReading, ProviderError> {
    readings
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::no_data(format!("{provider} returned no current reading")))
}
