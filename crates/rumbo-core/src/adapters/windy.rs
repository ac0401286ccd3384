use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::adapters::{first_reading, readings_from_samples, require_key, HourlySample, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{ProviderError, SourceFuture, WeatherSource};
use crate::domain::units;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::tide::TideSource;
use crate::timeline::value_at;
use crate::{Atmosphere, Coordinates, NormalizedReading, ProviderId, UtcDateTime, Waves, Wind};

const BASE_URL: &str = "https://api.windy.com";
const WIND_MODEL: &str = "gfs";
const WAVE_MODEL: &str = "gfsWave";
/// GFS and GFS-Wave are published on a 3-hour grid.
const MODEL_STEP_HOURS: i64 = 3;

/// Windy point-forecast adapter. Wind and weather come from GFS, waves from GFS-Wave.
pub struct WindyAdapter {
    upstream: Upstream,
    api_key: Option<String>,
    base_url: String,
    tides: Arc<dyn TideSource>,
}

impl WindyAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: Option<String>,
        tides: Arc<dyn TideSource>,
    ) -> Self {
        Self {
            upstream: Upstream::new(&ProviderPolicy::windy_default(), http_client),
            api_key,
            base_url: String::from(BASE_URL),
            tides,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.upstream.set_circuit_breaker(circuit_breaker);
        self
    }

    fn point_request(
        &self,
        coords: Coordinates,
        key: &str,
        model: &str,
        parameters: &[&str],
    ) -> HttpRequest {
        let body = serde_json::json!({
            "lat": coords.latitude(),
            "lon": coords.longitude(),
            "model": model,
            "parameters": parameters,
            "levels": ["surface"],
            "key": key,
        });
        HttpRequest::post_json(
            format!("{}/api/point-forecast/v2", self.base_url),
            body.to_string(),
        )
    }

    async fn fetch_readings(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Vec<NormalizedReading>, ProviderError> {
        let key = require_key(self.name(), self.api_key.as_deref())?;

        let wind_request = self.point_request(coords, key, WIND_MODEL, &["wind", "temp", "precip"]);
        let wave_request = self.point_request(coords, key, WAVE_MODEL, &["waves"]);

        let (wind, waves) = tokio::join!(
            self.upstream.fetch_json::<WindSeries>(wind_request),
            self.upstream.fetch_json::<WaveSeries>(wave_request),
        );
        let wind = wind?;
        let waves = waves.unwrap_or_else(|error| {
            warn!(provider = self.name(), error = %error, "windy wave model failed, waves left empty");
            WaveSeries::default()
        });

        let samples = expand_to_hourly(merge_series(&wind, &waves)?);
        readings_from_samples(
            self.name(),
            coords,
            samples,
            UtcDateTime::now(),
            hours,
            self.tides.as_ref(),
        )
        .await
    }
}

impl WeatherSource for WindyAdapter {
    fn name(&self) -> &str {
        ProviderId::Windy.as_str()
    }

    fn get_conditions<'a>(&'a self, coords: Coordinates) -> SourceFuture<'a, NormalizedReading> {
        Box::pin(async move {
            let readings = self.fetch_readings(coords, 1).await?;
            first_reading(self.name(), readings)
        })
    }

    fn get_forecast<'a>(
        &'a self,
        coords: Coordinates,
        hours: usize,
    ) -> SourceFuture<'a, Vec<NormalizedReading>> {
        Box::pin(self.fetch_readings(coords, hours))
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindSeries {
    #[serde(default)]
    ts: Vec<i64>,
    #[serde(rename = "wind_u-surface", default)]
    wind_u: Vec<Option<f64>>,
    #[serde(rename = "wind_v-surface", default)]
    wind_v: Vec<Option<f64>>,
    #[serde(rename = "temp-surface", default)]
    temperature_k: Vec<Option<f64>>,
    #[serde(rename = "past3hprecip-surface", default)]
    precipitation_m: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct WaveSeries {
    #[serde(default)]
    ts: Vec<i64>,
    #[serde(rename = "waves_height-surface", default)]
    height: Vec<Option<f64>>,
    #[serde(rename = "waves_period-surface", default)]
    period: Vec<Option<f64>>,
    #[serde(rename = "waves_direction-surface", default)]
    direction: Vec<Option<f64>>,
}

/// Joins the wave series onto the wind series by timestamp.
fn merge_series(wind: &WindSeries, waves: &WaveSeries) -> Result<Vec<HourlySample>, ProviderError> {
    let wave_index = waves
        .ts
        .iter()
        .enumerate()
        .map(|(index, ts)| (*ts, index))
        .collect::<HashMap<_, _>>();

    wind.ts
        .iter()
        .enumerate()
        .map(|(index, ts)| {
            let time = UtcDateTime::from_unix_millis(*ts).map_err(|error| {
                ProviderError::malformed(format!("windy returned a bad timestamp: {error}"))
            })?;
            let (speed_kmh, direction_deg) =
                wind_from_components(value_at(&wind.wind_u, index), value_at(&wind.wind_v, index));

            let wave = wave_index.get(ts).copied();
            let wave_value = |values: &[Option<f64>]| wave.and_then(|i| value_at(values, i));

            Ok(HourlySample {
                time,
                wind: Wind {
                    speed_kmh,
                    direction_deg,
                    relative_direction: None,
                },
                waves: Waves {
                    height_m: wave_value(&waves.height).map(units::round1),
                    period_s: wave_value(&waves.period).map(units::round1),
                    direction_deg: units::normalize_direction(wave_value(&waves.direction)),
                },
                atmosphere: Atmosphere {
                    temperature_c: units::kelvin_to_celsius(value_at(&wind.temperature_k, index)),
                    precipitation_mm: units::finite(value_at(&wind.precipitation_m, index))
                        .map(|metres| units::round1(metres * 1_000.0 / MODEL_STEP_HOURS as f64)),
                    ..Atmosphere::default()
                },
            })
        })
        .collect()
}

/// Repeats each model step until the next one so the series is hourly.
/// Gaps wider than a model step are left open.
fn expand_to_hourly(mut samples: Vec<HourlySample>) -> Vec<HourlySample> {
    samples.sort_by_key(|sample| sample.time);
    let mut hourly = Vec::with_capacity(samples.len() * MODEL_STEP_HOURS as usize);
    let mut samples = samples.into_iter().peekable();

    while let Some(sample) = samples.next() {
        let span = samples.peek().map_or(MODEL_STEP_HOURS, |next| {
            (next.time.unix_seconds() - sample.time.unix_seconds()) / 3_600
        });
        let repeats = (1..span.min(MODEL_STEP_HOURS))
            .map(|offset| {
                let mut repeated = sample.clone();
                repeated.time = sample.time.plus_hours(offset);
                repeated
            })
            .collect::<Vec<_>>();
        hourly.push(sample);
        hourly.extend(repeats);
    }
    hourly
}

/// Speed (km/h) and meteorological direction from u/v components in m/s.
fn wind_from_components(u: Option<f64>, v: Option<f64>) -> (Option<f64>, Option<f64>) {
    match (units::finite(u), units::finite(v)) {
        (Some(u), Some(v)) => {
            let speed = units::ms_to_kmh(Some(u.hypot(v)));
            let direction = units::normalize_direction(Some(270.0 - v.atan2(u).to_degrees()));
            (speed, direction)
        }
        _ => (None, None),
    }
}
