use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::{first_reading, readings_from_samples, HourlySample, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{ProviderError, SourceFuture, WeatherSource};
use crate::domain::units;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::tide::TideSource;
use crate::timeline::value_at;
use crate::{Atmosphere, Coordinates, NormalizedReading, ProviderId, UtcDateTime, Waves, Wind};

const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";
const MARINE_BASE_URL: &str = "https://marine-api.open-meteo.com";
const FORECAST_FIELDS: &str = "wind_speed_10m,wind_direction_10m,temperature_2m,precipitation,\
weather_code,cloud_cover,uv_index,visibility";
const MARINE_FIELDS: &str = "wave_height,wave_period,wave_direction";

/// Open-Meteo adapter. Keyless; weather and marine data come from two
/// endpoints queried concurrently and joined by timestamp.
pub struct OpenMeteoAdapter {
    upstream: Upstream,
    forecast_base_url: String,
    marine_base_url: String,
    tides: Arc<dyn TideSource>,
}

impl OpenMeteoAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, tides: Arc<dyn TideSource>) -> Self {
        Self {
            upstream: Upstream::new(&ProviderPolicy::openmeteo_default(), http_client),
            forecast_base_url: String::from(FORECAST_BASE_URL),
            marine_base_url: String::from(MARINE_BASE_URL),
            tides,
        }
    }

    pub fn with_base_urls(
        mut self,
        forecast_base_url: impl Into<String>,
        marine_base_url: impl Into<String>,
    ) -> Self {
        self.forecast_base_url = forecast_base_url.into();
        self.marine_base_url = marine_base_url.into();
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.upstream.set_circuit_breaker(circuit_breaker);
        self
    }

    async fn fetch_readings(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Vec<NormalizedReading>, ProviderError> {
        // Series start at midnight UTC, so late in the day the window spills into day three.
        let days = if hours <= 24 { 2 } else { 3 };
        let forecast_url = format!(
            "{}/v1/forecast?latitude={}&longitude={}&hourly={}&timezone=UTC&forecast_days={}&models=best_match",
            self.forecast_base_url,
            coords.latitude(),
            coords.longitude(),
            FORECAST_FIELDS,
            days
        );
        let marine_url = format!(
            "{}/v1/marine?latitude={}&longitude={}&hourly={}&timezone=UTC&forecast_days={}",
            self.marine_base_url,
            coords.latitude(),
            coords.longitude(),
            MARINE_FIELDS,
            days
        );

        let (forecast, marine) = tokio::join!(
            self.upstream
                .fetch_json::<ForecastResponse>(HttpRequest::get(forecast_url)),
            self.upstream
                .fetch_json::<MarineResponse>(HttpRequest::get(marine_url)),
        );

        let forecast = match forecast {
            Ok(response) if !response.hourly.time.is_empty() => Some(response.hourly),
            Ok(_) => None,
            Err(error) => {
                warn!(provider = self.name(), error = %error, "open-meteo forecast request failed");
                None
            }
        };
        let marine = match marine {
            Ok(response) if !response.hourly.time.is_empty() => Some(response.hourly),
            Ok(_) => {
                debug!(provider = self.name(), "open-meteo marine returned no series, inland point?");
                None
            }
            Err(error) => {
                warn!(provider = self.name(), error = %error, "open-meteo marine request failed");
                None
            }
        };

        if forecast.is_none() && marine.is_none() {
            return Err(ProviderError::no_data(
                "openmeteo returned no time series from either endpoint",
            ));
        }

        let samples = merge_series(forecast.as_ref(), marine.as_ref())?;
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

impl WeatherSource for OpenMeteoAdapter {
    fn name(&self) -> &str {
        ProviderId::OpenMeteo.as_str()
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

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: ForecastHourly,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<f64>>,
    #[serde(default)]
    cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    uv_index: Vec<Option<f64>>,
    #[serde(default)]
    visibility: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct MarineResponse {
    #[serde(default)]
    hourly: MarineHourly,
}

#[derive(Debug, Default, Deserialize)]
struct MarineHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wave_height: Vec<Option<f64>>,
    #[serde(default)]
    wave_period: Vec<Option<f64>>,
    #[serde(default)]
    wave_direction: Vec<Option<f64>>,
}

fn parse_times(times: &[String]) -> Result<Vec<UtcDateTime>, ProviderError> {
    times
        .iter()
        .map(|time| UtcDateTime::parse(time))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| {
            ProviderError::malformed(format!("openmeteo returned a bad timestamp: {error}"))
        })
}

/// Builds samples on the forecast timeline (marine timeline when forecast is
/// missing), attaching marine values with the same timestamp.
fn merge_series(
    forecast: Option<&ForecastHourly>,
    marine: Option<&MarineHourly>,
) -> Result<Vec<HourlySample>, ProviderError> {
    let marine_times = marine
        .map(|marine| parse_times(&marine.time))
        .transpose()?
        .unwrap_or_default();
    let marine_index = marine_times
        .iter()
        .enumerate()
        .map(|(index, time)| (*time, index))
        .collect::<HashMap<_, _>>();

    let timeline = match forecast {
        Some(forecast) => parse_times(&forecast.time)?,
        None => marine_times.clone(),
    };

    let samples = timeline
        .into_iter()
        .enumerate()
        .map(|(index, time)| {
            let weather = |pick: fn(&ForecastHourly) -> &[Option<f64>]| {
                forecast.and_then(|forecast| value_at(pick(forecast), index))
            };
            let marine_at = marine_index.get(&time).copied();
            let sea = |pick: fn(&MarineHourly) -> &[Option<f64>]| {
                marine
                    .zip(marine_at)
                    .and_then(|(marine, at)| value_at(pick(marine), at))
            };

            HourlySample {
                time,
                wind: Wind {
                    speed_kmh: units::finite(weather(|f| f.wind_speed_10m.as_slice())).map(units::round1),
                    direction_deg: units::normalize_direction(weather(|f| f.wind_direction_10m.as_slice())),
                    relative_direction: None,
                },
                waves: Waves {
                    height_m: units::finite(sea(|m| m.wave_height.as_slice())).map(units::round1),
                    period_s: units::finite(sea(|m| m.wave_period.as_slice())).map(units::round1),
                    direction_deg: units::normalize_direction(sea(|m| m.wave_direction.as_slice())),
                },
                atmosphere: Atmosphere {
                    temperature_c: units::finite(weather(|f| f.temperature_2m.as_slice())).map(units::round1),
                    precipitation_mm: units::finite(weather(|f| f.precipitation.as_slice()))
                        .map(units::round1),
                    cloud_cover_pct: units::finite(weather(|f| f.cloud_cover.as_slice())),
                    uv_index: units::finite(weather(|f| f.uv_index.as_slice())).map(units::round1),
                    visibility_km: units::metres_to_km(weather(|f| f.visibility.as_slice())),
                    weather_code: units::finite(weather(|f| f.weather_code.as_slice()))
                        .map(|code| code as i32),
                },
            }
        })
        .collect();

    Ok(samples)
}
