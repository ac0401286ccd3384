use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{first_reading, readings_from_samples, require_key, HourlySample, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{ProviderError, SourceFuture, WeatherSource};
use crate::domain::units;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::tide::TideSource;
use crate::{Atmosphere, Coordinates, NormalizedReading, ProviderId, UtcDateTime, Waves, Wind};

const BASE_URL: &str = "https://api.openweathermap.org";
/// Forecast entries are spaced this many hours apart.
const FORECAST_STEP_HOURS: usize = 3;

/// OpenWeatherMap free-tier adapter. Land weather only: waves are always absent.
pub struct OpenWeatherAdapter {
    upstream: Upstream,
    api_key: Option<String>,
    base_url: String,
    tides: Arc<dyn TideSource>,
}

impl OpenWeatherAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: Option<String>,
        tides: Arc<dyn TideSource>,
    ) -> Self {
        Self {
            upstream: Upstream::new(&ProviderPolicy::openweather_default(), http_client),
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

    fn url(&self, path: &str, coords: Coordinates, key: &str) -> String {
        format!(
            "{}/data/2.5/{}?lat={}&lon={}&appid={}&units=metric",
            self.base_url,
            path,
            coords.latitude(),
            coords.longitude(),
            urlencoding::encode(key)
        )
    }

    async fn fetch_conditions(&self, coords: Coordinates) -> Result<NormalizedReading, ProviderError> {
        let key = require_key(self.name(), self.api_key.as_deref())?;
        let request = HttpRequest::get(self.url("weather", coords, key));

        let observation: Observation = self.upstream.fetch_json(request).await?;
        let sample = observation.into_sample()?;

        let readings = readings_from_samples(
            self.name(),
            coords,
            vec![sample],
            UtcDateTime::now(),
            1,
            self.tides.as_ref(),
        )
        .await?;
        first_reading(self.name(), readings)
    }

    async fn fetch_forecast(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Vec<NormalizedReading>, ProviderError> {
        let key = require_key(self.name(), self.api_key.as_deref())?;
        let count = hours / FORECAST_STEP_HOURS + 2;
        let url = format!("{}&cnt={count}", self.url("forecast", coords, key));

        let forecast: ForecastResponse = self.upstream.fetch_json(HttpRequest::get(url)).await?;
        let samples = expand_to_hourly(forecast.list)?;

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

impl WeatherSource for OpenWeatherAdapter {
    fn name(&self) -> &str {
        ProviderId::OpenWeather.as_str()
    }

    fn get_conditions<'a>(&'a self, coords: Coordinates) -> SourceFuture<'a, NormalizedReading> {
        Box::pin(self.fetch_conditions(coords))
    }

    fn get_forecast<'a>(
        &'a self,
        coords: Coordinates,
        hours: usize,
    ) -> SourceFuture<'a, Vec<NormalizedReading>> {
        Box::pin(self.fetch_forecast(coords, hours))
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<Observation>,
}

#[derive(Debug, Clone, Deserialize)]
struct Observation {
    dt: i64,
    #[serde(default)]
    wind: Option<WindBlock>,
    #[serde(default)]
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    clouds: Option<CloudBlock>,
    #[serde(default)]
    rain: Option<RainBlock>,
    visibility: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct WindBlock {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct Condition {
    id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct CloudBlock {
    all: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RainBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

impl RainBlock {
    /// Precipitation per hour; 3-hour totals are spread evenly.
    fn hourly_mm(&self) -> Option<f64> {
        units::finite(self.one_hour)
            .or_else(|| units::finite(self.three_hours).map(|total| total / 3.0))
            .map(units::round1)
    }
}

impl Observation {
    fn into_sample(self) -> Result<HourlySample, ProviderError> {
        let time = UtcDateTime::from_unix_seconds(self.dt).map_err(|error| {
            ProviderError::malformed(format!("openweather returned a bad timestamp: {error}"))
        })?;
        let wind = self.wind.as_ref();

        Ok(HourlySample {
            time,
            wind: Wind {
                speed_kmh: units::ms_to_kmh(wind.and_then(|w| w.speed)),
                direction_deg: units::normalize_direction(wind.and_then(|w| w.deg)),
                relative_direction: None,
            },
            waves: Waves::default(),
            atmosphere: Atmosphere {
                temperature_c: units::finite(self.main.as_ref().and_then(|m| m.temp))
                    .map(units::round1),
                precipitation_mm: self.rain.as_ref().and_then(RainBlock::hourly_mm),
                cloud_cover_pct: units::finite(self.clouds.as_ref().and_then(|c| c.all)),
                uv_index: None,
                visibility_km: units::metres_to_km(self.visibility),
                weather_code: self.weather.first().and_then(|condition| condition.id),
            },
        })
    }
}

/// Repeats each 3-hourly entry at +1h and +2h so the series is hourly.
fn expand_to_hourly(list: Vec<Observation>) -> Result<Vec<HourlySample>, ProviderError> {
    let mut samples = Vec::with_capacity(list.len() * FORECAST_STEP_HOURS);
    for observation in list {
        let sample = observation.into_sample()?;
        for offset in 1..FORECAST_STEP_HOURS as i64 {
            let mut repeated = sample.clone();
            repeated.time = sample.time.plus_hours(offset);
            samples.push(repeated);
        }
        samples.push(sample);
    }
    samples.sort_by_key(|sample| sample.time);
    Ok(samples)
}
