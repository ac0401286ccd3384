use std::sync::Arc;

use serde::Deserialize;

use crate::adapters::{first_reading, readings_from_samples, require_key, HourlySample, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{ProviderError, SourceFuture, WeatherSource};
use crate::domain::units;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::ProviderPolicy;
use crate::tide::TideSource;
use crate::{
    Atmosphere, Coordinates, NormalizedReading, ProviderId, UtcDateTime, ValidationError, Waves,
    Wind,
};

const BASE_URL: &str = "https://api.stormglass.io";
const PARAMS: &str = "windSpeed,windDirection,waveHeight,wavePeriod,waveDirection,\
airTemperature,precipitation,cloudCover,visibility";
const SOURCES: &str = "sg,noaa,icon";

/// Stormglass point forecast adapter. Marine-first: waves and wind in one call.
pub struct StormglassAdapter {
    upstream: Upstream,
    api_key: Option<String>,
    base_url: String,
    tides: Arc<dyn TideSource>,
}

impl StormglassAdapter {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: Option<String>,
        tides: Arc<dyn TideSource>,
    ) -> Self {
        Self {
            upstream: Upstream::new(&ProviderPolicy::stormglass_default(), http_client),
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

    async fn fetch_readings(
        &self,
        coords: Coordinates,
        hours: usize,
    ) -> Result<Vec<NormalizedReading>, ProviderError> {
        let key = require_key(self.name(), self.api_key.as_deref())?;

        let now = UtcDateTime::now();
        let start = now.truncate_to_hour();
        let end = start.plus_hours(i64::try_from(hours).unwrap_or(i64::MAX).min(72));
        let url = format!(
            "{}/v2/weather/point?lat={}&lng={}&params={}&source={}&start={}&end={}",
            self.base_url,
            coords.latitude(),
            coords.longitude(),
            PARAMS,
            SOURCES,
            start.unix_seconds(),
            end.unix_seconds()
        );
        let request = HttpRequest::get(url).with_header("authorization", key);

        let response: PointResponse = self.upstream.fetch_json(request).await?;
        let samples = response
            .hours
            .into_iter()
            .map(HourlySample::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| {
                ProviderError::malformed(format!("stormglass returned a bad timestamp: {error}"))
            })?;

        readings_from_samples(
            self.name(),
            coords,
            samples,
            now,
            hours,
            self.tides.as_ref(),
        )
        .await
    }
}

impl WeatherSource for StormglassAdapter {
    fn name(&self) -> &str {
        ProviderId::Stormglass.as_str()
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
struct PointResponse {
    #[serde(default)]
    hours: Vec<PointHour>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointHour {
    time: String,
    wind_speed: Option<SourceValues>,
    wind_direction: Option<SourceValues>,
    wave_height: Option<SourceValues>,
    wave_period: Option<SourceValues>,
    wave_direction: Option<SourceValues>,
    air_temperature: Option<SourceValues>,
    precipitation: Option<SourceValues>,
    cloud_cover: Option<SourceValues>,
    visibility: Option<SourceValues>,
}

/// Per-model values for one parameter.
#[derive(Debug, Default, Deserialize)]
struct SourceValues {
    sg: Option<f64>,
    noaa: Option<f64>,
    icon: Option<f64>,
}

impl SourceValues {
    /// First finite value in `sg`, `noaa`, `icon` order.
    fn best(&self) -> Option<f64> {
        [self.sg, self.noaa, self.icon]
            .into_iter()
            .find_map(units::finite)
    }
}

fn best(values: &Option<SourceValues>) -> Option<f64> {
    values.as_ref().and_then(SourceValues::best)
}

impl TryFrom<PointHour> for HourlySample {
    type Error = ValidationError;

    fn try_from(hour: PointHour) -> Result<Self, Self::Error> {
        Ok(Self {
            time: UtcDateTime::parse(&hour.time)?,
            wind: Wind {
                speed_kmh: units::ms_to_kmh(best(&hour.wind_speed)),
                direction_deg: units::normalize_direction(best(&hour.wind_direction)),
                relative_direction: None,
            },
            waves: Waves {
                height_m: best(&hour.wave_height).map(units::round1),
                period_s: best(&hour.wave_period).map(units::round1),
                direction_deg: units::normalize_direction(best(&hour.wave_direction)),
            },
            atmosphere: Atmosphere {
                temperature_c: best(&hour.air_temperature).map(units::round1),
                precipitation_mm: best(&hour.precipitation).map(units::round1),
                cloud_cover_pct: best(&hour.cloud_cover).map(units::round1),
                uv_index: None,
                visibility_km: best(&hour.visibility).map(units::round1),
                weather_code: None,
            },
        })
    }
}
