use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::UtcDateTime;

/// Provider prefix applied to readings served from the stale cache tier.
pub const STALE_PROVIDER_PREFIX: &str = "stale:";

/// Estimated tide state; always present on a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideState {
    Rising,
    Falling,
    High,
    Low,
}

impl TideState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

impl Display for TideState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wind direction relative to the shoreline. Computed downstream, never by providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeDirection {
    Onshore,
    Offshore,
    Cross,
}

/// Wind block. `None` means the provider did not report the value; `Some(0.0)` is calm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_kmh: Option<f64>,
    pub direction_deg: Option<f64>,
    pub relative_direction: Option<RelativeDirection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waves {
    pub height_m: Option<f64>,
    pub period_s: Option<f64>,
    pub direction_deg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    pub temperature_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub uv_index: Option<f64>,
    pub visibility_km: Option<f64>,
    pub weather_code: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tide {
    pub state: TideState,
}

/// Canonical weather snapshot for one coordinate and instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReading {
    pub wind: Wind,
    pub waves: Waves,
    pub atmosphere: Atmosphere,
    pub tide: Tide,
    pub timestamp: UtcDateTime,
    pub provider: String,
}

impl NormalizedReading {
    /// Creates a reading with every measured field absent.
    pub fn new(timestamp: UtcDateTime, provider: impl Into<String>, tide: TideState) -> Self {
        Self {
            wind: Wind::default(),
            waves: Waves::default(),
            atmosphere: Atmosphere::default(),
            tide: Tide { state: tide },
            timestamp,
            provider: provider.into(),
        }
    }

    pub fn with_wind(mut self, wind: Wind) -> Self {
        self.wind = wind;
        self
    }

    pub fn with_waves(mut self, waves: Waves) -> Self {
        self.waves = waves;
        self
    }

    pub fn with_atmosphere(mut self, atmosphere: Atmosphere) -> Self {
        self.atmosphere = atmosphere;
        self
    }

    /// A reading carrying neither wind speed nor wave height has no usable signal.
    pub fn is_zombie(&self) -> bool {
        self.wind.speed_kmh.is_none() && self.waves.height_m.is_none()
    }

    pub fn is_stale_served(&self) -> bool {
        self.provider.starts_with(STALE_PROVIDER_PREFIX)
    }

    /// Tags the provider as `stale:<provider>`. Idempotent.
    pub fn into_stale_served(mut self) -> Self {
        if !self.is_stale_served() {
            self.provider = format!("{STALE_PROVIDER_PREFIX}{}", self.provider);
        }
        self
    }
}
