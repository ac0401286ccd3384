use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical identifiers of the built-in weather providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Stormglass,
    Windy,
    OpenWeather,
    OpenMeteo,
}

impl ProviderId {
    /// Default priority: paid marine source first, free universal source last.
    pub const ALL: [Self; 4] = [Self::Stormglass, Self::Windy, Self::OpenWeather, Self::OpenMeteo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stormglass => "stormglass",
            Self::Windy => "windy",
            Self::OpenWeather => "openweather",
            Self::OpenMeteo => "openmeteo",
        }
    }

    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::OpenMeteo)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stormglass" => Ok(Self::Stormglass),
            "windy" => Ok(Self::Windy),
            "openweather" => Ok(Self::OpenWeather),
            "openmeteo" | "open-meteo" => Ok(Self::OpenMeteo),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
