use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::ProviderId;

/// Upstream service name used by the WorldTides tide source.
pub const WORLDTIDES: &str = "worldtides";

/// Local quota and breaker settings for one upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub name: &'static str,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub circuit_breaker: CircuitBreakerConfig,
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const MINUTE: Duration = Duration::from_secs(60);

impl ProviderPolicy {
    /// Stormglass free tier: 10 requests per day.
    pub fn stormglass_default() -> Self {
        Self::new(ProviderId::Stormglass.as_str(), DAY, 10)
    }

    pub fn windy_default() -> Self {
        Self::new(ProviderId::Windy.as_str(), DAY, 500)
    }

    /// OpenWeather free tier: 60 calls per minute.
    pub fn openweather_default() -> Self {
        Self::new(ProviderId::OpenWeather.as_str(), MINUTE, 60)
    }

    pub fn openmeteo_default() -> Self {
        Self::new(ProviderId::OpenMeteo.as_str(), MINUTE, 600)
    }

    pub fn worldtides_default() -> Self {
        Self::new(WORLDTIDES, DAY, 100)
    }

    pub fn default_for(provider: ProviderId) -> Self {
        match provider {
            ProviderId::Stormglass => Self::stormglass_default(),
            ProviderId::Windy => Self::windy_default(),
            ProviderId::OpenWeather => Self::openweather_default(),
            ProviderId::OpenMeteo => Self::openmeteo_default(),
        }
    }

    fn new(name: &'static str, quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            name,
            quota_window,
            quota_limit,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}
