//! Environment-driven configuration.
//!
//! | Knob | Env var | Fallback | Default |
//! |------|---------|----------|---------|
//! | Fresh TTL (minutes) | `RUMBO_FRESH_MINUTES` | - | 30 |
//! | Stale ceiling (hours) | `RUMBO_STALE_HOURS` | - | 6 |
//! | Provider order | `RUMBO_PROVIDERS` | - | `stormglass,windy,openweather,openmeteo` |
//! | Stormglass key | `RUMBO_STORMGLASS_API_KEY` | `STORMGLASS_API_KEY` | unset |
//! | Windy key | `RUMBO_WINDY_API_KEY` | `WINDY_API_KEY` | unset |
//! | OpenWeather key | `RUMBO_OPENWEATHER_API_KEY` | `OPENWEATHER_API_KEY` | unset |
//! | WorldTides key | `RUMBO_WORLDTIDES_API_KEY` | `WORLDTIDES_API_KEY` | unset |
//! | HTTP timeout (s) | `RUMBO_HTTP_TIMEOUT_SECS` | - | 10 |
//! | Connect timeout (s) | `RUMBO_HTTP_CONNECT_TIMEOUT_SECS` | - | 5 |
//! | Attempts per request | `RUMBO_HTTP_MAX_ATTEMPTS` | - | 3 |
//!
//! Blank values are treated as unset.

use std::time::Duration;

use crate::cache::CachePolicy;
use crate::http_client::HttpSettings;
use crate::{ConfigError, ProviderId};

pub const FRESH_MINUTES_VAR: &str = "RUMBO_FRESH_MINUTES";
pub const STALE_HOURS_VAR: &str = "RUMBO_STALE_HOURS";
pub const PROVIDERS_VAR: &str = "RUMBO_PROVIDERS";
pub const HTTP_TIMEOUT_VAR: &str = "RUMBO_HTTP_TIMEOUT_SECS";
pub const HTTP_CONNECT_TIMEOUT_VAR: &str = "RUMBO_HTTP_CONNECT_TIMEOUT_SECS";
pub const HTTP_MAX_ATTEMPTS_VAR: &str = "RUMBO_HTTP_MAX_ATTEMPTS";

const PREFIX: &str = "RUMBO_";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RumboConfig {
    pub cache_policy: CachePolicy,
    pub provider_order: Vec<ProviderId>,
    pub stormglass_api_key: Option<String>,
    pub windy_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub worldtides_api_key: Option<String>,
    pub http: HttpSettings,
}

impl Default for RumboConfig {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::default(),
            provider_order: ProviderId::ALL.to_vec(),
            stormglass_api_key: None,
            windy_api_key: None,
            openweather_api_key: None,
            worldtides_api_key: None,
            http: HttpSettings::default(),
        }
    }
}

impl RumboConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns the raw value of an
    /// environment variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        let http_defaults = defaults.http;

        let fresh_minutes = parse_number(FRESH_MINUTES_VAR, get(FRESH_MINUTES_VAR), 30)?;
        let stale_hours = parse_number(STALE_HOURS_VAR, get(STALE_HOURS_VAR), 6)?;

        let provider_order = match get(PROVIDERS_VAR) {
            Some(raw) => parse_provider_order(&raw)?,
            None => defaults.provider_order,
        };

        let timeout_secs = parse_number(
            HTTP_TIMEOUT_VAR,
            get(HTTP_TIMEOUT_VAR),
            http_defaults.timeout.as_secs(),
        )?;
        let connect_timeout_secs = parse_number(
            HTTP_CONNECT_TIMEOUT_VAR,
            get(HTTP_CONNECT_TIMEOUT_VAR),
            http_defaults.connect_timeout.as_secs(),
        )?;
        let max_attempts = parse_number(
            HTTP_MAX_ATTEMPTS_VAR,
            get(HTTP_MAX_ATTEMPTS_VAR),
            u64::from(http_defaults.max_attempts),
        )?;

        let api_key = |name: &str| get(&format!("{PREFIX}{name}")).or_else(|| get(name));

        Ok(Self {
            cache_policy: CachePolicy::from_minutes_and_hours(fresh_minutes, stale_hours),
            provider_order,
            stormglass_api_key: api_key("STORMGLASS_API_KEY"),
            windy_api_key: api_key("WINDY_API_KEY"),
            openweather_api_key: api_key("OPENWEATHER_API_KEY"),
            worldtides_api_key: api_key("WORLDTIDES_API_KEY"),
            http: HttpSettings {
                timeout: Duration::from_secs(timeout_secs),
                connect_timeout: Duration::from_secs(connect_timeout_secs),
                max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
                ..http_defaults
            },
        })
    }

    /// API key configured for `provider`, if any.
    pub fn api_key(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Stormglass => self.stormglass_api_key.as_deref(),
            ProviderId::Windy => self.windy_api_key.as_deref(),
            ProviderId::OpenWeather => self.openweather_api_key.as_deref(),
            ProviderId::OpenMeteo => None,
        }
    }

    /// Whether `provider` can be called at all with this configuration.
    pub fn is_configured(&self, provider: ProviderId) -> bool {
        !provider.requires_api_key() || self.api_key(provider).is_some()
    }
}

fn parse_number(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}

/// Parses a comma-separated provider list, dropping duplicates.
fn parse_provider_order(raw: &str) -> Result<Vec<ProviderId>, ConfigError> {
    let mut order = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let provider = item
            .parse::<ProviderId>()
            .map_err(|source| ConfigError::InvalidProvider {
                var: PROVIDERS_VAR,
                source,
            })?;
        if !order.contains(&provider) {
            order.push(provider);
        }
    }

    if order.is_empty() {
        return Err(ConfigError::EmptyProviderOrder { var: PROVIDERS_VAR });
    }
    Ok(order)
}
