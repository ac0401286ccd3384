use serde::Serialize;
use thiserror::Error;

use crate::data_source::Endpoint;

/// Validation errors for values accepted by `rumbo-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange { value: f64 },

    #[error("invalid provider '{value}', expected one of stormglass, windy, openweather, openmeteo")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 or YYYY-MM-DDTHH:MM (UTC): '{value}'")]
    InvalidTimestamp { value: String },
}

/// Errors raised while reading configuration knobs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: {source}")]
    InvalidProvider {
        var: &'static str,
        #[source]
        source: ValidationError,
    },

    #[error("{var} must name at least one provider")]
    EmptyProviderOrder { var: &'static str },
}

/// One provider attempt that was absorbed while resolving a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub code: &'static str,
    pub message: String,
}

/// Terminal failure of the hybrid provider: every provider failed and no
/// cache tier held a usable entry for the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "weather service temporarily unavailable for {endpoint} at {bucket}: \
     {} provider attempt(s) failed and no cached data is usable",
    .failures.len()
)]
pub struct ServiceUnavailable {
    pub endpoint: Endpoint,
    pub bucket: String,
    pub failures: Vec<ProviderFailure>,
    pub latency_ms: u64,
}
