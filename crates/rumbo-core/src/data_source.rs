//! Provider adapter contract.
//!
//! Every upstream weather API is wrapped in a type implementing
//! [`WeatherSource`]. The hybrid provider holds an ordered list of them and
//! only ever sees [`ProviderError`]s, never transport or parsing details.
//!
//! | Operation | Output | Fails when |
//! |-----------|--------|------------|
//! | [`get_conditions`](WeatherSource::get_conditions) | one [`NormalizedReading`] | not configured, unreachable, non-2xx, no usable series |
//! | [`get_forecast`](WeatherSource::get_forecast) | hourly readings from the current hour, at most `hours` long | same as above |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Coordinates, NormalizedReading};

/// Hybrid provider operation, used for cache keys, logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Conditions,
    Forecast,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conditions => "conditions",
            Self::Forecast => "forecast",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Missing API key; no network attempt was made.
    NotConfigured,
    /// Network failure after retries, or circuit breaker open.
    Unavailable,
    /// Upstream answered with a non-success status.
    UpstreamStatus,
    /// Upstream quota (402/429) or local quota exhausted.
    RateLimited,
    /// Empty time series or a reading without any signal.
    NoData,
    /// Payload could not be decoded.
    Malformed,
}

/// Structured provider error absorbed by the hybrid provider's fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn not_configured(provider: &str) -> Self {
        Self {
            kind: ProviderErrorKind::NotConfigured,
            message: format!("{provider} API key is not configured"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream_status(provider: &str, status: u16) -> Self {
        Self {
            kind: ProviderErrorKind::UpstreamStatus,
            message: format!("{provider} returned status {status}"),
            retryable: status >= 500,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::NoData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn is_not_configured(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::NotConfigured)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::NotConfigured => "provider.not_configured",
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::UpstreamStatus => "provider.upstream_status",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::NoData => "provider.no_data",
            ProviderErrorKind::Malformed => "provider.malformed",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Boxed future returned by [`WeatherSource`] operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Weather provider adapter contract.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// concurrent request walking the fallback chain.
pub trait WeatherSource: Send + Sync {
    /// Identifier written into the `provider` field of produced readings.
    fn name(&self) -> &str;

    /// Current conditions for `coords`.
    fn get_conditions<'a>(&'a self, coords: Coordinates) -> SourceFuture<'a, NormalizedReading>;

    /// Hourly forecast starting at the current UTC hour, at most `hours` entries long.
    fn get_forecast<'a>(
        &'a self,
        coords: Coordinates,
        hours: usize,
    ) -> SourceFuture<'a, Vec<NormalizedReading>>;
}
