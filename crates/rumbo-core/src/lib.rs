//! Core contracts for rumbo.
//!
//! This crate contains:
//! - Normalized marine reading model and coordinate buckets
//! - Provider identifiers, adapter trait and error taxonomy
//! - Resilient HTTP transport, circuit breakers and quota throttling
//! - Astronomical and WorldTides tide sources
//! - Provider adapters (Stormglass, Windy, OpenWeather, Open-Meteo)
//! - The hybrid provider: fallback chain over a fresh/stale cache

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod hybrid;
pub mod provider_policy;
pub mod retry;
pub mod source;
pub mod throttling;
pub mod tide;
pub mod timeline;

pub use adapters::{OpenMeteoAdapter, OpenWeatherAdapter, StormglassAdapter, WindyAdapter};
pub use cache::{CacheHit, CacheKey, CachePolicy, CacheTier, CachedPayload, WeatherCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::RumboConfig;
pub use data_source::{
    Endpoint, ProviderError, ProviderErrorKind, SourceFuture, WeatherSource,
};
pub use domain::{
    Atmosphere, CoordinateBucket, Coordinates, NormalizedReading, RelativeDirection, Tide,
    TideState, UtcDateTime, Waves, Wind, STALE_PROVIDER_PREFIX,
};
pub use error::{ConfigError, ProviderFailure, ServiceUnavailable, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse, HttpSettings,
    ReqwestHttpClient, ResilientHttpClient,
};
pub use hybrid::{
    HybridProvider, HybridProviderBuilder, Origin, Served, DEFAULT_FORECAST_HOURS,
    MAX_FORECAST_HOURS,
};
pub use provider_policy::ProviderPolicy;
pub use retry::{Backoff, RetryConfig};
pub use source::ProviderId;
pub use throttling::QuotaThrottle;
pub use tide::{estimate_tide_state, AstronomicalTides, TideSource, WorldTidesSource};
