//! Tide state estimation.
//!
//! [`estimate_tide_state`] is a pure astronomical approximation: it follows
//! the moon's delay through a 12.42 h semidiurnal cycle and splits each cycle
//! into rising and falling quarters. It is roughly right most of the time and
//! exists so that every reading carries a tide state even without a tide
//! station. [`WorldTidesSource`] uses real high/low extremes when an API key is
//! configured and falls back to the estimate otherwise.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::datetime;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::adapters::{require_key, Upstream};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider_policy::{ProviderPolicy, WORLDTIDES};
use crate::{Coordinates, TideState, UtcDateTime};

const REFERENCE_NEW_MOON: OffsetDateTime = datetime!(2000-01-06 18:14 UTC);
const LUNAR_MONTH_DAYS: f64 = 29.530_59;
const SEMIDIURNAL_HOURS: f64 = 12.42;
/// Daily delay of the moon's meridian transit, in hours.
const LUNAR_DELAY_HOURS_PER_DAY: f64 = 0.84;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fraction of the extreme-to-extreme interval reported as `high`/`low`.
const SLACK_FRACTION: f64 = 0.05;

const WORLDTIDES_BASE_URL: &str = "https://www.worldtides.info";

/// Astronomical tide state at `at` for `coords`. Degenerate inputs yield `Rising`.
pub fn estimate_tide_state(coords: Coordinates, at: UtcDateTime) -> TideState {
    let at = at.into_inner();
    let days_since_reference = (at - REFERENCE_NEW_MOON).as_seconds_f64() / SECONDS_PER_DAY;
    let lunar_age = days_since_reference.rem_euclid(LUNAR_MONTH_DAYS);

    let utc_hour = f64::from(at.hour())
        + f64::from(at.minute()) / 60.0
        + f64::from(at.second()) / 3_600.0;
    let local_hour = (utc_hour + coords.longitude() / 15.0).rem_euclid(24.0);

    let position =
        (local_hour + lunar_age * LUNAR_DELAY_HOURS_PER_DAY).rem_euclid(SEMIDIURNAL_HOURS);
    if !position.is_finite() {
        return TideState::Rising;
    }

    let quarter = (position / (SEMIDIURNAL_HOURS / 4.0)) as u8;
    match quarter {
        0 | 2 => TideState::Rising,
        _ => TideState::Falling,
    }
}

/// Boxed future returned by [`TideSource::tide_states`].
pub type TideFuture<'a> = Pin<Box<dyn Future<Output = Vec<TideState>> + Send + 'a>>;

/// Tide state provider consumed by weather adapters. Never fails.
pub trait TideSource: Send + Sync {
    fn name(&self) -> &str;

    /// One state per instant in `at`, same order.
    fn tide_states<'a>(&'a self, coords: Coordinates, at: Vec<UtcDateTime>) -> TideFuture<'a>;
}

/// Offline tide source backed by [`estimate_tide_state`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AstronomicalTides;

impl TideSource for AstronomicalTides {
    fn name(&self) -> &str {
        "astronomical"
    }

    fn tide_states<'a>(&'a self, coords: Coordinates, at: Vec<UtcDateTime>) -> TideFuture<'a> {
        Box::pin(async move {
            at.into_iter()
                .map(|instant| estimate_tide_state(coords, instant))
                .collect()
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExtremesResponse {
    #[serde(default)]
    extremes: Vec<Extreme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum ExtremeKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Extreme {
    dt: i64,
    #[serde(rename = "type")]
    kind: ExtremeKind,
}

/// WorldTides extremes, falling back to the astronomical estimate per instant.
pub struct WorldTidesSource {
    upstream: Upstream,
    api_key: Option<String>,
    base_url: String,
}

impl WorldTidesSource {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            upstream: Upstream::new(&ProviderPolicy::worldtides_default(), http_client),
            api_key,
            base_url: String::from(WORLDTIDES_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_extremes(
        &self,
        coords: Coordinates,
        at: &[UtcDateTime],
    ) -> Result<Vec<Extreme>, crate::ProviderError> {
        let key = require_key(WORLDTIDES, self.api_key.as_deref())?;
        let (Some(first), Some(last)) = (at.iter().min(), at.iter().max()) else {
            return Ok(Vec::new());
        };

        // Extremes are roughly 6h apart; pad both ends so each instant is bracketed.
        let start = first.plus_hours(-12);
        let days = (last.since(start).whole_hours() / 24 + 2).clamp(1, 7);
        let url = format!(
            "{}/api/v3?extremes&lat={}&lon={}&start={}&days={}&key={}",
            self.base_url,
            coords.latitude(),
            coords.longitude(),
            start.unix_seconds(),
            days,
            urlencoding::encode(key)
        );

        let response: ExtremesResponse = self.upstream.fetch_json(HttpRequest::get(url)).await?;
        let mut extremes = response.extremes;
        extremes.sort_by_key(|extreme| extreme.dt);
        Ok(extremes)
    }
}

impl TideSource for WorldTidesSource {
    fn name(&self) -> &str {
        WORLDTIDES
    }

    fn tide_states<'a>(&'a self, coords: Coordinates, at: Vec<UtcDateTime>) -> TideFuture<'a> {
        Box::pin(async move {
            let extremes = match self.fetch_extremes(coords, &at).await {
                Ok(extremes) => extremes,
                Err(error) if error.is_not_configured() => {
                    debug!(error = %error, "worldtides skipped, using astronomical estimate");
                    Vec::new()
                }
                Err(error) => {
                    warn!(error = %error, "worldtides failed, using astronomical estimate");
                    Vec::new()
                }
            };

            at.into_iter()
                .map(|instant| {
                    state_from_extremes(&extremes, instant)
                        .unwrap_or_else(|| estimate_tide_state(coords, instant))
                })
                .collect()
        })
    }
}

/// Tide state between the bracketing extremes, or `None` if `at` is not bracketed.
fn state_from_extremes(extremes: &[Extreme], at: UtcDateTime) -> Option<TideState> {
    let now = at.unix_seconds();
    let previous = extremes.iter().rev().find(|extreme| extreme.dt <= now)?;
    let next = extremes.iter().find(|extreme| extreme.dt > now)?;

    let total = (next.dt - previous.dt) as f64;
    let progress = if total > 0.0 {
        (now - previous.dt) as f64 / total
    } else {
        0.5
    };

    let at_extreme = |kind: ExtremeKind| match kind {
        ExtremeKind::High => TideState::High,
        ExtremeKind::Low => TideState::Low,
    };

    Some(if progress < SLACK_FRACTION {
        at_extreme(previous.kind)
    } else if progress > 1.0 - SLACK_FRACTION {
        at_extreme(next.kind)
    } else {
        match previous.kind {
            ExtremeKind::High => TideState::Falling,
            ExtremeKind::Low => TideState::Rising,
        }
    })
}
