//! Unit conversions shared by provider adapters. Non-finite inputs become `None`.

const KMH_PER_MS: f64 = 3.6;
const KELVIN_OFFSET: f64 = 273.15;

pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Metres per second to km/h, rounded to one decimal.
pub fn ms_to_kmh(value: Option<f64>) -> Option<f64> {
    finite(value).map(|ms| round1(ms * KMH_PER_MS))
}

pub fn kelvin_to_celsius(value: Option<f64>) -> Option<f64> {
    finite(value).map(|k| round1(k - KELVIN_OFFSET))
}

pub fn metres_to_km(value: Option<f64>) -> Option<f64> {
    finite(value).map(|m| round1(m / 1_000.0))
}

/// Wraps a bearing into `[0, 360)`.
pub fn normalize_direction(value: Option<f64>) -> Option<f64> {
    finite(value).map(|deg| {
        let wrapped = deg.rem_euclid(360.0);
        if wrapped >= 359.95 {
            0.0
        } else {
            round1(wrapped)
        }
    })
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
