use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Decimal places kept when bucketing coordinates (about 1.1 km at the equator).
pub const BUCKET_DECIMALS: u32 = 2;

const BUCKET_SCALE: f64 = 100.0;

/// Validated geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "latitude" });
        }
        if !longitude.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "longitude" });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange { value: latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange { value: longitude });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    pub fn bucket(self) -> CoordinateBucket {
        CoordinateBucket {
            latitude: round_to_bucket(self.latitude),
            longitude: round_to_bucket(self.longitude),
        }
    }
}

/// Coordinates rounded to [`BUCKET_DECIMALS`]; nearby requests share one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateBucket {
    latitude: f64,
    longitude: f64,
}

impl CoordinateBucket {
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    pub const fn longitude(self) -> f64 {
        self.longitude
    }

    /// Cache key for the bucket, e.g. `-38.01,-57.53`.
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl Display for CoordinateBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2},{:.2}", self.latitude, self.longitude)
    }
}

fn round_to_bucket(value: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so both sides of the meridian share a key.
    (value * BUCKET_SCALE).round() / BUCKET_SCALE + 0.0
}
