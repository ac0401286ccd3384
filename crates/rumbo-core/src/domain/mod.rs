pub mod coordinates;
pub mod reading;
pub mod timestamp;
pub mod units;

pub use coordinates::{CoordinateBucket, Coordinates};
pub use reading::{
    Atmosphere, NormalizedReading, RelativeDirection, Tide, TideState, Waves, Wind,
    STALE_PROVIDER_PREFIX,
};
pub use timestamp::UtcDateTime;
