//! Index selection over hourly provider time series.

use std::ops::Range;

use crate::UtcDateTime;

/// Index of the first timestamp at or after the current UTC hour.
///
/// Falls back to the last entry when every timestamp is in the past, and to
/// `0` for an empty series.
pub fn start_index(times: &[UtcDateTime], now: UtcDateTime) -> usize {
    let current_hour = now.truncate_to_hour();
    times
        .iter()
        .position(|time| *time >= current_hour)
        .unwrap_or_else(|| times.len().saturating_sub(1))
}

/// Clamps `index` into `0..len` (or `0` when `len == 0`).
pub fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

/// Value at `index` of a parallel array, clamped to the array length.
pub fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values
        .get(clamp_index(index, values.len()))
        .copied()
        .flatten()
}

/// Indexes covering at most `hours` entries from `start`.
pub fn window(start: usize, len: usize, hours: usize) -> Range<usize> {
    let start = start.min(len);
    start..start.saturating_add(hours).min(len)
}
