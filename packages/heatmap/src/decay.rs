//! Exponential time-decay weighting.

use chrono::{DateTime, Utc};

/// Smallest permitted decay constant, in hours. Keeps the exponential
/// well-defined when a caller passes tau ≤ 0.
pub const MIN_TAU_HOURS: f64 = 1e-6;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Returns `base * exp(-elapsed_hours / tau)` where `elapsed_hours` is
/// the time from `event_time` to `reference` in hours.
///
/// `tau_hours` is floored at [`MIN_TAU_HOURS`]. An event after the
/// reference time yields a weight above `base`; callers are expected to
/// only feed events at or before the reference.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decayed_weight(
    event_time: DateTime<Utc>,
    reference: DateTime<Utc>,
    tau_hours: f64,
    base: f64,
) -> f64 {
    let tau = tau_hours.max(MIN_TAU_HOURS);
    let elapsed_hours = (reference - event_time).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    base * (-elapsed_hours / tau).exp()
}
