use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ChartError, ChartResult};

/// Smallest denominator used by every ratio in the mapping pipeline.
pub const MIN_DENOMINATOR: f64 = 1e-9;

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

#[must_use]
pub fn duration_seconds(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

/// Seconds elapsed from `start` to `end` (negative when `end` precedes `start`).
#[must_use]
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    duration_seconds(end - start)
}

/// Divides with an epsilon-guarded denominator so degenerate spans never
/// produce NaN or infinities.
#[must_use]
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    let denominator = if denominator.abs() < MIN_DENOMINATOR {
        MIN_DENOMINATOR.copysign(if denominator == 0.0 { 1.0 } else { denominator })
    } else {
        denominator
    };
    numerator / denominator
}
