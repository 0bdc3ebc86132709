//! Pure normalization pipeline run once per render:
//! canonicalize → filter invalid prices → optional weekly/monthly bucketing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::market_hours::MARKET_TIME_ZONE;
use crate::core::types::{ChartRange, Sample};

/// Aggregation granularity applied before positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BucketKind {
    #[default]
    None,
    Weekly,
    Monthly,
}

impl BucketKind {
    #[must_use]
    pub fn for_range(range: ChartRange) -> Self {
        match range {
            ChartRange::YearToDate | ChartRange::OneYear => BucketKind::Weekly,
            ChartRange::FiveYears => BucketKind::Monthly,
            ChartRange::OneDay
            | ChartRange::OneWeek
            | ChartRange::OneMonth
            | ChartRange::ThreeMonths => BucketKind::None,
        }
    }

    /// Bucket key for a local date: Monday of its week or first of its month.
    #[must_use]
    pub fn key_for(self, date: NaiveDate) -> NaiveDate {
        match self {
            BucketKind::None => date,
            BucketKind::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            BucketKind::Monthly => date.with_day(1).unwrap_or(date),
        }
    }
}

/// Sorts by timestamp and keeps the last sample of any duplicated timestamp,
/// restoring the strictly ascending order every regime relies on.
#[must_use]
pub fn canonicalize(mut samples: Vec<Sample>) -> Vec<Sample> {
    samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut deduped: Vec<Sample> = Vec::with_capacity(samples.len());
    for sample in samples {
        if let Some(last) = deduped.last_mut() {
            if sample.timestamp.cmp(&last.timestamp) == Ordering::Equal {
                *last = sample;
                continue;
            }
        }
        deduped.push(sample);
    }
    deduped
}

/// Drops samples where any of open/high/low/close is non-positive or not finite.
#[must_use]
pub fn filter_valid(samples: &[Sample]) -> Vec<Sample> {
    samples
        .iter()
        .copied()
        .filter(Sample::has_positive_prices)
        .collect()
}

/// Groups samples into buckets keyed in the exchange time zone.
#[must_use]
pub fn aggregate(samples: &[Sample], kind: BucketKind) -> Vec<Sample> {
    aggregate_in(samples, kind, MARKET_TIME_ZONE)
}

/// Groups samples into weekly or monthly OHLC buckets keyed by local date in `tz`.
///
/// Each bucket takes the first constituent's open, the last constituent's
/// close, the extreme high/low and the summed volume. The bucket timestamp is
/// local midnight of its key date.
#[must_use]
pub fn aggregate_in(samples: &[Sample], kind: BucketKind, tz: Tz) -> Vec<Sample> {
    if kind == BucketKind::None || samples.is_empty() {
        return samples.to_vec();
    }

    let mut ordered = samples.to_vec();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut buckets: BTreeMap<NaiveDate, Sample> = BTreeMap::new();
    for sample in ordered {
        let local_date = sample.timestamp.with_timezone(&tz).date_naive();
        let key = kind.key_for(local_date);
        buckets
            .entry(key)
            .and_modify(|bucket| {
                bucket.high = bucket.high.max(sample.high);
                bucket.low = bucket.low.min(sample.low);
                bucket.close = sample.close;
                bucket.volume += sample.volume;
            })
            .or_insert_with(|| Sample {
                timestamp: local_midnight(key, tz).unwrap_or(sample.timestamp),
                session: None,
                ..sample
            });
    }

    buckets.into_values().collect()
}

/// Full per-render pipeline for a range.
#[must_use]
pub fn normalize(samples: Vec<Sample>, range: ChartRange) -> Vec<Sample> {
    let canonical = canonicalize(samples);
    let valid = filter_valid(&canonical);
    aggregate(&valid, BucketKind::for_range(range))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
