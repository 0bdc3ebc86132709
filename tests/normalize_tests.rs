use catalyst_chart::core::normalize::{BucketKind, aggregate, canonicalize, filter_valid, normalize};
use catalyst_chart::core::{ChartRange, PricePoint, Sample, SessionKind};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid utc instant")
}

fn daily(start: DateTime<Utc>, closes: &[f64]) -> Vec<Sample> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let open = close - 0.5;
            Sample::new(
                start + Duration::days(i as i64),
                open,
                close + 1.0,
                open - 1.0,
                *close,
                100.0,
            )
        })
        .collect()
}

#[test]
fn weekly_bucket_folds_ohlc_of_its_constituents() {
    // Mon 2024-06-03 .. Fri 2024-06-07 at 16:00 New York.
    let samples = vec![
        Sample::new(utc(2024, 6, 3, 20, 0), 10.0, 12.0, 9.0, 11.0, 100.0),
        Sample::new(utc(2024, 6, 4, 20, 0), 11.0, 15.0, 10.5, 14.0, 200.0),
        Sample::new(utc(2024, 6, 5, 20, 0), 14.0, 14.5, 8.0, 9.0, 300.0),
        Sample::new(utc(2024, 6, 7, 20, 0), 9.0, 10.0, 8.5, 9.5, 400.0),
    ];

    let buckets = aggregate(&samples, BucketKind::Weekly);
    assert_eq!(buckets.len(), 1);
    let week = buckets[0];
    assert_eq!(week.open, 10.0);
    assert_eq!(week.close, 9.5);
    assert_eq!(week.high, 15.0);
    assert_eq!(week.low, 8.0);
    assert_eq!(week.volume, 1_000.0);
    // Local midnight of Monday 2024-06-03 in New York (EDT).
    assert_eq!(week.timestamp, utc(2024, 6, 3, 4, 0));
    assert_eq!(week.session, None);
}

#[test]
fn weekly_buckets_split_on_monday() {
    // Fri, Mon, Tue.
    let samples = vec![
        Sample::new(utc(2024, 6, 7, 20, 0), 1.0, 1.0, 1.0, 1.0, 1.0),
        Sample::new(utc(2024, 6, 10, 20, 0), 2.0, 2.0, 2.0, 2.0, 1.0),
        Sample::new(utc(2024, 6, 11, 20, 0), 3.0, 3.0, 3.0, 3.0, 1.0),
    ];
    let buckets = aggregate(&samples, BucketKind::Weekly);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].close, 1.0);
    assert_eq!(buckets[1].open, 2.0);
    assert_eq!(buckets[1].close, 3.0);
}

#[test]
fn monthly_key_uses_local_date_not_utc_date() {
    // 2024-07-01 02:00 UTC is still June 30th in New York.
    let samples = vec![
        Sample::new(utc(2024, 6, 28, 20, 0), 5.0, 6.0, 4.0, 5.5, 10.0),
        Sample::new(utc(2024, 7, 1, 2, 0), 5.5, 7.0, 5.0, 6.5, 10.0),
        Sample::new(utc(2024, 7, 2, 20, 0), 6.5, 6.8, 6.0, 6.2, 10.0),
    ];
    let buckets = aggregate(&samples, BucketKind::Monthly);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].close, 6.5);
    assert_eq!(buckets[0].high, 7.0);
    assert_eq!(buckets[1].open, 6.5);
}

#[test]
fn bucket_keys_match_week_and_month_starts() {
    let wednesday = NaiveDate::from_ymd_opt(2024, 6, 5).expect("date");
    assert_eq!(
        BucketKind::Weekly.key_for(wednesday),
        NaiveDate::from_ymd_opt(2024, 6, 3).expect("date")
    );
    assert_eq!(
        BucketKind::Monthly.key_for(wednesday),
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
    );
    assert_eq!(BucketKind::None.key_for(wednesday), wednesday);
}

#[test]
fn range_selects_bucket_granularity() {
    assert_eq!(BucketKind::for_range(ChartRange::OneDay), BucketKind::None);
    assert_eq!(BucketKind::for_range(ChartRange::ThreeMonths), BucketKind::None);
    assert_eq!(BucketKind::for_range(ChartRange::YearToDate), BucketKind::Weekly);
    assert_eq!(BucketKind::for_range(ChartRange::OneYear), BucketKind::Weekly);
    assert_eq!(BucketKind::for_range(ChartRange::FiveYears), BucketKind::Monthly);
}

#[test]
fn invalid_prices_are_filtered() {
    let t = utc(2024, 6, 3, 20, 0);
    let samples = vec![
        Sample::new(t, 1.0, 1.0, 1.0, 1.0, 0.0),
        Sample::new(t + Duration::days(1), 0.0, 1.0, 1.0, 1.0, 0.0),
        Sample::new(t + Duration::days(2), 1.0, 1.0, -1.0, 1.0, 0.0),
        Sample::new(t + Duration::days(3), 1.0, f64::NAN, 1.0, 1.0, 0.0),
        Sample::new(t + Duration::days(4), 2.0, 2.0, 2.0, 2.0, 0.0),
    ];
    let valid = filter_valid(&samples);
    assert_eq!(valid.len(), 2);
    assert_eq!(valid[1].close, 2.0);
}

#[test]
fn canonicalize_sorts_and_keeps_last_duplicate() {
    let t = utc(2024, 6, 3, 14, 0);
    let samples = vec![
        Sample::new(t + Duration::minutes(5), 2.0, 2.0, 2.0, 2.0, 0.0),
        Sample::new(t, 1.0, 1.0, 1.0, 1.0, 0.0),
        Sample::new(t + Duration::minutes(5), 3.0, 3.0, 3.0, 3.0, 0.0)
            .with_session(SessionKind::Regular),
    ];
    let canonical = canonicalize(samples);
    assert_eq!(canonical.len(), 2);
    assert_eq!(canonical[0].close, 1.0);
    assert_eq!(canonical[1].close, 3.0);
    assert_eq!(canonical[1].session, Some(SessionKind::Regular));
}

#[test]
fn normalize_leaves_short_ranges_unbucketed() {
    let samples = daily(utc(2024, 6, 3, 20, 0), &[10.0, 11.0, 12.0, 13.0]);
    let normalized = normalize(samples.clone(), ChartRange::OneMonth);
    assert_eq!(normalized, samples);
}

#[test]
fn price_points_become_flat_samples() {
    let point = PricePoint::new(utc(2024, 6, 3, 20, 0), 42.5);
    let sample = Sample::from(point);
    assert_eq!(sample.open, 42.5);
    assert_eq!(sample.high, 42.5);
    assert_eq!(sample.low, 42.5);
    assert_eq!(sample.close, 42.5);
    assert_eq!(sample.volume, 0.0);
}

proptest! {
    #[test]
    fn weekly_aggregation_preserves_extremes_and_volume(
        closes in prop::collection::vec(1.0f64..500.0, 1..120)
    ) {
        let samples = daily(utc(2024, 1, 2, 20, 0), &closes);
        let buckets = aggregate(&samples, BucketKind::Weekly);

        let total_in: f64 = samples.iter().map(|s| s.volume).sum();
        let total_out: f64 = buckets.iter().map(|s| s.volume).sum();
        prop_assert!((total_in - total_out).abs() <= 1e-6);

        let max_high = samples.iter().map(|s| s.high).fold(f64::MIN, f64::max);
        let bucket_max = buckets.iter().map(|s| s.high).fold(f64::MIN, f64::max);
        prop_assert_eq!(max_high, bucket_max);

        prop_assert_eq!(buckets.first().map(|b| b.open), samples.first().map(|s| s.open));
        prop_assert_eq!(buckets.last().map(|b| b.close), samples.last().map(|s| s.close));

        for pair in buckets.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
        for bucket in &buckets {
            prop_assert!(bucket.low <= bucket.open.min(bucket.close));
            prop_assert!(bucket.high >= bucket.open.max(bucket.close));
        }
    }

    #[test]
    fn canonical_series_is_strictly_ascending(
        offsets in prop::collection::vec(0i64..500, 0..80)
    ) {
        let base = utc(2024, 6, 3, 13, 30);
        let samples: Vec<Sample> = offsets
            .iter()
            .map(|minutes| Sample::new(base + Duration::minutes(*minutes), 1.0, 1.0, 1.0, 1.0, 0.0))
            .collect();
        let canonical = canonicalize(samples);
        for pair in canonical.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }
}
