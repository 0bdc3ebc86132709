use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use catalyst_chart::core::normalize::BucketKind;
use catalyst_chart::core::{
    ChartRange, CoordinateMapper, FutureWindowConfig, PlotArea, PositioningRegime, PriceScale,
    Sample, SectionGeometry, ViewportLayout,
};
use catalyst_chart::extensions::events::{future_fraction, historical_match_tolerance};
use catalyst_chart::extensions::{
    EventFilter, EventKind, EventProjector, HistoricalEvent, ScheduledEvent,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid utc instant")
}

fn plot() -> PlotArea {
    PlotArea {
        top: 16.0,
        height: 460.0,
    }
}

fn projector(now: DateTime<Utc>, window: Duration) -> EventProjector {
    EventProjector {
        now,
        future_window: window,
        buffer: Duration::days(14),
        bucket_kind: BucketKind::None,
        filter: EventFilter::default(),
        interpolate_within_buckets: false,
    }
}

#[test]
fn split_ratio_must_leave_room_for_both_sections() {
    assert!(ViewportLayout::new(0.0, FutureWindowConfig::default()).is_err());
    assert!(ViewportLayout::new(100.0, FutureWindowConfig::default()).is_err());
    assert!(ViewportLayout::new(f64::NAN, FutureWindowConfig::default()).is_err());
    let layout = ViewportLayout::new(70.0, FutureWindowConfig::default()).expect("layout");
    assert_eq!(layout.split(true).future_percent, 30.0);
    assert_eq!(layout.split(false).past_percent, 100.0);
}

#[test]
fn year_scale_windows_mirror_past_duration() {
    let layout = ViewportLayout::default();

    // Early in the year YTD falls back to the 90-day minimum.
    let march = utc(2024, 3, 1, 17, 0);
    assert_eq!(
        layout.future_window_duration(ChartRange::YearToDate, 40.0, march),
        Duration::days(90)
    );

    let september = utc(2024, 9, 1, 16, 0);
    let ytd = layout.future_window_duration(ChartRange::YearToDate, 40.0, september);
    assert_eq!(ytd, september - utc(2024, 1, 1, 5, 0));

    assert_eq!(
        layout.future_window_duration(ChartRange::OneYear, 40.0, september),
        Duration::days(365)
    );
    assert_eq!(
        layout.future_window_duration(ChartRange::FiveYears, 40.0, september),
        Duration::days(730)
    );
    assert_eq!(
        layout.future_window_duration(ChartRange::OneYear, 0.0, september),
        Duration::zero()
    );
}

#[test]
fn short_range_windows_agree_across_ranges() {
    let layout = ViewportLayout::default();
    let now = utc(2024, 6, 3, 20, 0);
    let windows: Vec<Duration> = [
        ChartRange::OneDay,
        ChartRange::OneWeek,
        ChartRange::OneMonth,
        ChartRange::ThreeMonths,
    ]
    .into_iter()
    .map(|range| layout.future_window_duration(range, 40.0, now))
    .collect();
    assert!(windows.iter().all(|window| *window == Duration::days(72)));
}

#[test]
fn scheduled_fraction_includes_buffer() {
    let now = utc(2024, 6, 3, 20, 0);
    let fraction = future_fraction(
        now + Duration::days(31),
        now,
        Duration::days(90),
        Duration::days(14),
    )
    .expect("fraction");
    assert_abs_diff_eq!(fraction, 0.5, epsilon = 1e-12);
}

#[test]
fn scheduled_events_beyond_window_are_dropped_and_edges_clamped() {
    let now = utc(2024, 6, 3, 20, 0);
    let window = Duration::days(100);
    let projector = projector(now, window);
    let sections = SectionGeometry::new(1000.0, ViewportLayout::default().split(true));
    let events = vec![
        // Raw fraction exactly 1.0.
        ScheduledEvent::new("edge", "earnings", now + Duration::days(86), "Q2"),
        // Within the epsilon past the edge: kept and clamped.
        ScheduledEvent::new(
            "slightly-over",
            "earnings",
            now + Duration::days(86) + Duration::hours(6),
            "Q2",
        ),
        // Well past the window.
        ScheduledEvent::new("beyond", "earnings", now + Duration::days(120), "Q3"),
        // Before now minus the buffer.
        ScheduledEvent::new("stale", "earnings", now - Duration::days(20), "Q1"),
    ];
    let dots = projector.project_scheduled(&events, sections, plot());
    let ids: Vec<&str> = dots.iter().map(|dot| dot.event_id.as_str()).collect();
    assert_eq!(ids, vec!["edge", "slightly-over"]);
    for dot in &dots {
        assert_eq!(dot.kind, EventKind::Scheduled);
        assert_eq!(dot.section_fraction, 1.0);
        assert_abs_diff_eq!(dot.x, 1000.0, epsilon = 1e-9);
        assert_eq!(dot.y, plot().bottom());
    }
}

#[test]
fn scheduled_dots_respect_type_filter_and_hidden_future() {
    let now = utc(2024, 6, 3, 20, 0);
    let mut projector = projector(now, Duration::days(90));
    projector.filter.selected_event_types = Some(BTreeSet::from(["fda".to_owned()]));
    let events = vec![
        ScheduledEvent::new("a", "earnings", now + Duration::days(10), "Q2"),
        ScheduledEvent::new("b", "fda", now + Duration::days(20), "PDUFA"),
    ];

    let shown = SectionGeometry::new(1000.0, ViewportLayout::default().split(true));
    let dots = projector.project_scheduled(&events, shown, plot());
    assert_eq!(dots.len(), 1);
    assert_eq!(dots[0].event_id, "b");

    let hidden = SectionGeometry::new(1000.0, ViewportLayout::default().split(false));
    assert!(projector.project_scheduled(&events, hidden, plot()).is_empty());
}

#[test]
fn historical_events_anchor_to_nearest_sample_within_tolerance() {
    let samples: Vec<Sample> = (0..5)
        .map(|i| {
            Sample::new(
                utc(2024, 6, 3, 20, 0) + Duration::days(i),
                10.0,
                12.0,
                9.0,
                11.0,
                1.0,
            )
        })
        .collect();
    let sections = SectionGeometry::new(1000.0, ViewportLayout::default().split(true));
    let mapper = CoordinateMapper::new(
        PositioningRegime::IndexBased { count: 5 },
        sections.past,
        PriceScale::new(0.0, 20.0).expect("scale"),
        plot(),
    );
    let projector = projector(utc(2024, 6, 10, 20, 0), Duration::days(72));
    let events = vec![
        HistoricalEvent::new("late", "earnings", utc(2024, 6, 5, 23, 0), "beat"),
        HistoricalEvent::new("orphan", "earnings", utc(2024, 5, 1, 20, 0), "miss"),
    ];

    let dots = projector.project_historical(&events, &samples, &mapper);
    assert_eq!(dots.len(), 1);
    let dot = &dots[0];
    assert_eq!(dot.event_id, "late");
    assert_eq!(dot.sample_index, Some(2));
    assert_eq!(Some(dot.x), mapper.sample_x(&samples, 2));
    assert_eq!(dot.y, mapper.y_for(11.0));

    let mut hidden = projector.clone();
    hidden.filter.show_historical_events = false;
    assert!(hidden.project_historical(&events, &samples, &mapper).is_empty());
}

#[test]
fn tolerance_widens_with_bucket_size() {
    assert_eq!(historical_match_tolerance(BucketKind::None), Duration::days(1));
    assert_eq!(historical_match_tolerance(BucketKind::Weekly), Duration::days(7));
    assert_eq!(historical_match_tolerance(BucketKind::Monthly), Duration::days(31));
}

#[test]
fn interpolation_offsets_dot_inside_weekly_bucket() {
    let week = |day: u32| Sample::new(utc(2024, 6, day, 4, 0), 10.0, 12.0, 9.0, 11.0, 1.0);
    let samples = vec![week(3), week(10), week(17)];
    let sections = SectionGeometry::new(1000.0, ViewportLayout::default().split(true));
    let mapper = CoordinateMapper::new(
        PositioningRegime::IndexBased { count: 3 },
        sections.past,
        PriceScale::new(0.0, 20.0).expect("scale"),
        plot(),
    );
    let mut projector = projector(utc(2024, 6, 20, 20, 0), Duration::days(365));
    projector.bucket_kind = BucketKind::Weekly;
    projector.interpolate_within_buckets = true;

    // Mid-week event: half a week past the bucket it belongs to.
    let event = HistoricalEvent::new("mid", "earnings", utc(2024, 6, 6, 16, 0), "beat");
    let (index, x) = projector
        .historical_position(&event, &samples, &mapper)
        .expect("position");
    assert_eq!(index, 0);
    let start = mapper.sample_x(&samples, 0).expect("x0");
    let end = mapper.sample_x(&samples, 1).expect("x1");
    assert_abs_diff_eq!(x, start + 0.5 * (end - start), epsilon = 1e-9);
}
