use approx::assert_abs_diff_eq;
use catalyst_chart::core::{
    CoordinateMapper, PlotArea, PositioningRegime, PriceScale, Sample, SectionGeometry,
    ViewportSplit,
};
use catalyst_chart::extensions::{EventDot, EventKind};
use catalyst_chart::interaction::{
    GestureState, HitTestConfig, HitTestScene, InteractionInputBehavior, InteractionState,
    PointerEvent, Selection, hit_test,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 20, 0, 0)
        .single()
        .expect("valid utc instant")
}

fn samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            Sample::new(
                start() + Duration::days(i as i64),
                close,
                close + 1.0,
                close - 1.0,
                close,
                1.0,
            )
        })
        .collect()
}

struct Fixture {
    samples: Vec<Sample>,
    sections: SectionGeometry,
    mapper: CoordinateMapper,
}

impl Fixture {
    /// 1000px chart split 50/50; the past section spans x in [0, 500].
    fn new(count: usize) -> Self {
        let samples = samples(count);
        let sections = SectionGeometry::new(1000.0, ViewportSplit::new(50.0).expect("split"));
        let mapper = CoordinateMapper::new(
            PositioningRegime::IndexBased { count },
            sections.past,
            PriceScale::new(0.0, 400.0).expect("scale"),
            PlotArea {
                top: 16.0,
                height: 460.0,
            },
        );
        Self {
            samples,
            sections,
            mapper,
        }
    }

    fn scene<'a>(
        &'a self,
        historical: &'a [EventDot],
        scheduled: &'a [EventDot],
    ) -> HitTestScene<'a> {
        HitTestScene {
            samples: &self.samples,
            mapper: &self.mapper,
            sections: self.sections,
            historical_dots: historical,
            scheduled_dots: scheduled,
        }
    }
}

fn historical_dot(id: &str, x: f64, sample_index: usize) -> EventDot {
    EventDot {
        event_id: id.to_owned(),
        event_type: "earnings".to_owned(),
        kind: EventKind::Historical,
        x,
        y: 200.0,
        section_fraction: x / 500.0,
        sample_index: Some(sample_index),
    }
}

fn scheduled_dot(id: &str, fraction: f64) -> EventDot {
    EventDot {
        event_id: id.to_owned(),
        event_type: "fda".to_owned(),
        kind: EventKind::Scheduled,
        x: 500.0 + fraction * 500.0,
        y: 476.0,
        section_fraction: fraction,
        sample_index: None,
    }
}

#[test]
fn pointer_on_sample_selects_it() {
    let fixture = Fixture::new(5);
    let selection = hit_test(&fixture.scene(&[], &[]), HitTestConfig::default(), 250.0, 100.0)
        .expect("selection");
    assert_eq!(selection.sample_index(), Some(2));
    assert_eq!(selection.pixel_x(), 250.0);
    assert_eq!(selection.pixel_y(), fixture.mapper.y_for(102.0));
    assert_eq!(selection.event_id(), None);
}

#[test]
fn pointer_far_from_every_sample_clears_selection() {
    let fixture = Fixture::new(2);
    // Samples sit at fractions 0 and 1; the pointer is at 0.3.
    let selection = hit_test(&fixture.scene(&[], &[]), HitTestConfig::default(), 150.0, 100.0);
    assert_eq!(selection, None);
}

#[test]
fn empty_series_has_no_selection() {
    let fixture = Fixture::new(0);
    assert_eq!(
        hit_test(&fixture.scene(&[], &[]), HitTestConfig::default(), 10.0, 10.0),
        None
    );
}

#[test]
fn historical_event_exactly_at_snap_threshold_is_not_snapped() {
    let fixture = Fixture::new(5);
    let dots = [historical_dot("at-threshold", 255.0, 2)];
    let selection = hit_test(&fixture.scene(&dots, &[]), HitTestConfig::default(), 250.0, 0.0)
        .expect("selection");
    assert_eq!(selection.event_id(), None);
    assert_eq!(selection.sample_index(), Some(2));
}

#[test]
fn historical_event_inside_threshold_snaps() {
    let fixture = Fixture::new(5);
    let dots = [
        historical_dot("farther", 254.0, 2),
        historical_dot("closer", 247.0, 2),
    ];
    let selection = hit_test(&fixture.scene(&dots, &[]), HitTestConfig::default(), 251.0, 0.0)
        .expect("selection");
    assert_eq!(selection.event_id(), Some("closer"));
    assert_eq!(selection.sample_index(), Some(2));
    assert_eq!(selection.pixel_x(), 250.0);
}

#[test]
fn event_snap_repoints_selection_to_matched_sample() {
    // 201 samples over 500px: neighbours are 2.5px apart.
    let fixture = Fixture::new(201);
    let event_x = fixture.mapper.sample_x(&fixture.samples, 101).expect("x");
    let dots = [historical_dot("next-door", event_x, 101)];
    let selection = hit_test(&fixture.scene(&dots, &[]), HitTestConfig::default(), 250.0, 0.0)
        .expect("selection");

    match selection {
        Selection::Sample {
            sample_index,
            pixel_x,
            pixel_y,
            event_id,
        } => {
            assert_eq!(sample_index, 101);
            assert_abs_diff_eq!(pixel_x, event_x, epsilon = 1e-9);
            assert_abs_diff_eq!(pixel_y, fixture.mapper.y_for(201.0), epsilon = 1e-9);
            assert_eq!(event_id.as_deref(), Some("next-door"));
        }
        other => panic!("expected a sample selection, got {other:?}"),
    }
}

#[test]
fn future_pointer_yields_continuous_selection() {
    let fixture = Fixture::new(5);
    let selection = hit_test(&fixture.scene(&[], &[]), HitTestConfig::default(), 600.0, 5_000.0)
        .expect("selection");
    match selection {
        Selection::FutureTime {
            x_percent_in_future,
            pixel_x,
            pixel_y,
        } => {
            assert_abs_diff_eq!(x_percent_in_future, 0.2, epsilon = 1e-12);
            assert_abs_diff_eq!(pixel_x, 600.0, epsilon = 1e-9);
            // Clamped to the plot bottom.
            assert_eq!(pixel_y, 476.0);
        }
        other => panic!("expected a future-time selection, got {other:?}"),
    }
}

#[test]
fn future_pointer_snaps_to_scheduled_event_within_twenty_pixels() {
    let fixture = Fixture::new(5);
    let dots = [scheduled_dot("pdufa", 0.5)];
    let scene = fixture.scene(&[], &dots);

    let near = hit_test(&scene, HitTestConfig::default(), 769.0, 100.0).expect("selection");
    assert_eq!(near.event_id(), Some("pdufa"));
    assert_eq!(near.pixel_x(), 750.0);

    let far = hit_test(&scene, HitTestConfig::default(), 771.0, 100.0).expect("selection");
    assert!(matches!(far, Selection::FutureTime { .. }));
}

#[test]
fn drag_updates_selection_and_release_clears_it() {
    let fixture = Fixture::new(5);
    let scene = fixture.scene(&[], &[]);
    let config = HitTestConfig::default();
    let mut state = InteractionState::default();

    state.handle(PointerEvent::down(250.0, 100.0), |x, y| hit_test(&scene, config, x, y));
    assert_eq!(state.gesture(), GestureState::Pressed);
    assert!(state.suppresses_host_scroll());

    let selected = state
        .handle(PointerEvent::moved(375.0, 100.0), |x, y| hit_test(&scene, config, x, y))
        .and_then(Selection::sample_index);
    assert_eq!(selected, Some(3));
    assert_eq!(state.gesture(), GestureState::Dragging);

    // Moving away from every sample clears the selection but keeps the drag.
    let fixture_sparse = Fixture::new(2);
    let sparse = fixture_sparse.scene(&[], &[]);
    let cleared = state.handle(PointerEvent::moved(150.0, 100.0), |x, y| {
        hit_test(&sparse, config, x, y)
    });
    assert!(cleared.is_none());
    assert_eq!(state.gesture(), GestureState::Dragging);

    state.handle(PointerEvent::cancel(), |x, y| hit_test(&scene, config, x, y));
    assert_eq!(state.gesture(), GestureState::Idle);
    assert!(state.selection().is_none());
    assert!(!state.suppresses_host_scroll());
}

#[test]
fn hover_is_ignored_unless_enabled() {
    let fixture = Fixture::new(5);
    let scene = fixture.scene(&[], &[]);
    let config = HitTestConfig::default();

    let mut passive = InteractionState::default();
    assert!(
        passive
            .handle(PointerEvent::moved(250.0, 0.0), |x, y| hit_test(&scene, config, x, y))
            .is_none()
    );

    let mut hover = InteractionState::new(InteractionInputBehavior { track_hover: true });
    let selected = hover
        .handle(PointerEvent::moved(250.0, 0.0), |x, y| hit_test(&scene, config, x, y))
        .and_then(Selection::sample_index);
    assert_eq!(selected, Some(2));
    assert!(!hover.suppresses_host_scroll());
}

proptest! {
    #[test]
    fn hit_test_is_deterministic_and_within_threshold(
        count in 1usize..300,
        x in 0.0f64..1000.0,
        y in 0.0f64..500.0
    ) {
        let fixture = Fixture::new(count);
        let scene = fixture.scene(&[], &[]);
        let config = HitTestConfig::default();
        let first = hit_test(&scene, config, x, y);
        let second = hit_test(&scene, config, x, y);
        prop_assert_eq!(&first, &second);

        if let Some(Selection::Sample { sample_index, pixel_x, .. }) = first {
            prop_assert!(sample_index < count);
            prop_assert!((pixel_x - x).abs() / 500.0 <= config.sample_threshold + 1e-9);
        }
    }
}
