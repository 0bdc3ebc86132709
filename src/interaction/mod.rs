//! Pointer gestures, crosshair selection and hit testing.
//!
//! Mouse and touch input reach the engine as one [`PointerEvent`] stream.
//! Platform concerns (passive listeners, default-gesture suppression) stay in
//! the host adapter, which can consult
//! [`InteractionState::suppresses_host_scroll`].

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::core::layout::SectionGeometry;
use crate::core::positioning::CoordinateMapper;
use crate::core::types::Sample;
use crate::error::{ChartError, ChartResult};
use crate::extensions::events::EventDot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Cancel,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    #[must_use]
    pub fn new(kind: PointerEventKind, x: f64, y: f64) -> Self {
        Self { kind, x, y }
    }

    #[must_use]
    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Down, x, y)
    }

    #[must_use]
    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Move, x, y)
    }

    #[must_use]
    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Up, x, y)
    }

    #[must_use]
    pub fn cancel() -> Self {
        Self::new(PointerEventKind::Cancel, 0.0, 0.0)
    }

    #[must_use]
    pub fn leave() -> Self {
        Self::new(PointerEventKind::Leave, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Pressed,
    Dragging,
}

/// Transient crosshair target, owned by the interaction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// Historical sample, optionally snapped onto a historical event.
    Sample {
        sample_index: usize,
        pixel_x: f64,
        pixel_y: f64,
        event_id: Option<String>,
    },
    /// Continuous position on the future timeline.
    FutureTime {
        x_percent_in_future: f64,
        pixel_x: f64,
        pixel_y: f64,
    },
    /// Future position snapped onto a scheduled event.
    FutureEvent {
        event_id: String,
        x_percent_in_future: f64,
        pixel_x: f64,
        pixel_y: f64,
    },
}

impl Selection {
    #[must_use]
    pub fn pixel_x(&self) -> f64 {
        match self {
            Selection::Sample { pixel_x, .. }
            | Selection::FutureTime { pixel_x, .. }
            | Selection::FutureEvent { pixel_x, .. } => *pixel_x,
        }
    }

    #[must_use]
    pub fn pixel_y(&self) -> f64 {
        match self {
            Selection::Sample { pixel_y, .. }
            | Selection::FutureTime { pixel_y, .. }
            | Selection::FutureEvent { pixel_y, .. } => *pixel_y,
        }
    }

    #[must_use]
    pub fn sample_index(&self) -> Option<usize> {
        match self {
            Selection::Sample { sample_index, .. } => Some(*sample_index),
            _ => None,
        }
    }

    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Selection::Sample { event_id, .. } => event_id.as_deref(),
            Selection::FutureEvent { event_id, .. } => Some(event_id),
            Selection::FutureTime { .. } => None,
        }
    }
}

/// Snap thresholds. Every comparison is strict: a candidate exactly at the
/// threshold is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitTestConfig {
    /// Maximum pointer-to-sample distance as a fraction of the past section.
    pub sample_threshold: f64,
    /// Maximum pixel distance from the selected sample to a historical event.
    pub event_snap_px: f64,
    /// Maximum pixel distance from the pointer to a scheduled event.
    pub future_snap_px: f64,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            sample_threshold: 0.05,
            event_snap_px: 5.0,
            future_snap_px: 20.0,
        }
    }
}

impl HitTestConfig {
    pub fn validate(self) -> ChartResult<Self> {
        for (value, name) in [
            (self.sample_threshold, "sample_threshold"),
            (self.event_snap_px, "event_snap_px"),
            (self.future_snap_px, "future_snap_px"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidConfig(format!(
                    "hit test `{name}` must be finite and >= 0"
                )));
            }
        }
        Ok(self)
    }
}

/// Immutable snapshot of the last render consumed by hit testing.
#[derive(Debug, Clone, Copy)]
pub struct HitTestScene<'a> {
    pub samples: &'a [Sample],
    pub mapper: &'a CoordinateMapper,
    pub sections: SectionGeometry,
    pub historical_dots: &'a [EventDot],
    pub scheduled_dots: &'a [EventDot],
}

/// Nearest sample by section fraction; ties keep the first minimum.
#[must_use]
pub fn nearest_sample(
    samples: &[Sample],
    mapper: &CoordinateMapper,
    pointer_fraction: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, OrderedFloat<f64>)> = None;
    for (index, sample) in samples.iter().enumerate() {
        let distance = OrderedFloat((mapper.x_fraction(index, sample.timestamp) - pointer_fraction).abs());
        match best {
            Some((_, current)) if current <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, distance)| (index, distance.into_inner()))
}

/// Resolves what the pointer at `(x, y)` points at. Pure and deterministic.
#[must_use]
pub fn hit_test(scene: &HitTestScene<'_>, config: HitTestConfig, x: f64, y: f64) -> Option<Selection> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let future = scene.sections.future;
    // The boundary pixel belongs to the past section, where the latest
    // index-positioned sample sits.
    if future.width > 0.0 && x > future.left {
        hit_test_future(scene, config, x, y)
    } else {
        hit_test_past(scene, config, x)
    }
}

fn hit_test_past(scene: &HitTestScene<'_>, config: HitTestConfig, x: f64) -> Option<Selection> {
    let pointer_fraction = scene.mapper.section().fraction_of(x)?;
    let (index, distance) = nearest_sample(scene.samples, scene.mapper, pointer_fraction)?;
    if distance >= config.sample_threshold {
        return None;
    }

    let sample_x = scene.mapper.sample_x(scene.samples, index)?;
    let mut candidates: SmallVec<[(OrderedFloat<f64>, &EventDot); 4]> = SmallVec::new();
    for dot in scene.historical_dots {
        let gap = OrderedFloat((dot.x - sample_x).abs());
        if gap.into_inner() < config.event_snap_px && dot.sample_index.is_some() {
            candidates.push((gap, dot));
        }
    }
    let snapped = candidates
        .into_iter()
        .reduce(|best, item| if item.0 < best.0 { item } else { best })
        .map(|(_, dot)| dot);

    match snapped {
        Some(dot) => {
            let snapped_index = dot.sample_index.unwrap_or(index);
            let sample = scene.samples.get(snapped_index)?;
            Some(Selection::Sample {
                sample_index: snapped_index,
                pixel_x: scene.mapper.x_for(snapped_index, sample.timestamp),
                pixel_y: scene.mapper.y_for(sample.close),
                event_id: Some(dot.event_id.clone()),
            })
        }
        None => {
            let sample = scene.samples.get(index)?;
            Some(Selection::Sample {
                sample_index: index,
                pixel_x: sample_x,
                pixel_y: scene.mapper.y_for(sample.close),
                event_id: None,
            })
        }
    }
}

fn hit_test_future(
    scene: &HitTestScene<'_>,
    config: HitTestConfig,
    x: f64,
    y: f64,
) -> Option<Selection> {
    let future = scene.sections.future;
    let fraction = future.fraction_of(x)?.clamp(0.0, 1.0);
    let plot = scene.mapper.plot();
    let pixel_y = y.clamp(plot.top, plot.bottom().max(plot.top));
    let threshold = config.future_snap_px / future.width;

    let mut best: Option<(OrderedFloat<f64>, &EventDot)> = None;
    for dot in scene.scheduled_dots {
        let distance = OrderedFloat((dot.section_fraction - fraction).abs());
        match best {
            Some((current, _)) if current <= distance => {}
            _ => best = Some((distance, dot)),
        }
    }

    match best {
        Some((distance, dot)) if distance.into_inner() < threshold => Some(Selection::FutureEvent {
            event_id: dot.event_id.clone(),
            x_percent_in_future: dot.section_fraction,
            pixel_x: dot.x,
            pixel_y,
        }),
        _ => Some(Selection::FutureTime {
            x_percent_in_future: fraction,
            pixel_x: future.x_at(fraction),
            pixel_y,
        }),
    }
}

/// Host-facing input toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InteractionInputBehavior {
    /// Hit-test on moves while no button/touch is pressed (desktop hover).
    pub track_hover: bool,
}

/// Gesture state machine: `Idle → Pressed → (Dragging ⇄ Pressed) → Idle`.
///
/// A down event while dragging (a re-press, e.g. a second touch landing)
/// returns to `Pressed` and keeps the current selection until the next move.
/// Only moves while pressed (or hover moves when `track_hover` is set) update
/// the selection; release, cancel and leave clear it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionState {
    gesture: GestureState,
    selection: Option<Selection>,
    behavior: InteractionInputBehavior,
}

impl InteractionState {
    #[must_use]
    pub fn new(behavior: InteractionInputBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn behavior(&self) -> InteractionInputBehavior {
        self.behavior
    }

    pub fn set_behavior(&mut self, behavior: InteractionInputBehavior) {
        self.behavior = behavior;
    }

    /// `true` while a chart-internal drag owns the gesture; the host must
    /// stop suppressing native scrolling as soon as this turns `false`.
    #[must_use]
    pub fn suppresses_host_scroll(&self) -> bool {
        self.gesture != GestureState::Idle
    }

    pub fn clear(&mut self) {
        self.gesture = GestureState::Idle;
        self.selection = None;
    }

    /// Advances the state machine. `resolve` runs the hit test for moves that
    /// are allowed to update the selection.
    pub fn handle<F>(&mut self, event: PointerEvent, resolve: F) -> Option<&Selection>
    where
        F: FnOnce(f64, f64) -> Option<Selection>,
    {
        let previous = self.gesture;
        match event.kind {
            PointerEventKind::Down => match self.gesture {
                GestureState::Idle | GestureState::Dragging => {
                    self.gesture = GestureState::Pressed;
                }
                GestureState::Pressed => {}
            },
            PointerEventKind::Move => match self.gesture {
                GestureState::Pressed | GestureState::Dragging => {
                    self.gesture = GestureState::Dragging;
                    self.selection = resolve(event.x, event.y);
                }
                GestureState::Idle => {
                    if self.behavior.track_hover {
                        self.selection = resolve(event.x, event.y);
                    }
                }
            },
            PointerEventKind::Up | PointerEventKind::Cancel | PointerEventKind::Leave => {
                self.clear();
            }
        }
        if previous != self.gesture {
            trace!(from = ?previous, to = ?self.gesture, "gesture transition");
        }
        self.selection.as_ref()
    }
}
