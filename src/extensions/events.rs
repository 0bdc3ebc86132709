use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::layout::SectionGeometry;
use crate::core::normalize::BucketKind;
use crate::core::positioning::CoordinateMapper;
use crate::core::primitives::{duration_seconds, guarded_ratio, seconds_between};
use crate::core::types::{PlotArea, Sample};

/// Scheduled future catalyst (earnings, FDA decision, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
}

impl ScheduledEvent {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            timestamp,
            title: title.into(),
        }
    }
}

/// Event that already occurred. It is anchored to the sample closest to
/// `actual_date_time` rather than positioned purely by time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub actual_date_time: DateTime<Utc>,
}

impl HistoricalEvent {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        actual_date_time: DateTime<Utc>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            timestamp: actual_date_time,
            title: title.into(),
            actual_date_time,
        }
    }

    #[must_use]
    pub fn with_scheduled_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Read-only visibility filter owned by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub show_historical_events: bool,
    /// `None` keeps every type.
    pub selected_event_types: Option<BTreeSet<String>>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            show_historical_events: true,
            selected_event_types: None,
        }
    }
}

impl EventFilter {
    #[must_use]
    pub fn allows_type(&self, event_type: &str) -> bool {
        self.selected_event_types
            .as_ref()
            .is_none_or(|types| types.contains(event_type))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Scheduled,
    Historical,
}

/// Pixel position of one visible event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDot {
    pub event_id: String,
    pub event_type: String,
    pub kind: EventKind,
    pub x: f64,
    pub y: f64,
    /// Position inside the dot's own section, in `[0, 1]`.
    pub section_fraction: f64,
    /// Matched sample for historical dots.
    pub sample_index: Option<usize>,
}

/// Maximum time distance between a historical event and its anchor sample.
#[must_use]
pub fn historical_match_tolerance(bucket: BucketKind) -> Duration {
    match bucket {
        BucketKind::None => Duration::days(1),
        BucketKind::Weekly => Duration::days(7),
        BucketKind::Monthly => Duration::days(31),
    }
}

/// Index of the sample closest in time to `actual`; ties keep the first
/// minimum. Returns `None` when the best distance exceeds `tolerance`.
#[must_use]
pub fn match_historical_sample(
    samples: &[Sample],
    actual: DateTime<Utc>,
    tolerance: Duration,
) -> Option<usize> {
    let mut best: Option<(usize, Duration)> = None;
    for (index, sample) in samples.iter().enumerate() {
        let distance = (sample.timestamp - actual).abs();
        match best {
            Some((_, current)) if current <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.filter(|(_, distance)| *distance <= tolerance)
        .map(|(index, _)| index)
}

/// Raw position of a future instant inside the future window:
/// `(timestamp - now + buffer) / window`. `None` when the window is empty.
#[must_use]
pub fn future_fraction(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
    buffer: Duration,
) -> Option<f64> {
    let window_seconds = duration_seconds(window);
    if window_seconds <= 0.0 {
        return None;
    }
    Some(guarded_ratio(
        seconds_between(now, timestamp) + duration_seconds(buffer),
        window_seconds,
    ))
}

/// Maps scheduled and historical events onto the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EventProjector {
    pub now: DateTime<Utc>,
    pub future_window: Duration,
    pub buffer: Duration,
    pub bucket_kind: BucketKind,
    pub filter: EventFilter,
    /// Offsets historical dots inside multi-day buckets by elapsed time.
    pub interpolate_within_buckets: bool,
}

impl EventProjector {
    /// Clamped future-section fraction, or `None` when the event lies beyond
    /// the plot bounds (or the future section is hidden).
    #[must_use]
    pub fn scheduled_fraction(&self, event: &ScheduledEvent) -> Option<f64> {
        let raw = future_fraction(event.timestamp, self.now, self.future_window, self.buffer)?;
        CoordinateMapper::is_on_plot(raw).then(|| raw.clamp(0.0, 1.0))
    }

    /// Future-section dots, ordered by x then id.
    #[must_use]
    pub fn project_scheduled(
        &self,
        events: &[ScheduledEvent],
        sections: SectionGeometry,
        plot: PlotArea,
    ) -> Vec<EventDot> {
        if sections.future.width <= 0.0 {
            return Vec::new();
        }

        let mut dots: Vec<EventDot> = events
            .iter()
            .filter(|event| self.filter.allows_type(&event.event_type))
            .filter_map(|event| {
                let fraction = self.scheduled_fraction(event);
                if fraction.is_none() {
                    trace!(event_id = %event.id, "scheduled event outside future window");
                }
                let fraction = fraction?;
                Some(EventDot {
                    event_id: event.id.clone(),
                    event_type: event.event_type.clone(),
                    kind: EventKind::Scheduled,
                    x: sections.future.x_at(fraction),
                    y: plot.bottom(),
                    section_fraction: fraction,
                    sample_index: None,
                })
            })
            .collect();
        sort_dots(&mut dots);
        dots
    }

    /// Anchor sample and pixel x of a historical event. Render and hit test
    /// both go through here.
    #[must_use]
    pub fn historical_position(
        &self,
        event: &HistoricalEvent,
        samples: &[Sample],
        mapper: &CoordinateMapper,
    ) -> Option<(usize, f64)> {
        let tolerance = historical_match_tolerance(self.bucket_kind);
        let index = match_historical_sample(samples, event.actual_date_time, tolerance)?;
        let sample = samples.get(index)?;
        let mut x = mapper.x_for(index, sample.timestamp);

        if self.interpolate_within_buckets && self.bucket_kind != BucketKind::None {
            if let Some(next) = samples.get(index + 1) {
                let span = seconds_between(sample.timestamp, next.timestamp);
                let offset = guarded_ratio(
                    seconds_between(sample.timestamp, event.actual_date_time),
                    span,
                )
                .clamp(0.0, 1.0);
                let next_x = mapper.x_for(index + 1, next.timestamp);
                x += offset * (next_x - x);
            }
        }

        let section_fraction = mapper.section().fraction_of(x)?;
        if !CoordinateMapper::is_on_plot(section_fraction) {
            return None;
        }
        Some((index, x))
    }

    /// Past-section dots, ordered by x then id. Unmatched events are dropped.
    #[must_use]
    pub fn project_historical(
        &self,
        events: &[HistoricalEvent],
        samples: &[Sample],
        mapper: &CoordinateMapper,
    ) -> Vec<EventDot> {
        if !self.filter.show_historical_events {
            return Vec::new();
        }

        let section = mapper.section();
        let mut dots: Vec<EventDot> = events
            .iter()
            .filter(|event| self.filter.allows_type(&event.event_type))
            .filter_map(|event| {
                let position = self.historical_position(event, samples, mapper);
                if position.is_none() {
                    trace!(event_id = %event.id, "historical event has no anchor sample");
                }
                let (index, x) = position?;
                let y = mapper.y_for(samples.get(index)?.close);
                Some(EventDot {
                    event_id: event.id.clone(),
                    event_type: event.event_type.clone(),
                    kind: EventKind::Historical,
                    x,
                    y,
                    section_fraction: section.fraction_of(x)?.clamp(0.0, 1.0),
                    sample_index: Some(index),
                })
            })
            .collect();
        sort_dots(&mut dots);
        dots
    }
}

fn sort_dots(dots: &mut [EventDot]) {
    dots.sort_by(|a, b| {
        OrderedFloat(a.x)
            .cmp(&OrderedFloat(b.x))
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
}
