use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{ChartRange, PricePoint, Sample};
use crate::extensions::events::{HistoricalEvent, ScheduledEvent};

/// Everything the data layer hands over for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartInput {
    pub range: ChartRange,
    /// Reference instant for the "now" boundary and every future offset.
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub scheduled_events: Vec<ScheduledEvent>,
    #[serde(default)]
    pub historical_events: Vec<HistoricalEvent>,
    #[serde(default)]
    pub previous_close: Option<f64>,
}

impl ChartInput {
    #[must_use]
    pub fn new(range: ChartRange, now: DateTime<Utc>) -> Self {
        Self {
            range,
            now,
            samples: Vec::new(),
            scheduled_events: Vec::new(),
            historical_events: Vec::new(),
            previous_close: None,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: Vec<Sample>) -> Self {
        self.samples = samples;
        self
    }

    /// Line-form input; each point becomes a flat OHLC sample.
    #[must_use]
    pub fn with_price_points(mut self, points: impl IntoIterator<Item = PricePoint>) -> Self {
        self.samples = points.into_iter().map(Sample::from).collect();
        self
    }

    #[must_use]
    pub fn with_scheduled_events(mut self, events: Vec<ScheduledEvent>) -> Self {
        self.scheduled_events = events;
        self
    }

    #[must_use]
    pub fn with_historical_events(mut self, events: Vec<HistoricalEvent>) -> Self {
        self.historical_events = events;
        self
    }

    #[must_use]
    pub fn with_previous_close(mut self, previous_close: f64) -> Self {
        self.previous_close = Some(previous_close);
        self
    }

    /// Content hash used as the input half of the frame cache key.
    pub(crate) fn fingerprint<H: Hasher>(&self, state: &mut H) {
        self.range.hash(state);
        self.now.hash(state);
        self.samples.len().hash(state);
        for sample in &self.samples {
            sample.timestamp.hash(state);
            for value in [
                sample.open,
                sample.high,
                sample.low,
                sample.close,
                sample.volume,
            ] {
                value.to_bits().hash(state);
            }
            sample.session.hash(state);
        }
        self.scheduled_events.hash(state);
        self.historical_events.hash(state);
        self.previous_close.map(f64::to_bits).hash(state);
    }
}
