use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::layout::{DEFAULT_PAST_PERCENT, FutureWindowConfig, ViewportLayout};
use crate::core::positioning::CandleWidthConfig;
use crate::core::price_scale::PriceScaleTuning;
use crate::core::types::PlotInsets;
use crate::error::{ChartError, ChartResult};
use crate::extensions::events::EventFilter;
use crate::extensions::labels::LabelPlacementConfig;
use crate::interaction::{HitTestConfig, InteractionInputBehavior};

/// Public engine configuration.
///
/// This type is serializable so host applications can persist/load chart setup
/// without inventing their own ad-hoc format. Every field has a default, so a
/// partial JSON object is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEngineConfig {
    #[serde(default = "default_true")]
    pub show_future_section: bool,
    #[serde(default = "default_true")]
    pub show_historical_events: bool,
    /// `None` shows every event type.
    #[serde(default)]
    pub selected_event_types: Option<BTreeSet<String>>,
    /// Past percent of the chart width while the future section is shown.
    #[serde(default = "default_viewport_split_ratio")]
    pub viewport_split_ratio: f64,
    #[serde(default = "default_price_padding_ratio")]
    pub price_padding_ratio: f64,
    #[serde(default)]
    pub insets: PlotInsets,
    /// Share of the plot height used by volume bars.
    #[serde(default = "default_volume_height_ratio")]
    pub volume_height_ratio: f64,
    #[serde(default)]
    pub candle: CandleWidthConfig,
    #[serde(default)]
    pub labels: LabelPlacementConfig,
    #[serde(default)]
    pub interaction: InteractionInputBehavior,
    #[serde(default)]
    pub hit_test: HitTestConfig,
    #[serde(default)]
    pub future_window: FutureWindowConfig,
    /// Offsets historical dots inside weekly/monthly buckets by elapsed time.
    #[serde(default)]
    pub interpolate_historical_events: bool,
}

impl Default for ChartEngineConfig {
    fn default() -> Self {
        Self {
            show_future_section: true,
            show_historical_events: true,
            selected_event_types: None,
            viewport_split_ratio: default_viewport_split_ratio(),
            price_padding_ratio: default_price_padding_ratio(),
            insets: PlotInsets::default(),
            volume_height_ratio: default_volume_height_ratio(),
            candle: CandleWidthConfig::default(),
            labels: LabelPlacementConfig::default(),
            interaction: InteractionInputBehavior::default(),
            hit_test: HitTestConfig::default(),
            future_window: FutureWindowConfig::default(),
            interpolate_historical_events: false,
        }
    }
}

impl ChartEngineConfig {
    #[must_use]
    pub fn with_future_section(mut self, show: bool) -> Self {
        self.show_future_section = show;
        self
    }

    #[must_use]
    pub fn with_historical_events(mut self, show: bool) -> Self {
        self.show_historical_events = show;
        self
    }

    /// Restricts visible events to the given types.
    #[must_use]
    pub fn with_selected_event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_event_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_all_event_types(mut self) -> Self {
        self.selected_event_types = None;
        self
    }

    #[must_use]
    pub fn with_viewport_split_ratio(mut self, past_percent: f64) -> Self {
        self.viewport_split_ratio = past_percent;
        self
    }

    #[must_use]
    pub fn with_price_padding_ratio(mut self, ratio: f64) -> Self {
        self.price_padding_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_insets(mut self, insets: PlotInsets) -> Self {
        self.insets = insets;
        self
    }

    #[must_use]
    pub fn with_volume_height_ratio(mut self, ratio: f64) -> Self {
        self.volume_height_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_candle_config(mut self, candle: CandleWidthConfig) -> Self {
        self.candle = candle;
        self
    }

    #[must_use]
    pub fn with_label_config(mut self, labels: LabelPlacementConfig) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn with_interaction_input_behavior(mut self, behavior: InteractionInputBehavior) -> Self {
        self.interaction = behavior;
        self
    }

    #[must_use]
    pub fn with_hit_test_config(mut self, hit_test: HitTestConfig) -> Self {
        self.hit_test = hit_test;
        self
    }

    #[must_use]
    pub fn with_future_window(mut self, future_window: FutureWindowConfig) -> Self {
        self.future_window = future_window;
        self
    }

    #[must_use]
    pub fn with_historical_event_interpolation(mut self, enabled: bool) -> Self {
        self.interpolate_historical_events = enabled;
        self
    }

    /// Checks every numeric knob; called whenever a config enters the engine.
    pub fn validate(&self) -> ChartResult<()> {
        self.layout()?;
        self.price_scale_tuning().validate()?;
        self.candle.validate()?;
        self.labels.validate()?;
        self.hit_test.validate()?;

        if !self.insets.top_px.is_finite()
            || !self.insets.bottom_px.is_finite()
            || self.insets.top_px < 0.0
            || self.insets.bottom_px < 0.0
        {
            return Err(ChartError::InvalidConfig(
                "plot insets must be finite and >= 0".to_owned(),
            ));
        }
        if !self.volume_height_ratio.is_finite() || !(0.0..=1.0).contains(&self.volume_height_ratio)
        {
            return Err(ChartError::InvalidConfig(
                "volume height ratio must be within [0, 1]".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> ChartResult<ViewportLayout> {
        ViewportLayout::new(self.viewport_split_ratio, self.future_window)
    }

    #[must_use]
    pub fn price_scale_tuning(&self) -> PriceScaleTuning {
        PriceScaleTuning {
            padding_ratio: self.price_padding_ratio,
        }
    }

    #[must_use]
    pub fn event_filter(&self) -> EventFilter {
        EventFilter {
            show_historical_events: self.show_historical_events,
            selected_event_types: self.selected_event_types.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_viewport_split_ratio() -> f64 {
    DEFAULT_PAST_PERCENT
}

fn default_price_padding_ratio() -> f64 {
    PriceScaleTuning::default().padding_ratio
}

fn default_volume_height_ratio() -> f64 {
    0.20
}
