//! Historical/future width split and the future time window it implies.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::market_hours::MARKET_TIME_ZONE;
use crate::core::types::ChartRange;
use crate::error::{ChartError, ChartResult};

pub const DEFAULT_PAST_PERCENT: f64 = 60.0;

/// Percent of chart width given to history vs. the forward timeline.
///
/// `past_percent + future_percent == 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSplit {
    pub past_percent: f64,
    pub future_percent: f64,
}

impl ViewportSplit {
    pub fn new(past_percent: f64) -> ChartResult<Self> {
        if !past_percent.is_finite() || !(0.0..=100.0).contains(&past_percent) {
            return Err(ChartError::InvalidConfig(
                "past percent must be finite and within [0, 100]".to_owned(),
            ));
        }
        Ok(Self {
            past_percent,
            future_percent: 100.0 - past_percent,
        })
    }

    #[must_use]
    pub fn history_only() -> Self {
        Self {
            past_percent: 100.0,
            future_percent: 0.0,
        }
    }

    #[must_use]
    pub fn past_fraction(self) -> f64 {
        self.past_percent / 100.0
    }

    #[must_use]
    pub fn future_fraction(self) -> f64 {
        self.future_percent / 100.0
    }

    #[must_use]
    pub fn shows_future(self) -> bool {
        self.future_percent > 0.0
    }
}

/// Horizontal pixel span of one chart section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub left: f64,
    pub width: f64,
}

impl Section {
    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn x_at(self, fraction: f64) -> f64 {
        self.left + fraction * self.width
    }

    /// Unclamped position of `x` relative to the section, `None` when the
    /// section has no width.
    #[must_use]
    pub fn fraction_of(self, x: f64) -> Option<f64> {
        if self.width <= 0.0 || !x.is_finite() {
            return None;
        }
        Some((x - self.left) / self.width)
    }
}

/// Past and future sections laid side by side across the chart width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionGeometry {
    pub total_width: f64,
    pub past: Section,
    pub future: Section,
}

impl SectionGeometry {
    #[must_use]
    pub fn new(total_width: f64, split: ViewportSplit) -> Self {
        let total_width = total_width.max(0.0);
        let past_width = total_width * split.past_fraction();
        Self {
            total_width,
            past: Section {
                left: 0.0,
                width: past_width,
            },
            future: Section {
                left: past_width,
                width: total_width - past_width,
            },
        }
    }

    /// The past/future boundary, where the "now" marker sits.
    #[must_use]
    pub fn now_x(self) -> f64 {
        self.past.right()
    }
}

/// Sizing rules for the forward timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FutureWindowConfig {
    /// Window shown by short ranges when the future section takes 50 %.
    pub short_range_base_days: i64,
    /// Lower bound of year-scale windows.
    pub year_scale_min_days: i64,
    /// Multi-year window as a multiple of 365 days.
    pub multi_year_years: i64,
    /// Offset pushing future event dots away from the "now" boundary.
    pub event_buffer_days: i64,
}

impl Default for FutureWindowConfig {
    fn default() -> Self {
        Self {
            short_range_base_days: 90,
            year_scale_min_days: 90,
            multi_year_years: 2,
            event_buffer_days: 14,
        }
    }
}

impl FutureWindowConfig {
    pub fn validate(self) -> ChartResult<Self> {
        for (value, name) in [
            (self.short_range_base_days, "short_range_base_days"),
            (self.year_scale_min_days, "year_scale_min_days"),
            (self.multi_year_years, "multi_year_years"),
        ] {
            if value <= 0 {
                return Err(ChartError::InvalidConfig(format!(
                    "future window `{name}` must be > 0"
                )));
            }
        }
        if self.event_buffer_days < 0 {
            return Err(ChartError::InvalidConfig(
                "future window `event_buffer_days` must be >= 0".to_owned(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub fn event_buffer(self) -> Duration {
        Duration::days(self.event_buffer_days)
    }
}

/// Explicit layout configuration; no global split constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportLayout {
    pub split_ratio_percent: f64,
    pub future_window: FutureWindowConfig,
}

impl Default for ViewportLayout {
    fn default() -> Self {
        Self {
            split_ratio_percent: DEFAULT_PAST_PERCENT,
            future_window: FutureWindowConfig::default(),
        }
    }
}

impl ViewportLayout {
    pub fn new(split_ratio_percent: f64, future_window: FutureWindowConfig) -> ChartResult<Self> {
        if !split_ratio_percent.is_finite()
            || split_ratio_percent <= 0.0
            || split_ratio_percent >= 100.0
        {
            return Err(ChartError::InvalidConfig(
                "viewport split ratio must be within (0, 100)".to_owned(),
            ));
        }
        Ok(Self {
            split_ratio_percent,
            future_window: future_window.validate()?,
        })
    }

    #[must_use]
    pub fn split(self, show_future: bool) -> ViewportSplit {
        if show_future {
            ViewportSplit {
                past_percent: self.split_ratio_percent,
                future_percent: 100.0 - self.split_ratio_percent,
            }
        } else {
            ViewportSplit::history_only()
        }
    }

    /// Time span covered by the future section.
    ///
    /// Short ranges scale the base window linearly with `future_percent`
    /// (base applies at 50 %). Year-scale ranges mirror the past duration:
    /// YTD spans from the local year start to `now` (at least the year-scale
    /// minimum), 1Y spans 365 days. The multi-year range uses a fixed
    /// multiple of a year. A hidden future section has a zero window.
    #[must_use]
    pub fn future_window_duration(
        self,
        range: ChartRange,
        future_percent: f64,
        now: DateTime<Utc>,
    ) -> Duration {
        if !future_percent.is_finite() || future_percent <= 0.0 {
            return Duration::zero();
        }
        let config = self.future_window;
        match range {
            ChartRange::OneDay
            | ChartRange::OneWeek
            | ChartRange::OneMonth
            | ChartRange::ThreeMonths => {
                let base_ms = Duration::days(config.short_range_base_days).num_milliseconds();
                let scaled = (base_ms as f64 * future_percent / 50.0).round() as i64;
                Duration::milliseconds(scaled)
            }
            ChartRange::YearToDate => {
                let elapsed = year_start(now).map_or_else(Duration::zero, |start| now - start);
                elapsed.max(Duration::days(config.year_scale_min_days))
            }
            ChartRange::OneYear => {
                Duration::days(365).max(Duration::days(config.year_scale_min_days))
            }
            ChartRange::FiveYears => Duration::days(365 * config.multi_year_years),
        }
    }
}

/// Local-midnight January 1st of `now`'s exchange-local year.
#[must_use]
pub fn year_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let year = now.with_timezone(&MARKET_TIME_ZONE).year();
    MARKET_TIME_ZONE
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
