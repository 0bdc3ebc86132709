//! Sample → pixel mapping under the three positioning regimes.
//!
//! Every surface of one render (price path, candles, volume bars, event dots)
//! and the hit-test pass must go through the same [`CoordinateMapper`] value.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel-projection")]
use rayon::prelude::*;

use crate::core::layout::Section;
use crate::core::market_hours::{MarketHoursBounds, MarketHoursResolver};
use crate::core::price_scale::PriceScale;
use crate::core::primitives::{guarded_ratio, seconds_between};
use crate::core::types::{ChartRange, PlotArea, Sample, SessionKind};
use crate::error::{ChartError, ChartResult};

/// Lookback of the multi-year range, independent of available history.
pub const FIXED_LOOKBACK_MONTHS: u32 = 60;

/// Fractional slack allowed outside `[0, 1]` before a position counts as
/// off-plot.
pub const PLOT_BOUNDS_EPSILON: f64 = 0.005;

/// Positioning strategy used to map a sample to a horizontal fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositioningRegime {
    /// Time-proportional across one trading day's extended session.
    Intraday { bounds: MarketHoursBounds },
    /// Evenly spaced by index; non-trading gaps are already collapsed. A
    /// lone sample sits at the section center.
    IndexBased { count: usize },
    /// Time-proportional across a fixed window ending at `end`. History
    /// shorter than the window leaves the left side blank.
    AbsoluteWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl PositioningRegime {
    /// Picks the regime for a range over an already-normalized series.
    ///
    /// The intraday regime uses the session of the trading day holding the
    /// last sample (or `now` for an empty series). Without a calendar entry it
    /// falls back to the series' own time span, then to index positioning.
    #[must_use]
    pub fn resolve(
        range: ChartRange,
        samples: &[Sample],
        now: DateTime<Utc>,
        resolver: &dyn MarketHoursResolver,
    ) -> Self {
        match range {
            ChartRange::OneDay => {
                let anchor = samples.last().map_or(now, |sample| sample.timestamp);
                let day = resolver.trading_day_of(anchor);
                if let Some(bounds) = resolver.bounds_for(day) {
                    return PositioningRegime::Intraday { bounds };
                }
                match (samples.first(), samples.last()) {
                    (Some(first), Some(last)) if first.timestamp < last.timestamp => {
                        match MarketHoursBounds::new(
                            first.timestamp,
                            first.timestamp,
                            last.timestamp,
                            last.timestamp,
                        ) {
                            Ok(bounds) => PositioningRegime::Intraday { bounds },
                            Err(_) => PositioningRegime::IndexBased {
                                count: samples.len(),
                            },
                        }
                    }
                    _ => PositioningRegime::IndexBased {
                        count: samples.len(),
                    },
                }
            }
            ChartRange::FiveYears => PositioningRegime::AbsoluteWindow {
                start: fixed_lookback_start(now),
                end: now,
            },
            ChartRange::OneWeek
            | ChartRange::OneMonth
            | ChartRange::ThreeMonths
            | ChartRange::YearToDate
            | ChartRange::OneYear => PositioningRegime::IndexBased {
                count: samples.len(),
            },
        }
    }

    /// Horizontal position as a fraction of the section width (unclamped).
    #[must_use]
    pub fn fraction(&self, index: usize, timestamp: DateTime<Utc>) -> f64 {
        match *self {
            PositioningRegime::Intraday { bounds } => guarded_ratio(
                seconds_between(bounds.extended_open, timestamp),
                bounds.extended_duration_seconds(),
            ),
            PositioningRegime::IndexBased { count } if count <= 1 => 0.5,
            PositioningRegime::IndexBased { count } => index as f64 / (count - 1) as f64,
            PositioningRegime::AbsoluteWindow { start, end } => guarded_ratio(
                seconds_between(start, timestamp),
                seconds_between(start, end),
            ),
        }
    }

    /// Position of an arbitrary instant, available for time-proportional
    /// regimes only.
    #[must_use]
    pub fn fraction_for_time(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        match self {
            PositioningRegime::IndexBased { .. } => None,
            PositioningRegime::Intraday { .. } | PositioningRegime::AbsoluteWindow { .. } => {
                Some(self.fraction(0, timestamp))
            }
        }
    }

    #[must_use]
    pub fn session_bounds(&self) -> Option<MarketHoursBounds> {
        match self {
            PositioningRegime::Intraday { bounds } => Some(*bounds),
            _ => None,
        }
    }
}

/// Start of the fixed multi-year window ending at `now`.
#[must_use]
pub fn fixed_lookback_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(FIXED_LOOKBACK_MONTHS))
        .unwrap_or_else(|| now - Duration::days(365 * 5))
}

/// Bounds for candle body and wick widths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleWidthConfig {
    pub min_body_px: f64,
    pub max_body_px: f64,
    /// Share of a sample's slot covered by its body.
    pub body_fill_ratio: f64,
    pub min_wick_px: f64,
    pub max_wick_px: f64,
}

impl Default for CandleWidthConfig {
    fn default() -> Self {
        Self {
            min_body_px: 1.0,
            max_body_px: 12.0,
            body_fill_ratio: 0.7,
            min_wick_px: 0.5,
            max_wick_px: 1.5,
        }
    }
}

impl CandleWidthConfig {
    pub fn validate(self) -> ChartResult<Self> {
        for (value, name) in [
            (self.min_body_px, "min_body_px"),
            (self.max_body_px, "max_body_px"),
            (self.body_fill_ratio, "body_fill_ratio"),
            (self.min_wick_px, "min_wick_px"),
            (self.max_wick_px, "max_wick_px"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ChartError::InvalidConfig(format!(
                    "candle config `{name}` must be finite and > 0"
                )));
            }
        }
        if self.min_body_px > self.max_body_px || self.min_wick_px > self.max_wick_px {
            return Err(ChartError::InvalidConfig(
                "candle config minimums must not exceed maximums".to_owned(),
            ));
        }
        Ok(self)
    }

    /// Body width from the pixel slot between neighbouring samples (see
    /// [`CoordinateMapper::sample_slot_px`]); wick width shrinks with the
    /// historical section's share of the chart.
    ///
    /// The body never exceeds the slot, so adjacent bodies cannot overlap
    /// even when the slot is narrower than `min_body_px`.
    #[must_use]
    pub fn widths(self, slot_px: f64, past_fraction: f64) -> CandleWidths {
        let mut body_px = (slot_px.max(0.0) * self.body_fill_ratio)
            .clamp(self.min_body_px, self.max_body_px);
        if slot_px.is_finite() && slot_px > 0.0 {
            body_px = body_px.min(slot_px);
        }
        let wick_px =
            (self.max_wick_px * past_fraction.clamp(0.0, 1.0)).clamp(self.min_wick_px, self.max_wick_px);
        CandleWidths { body_px, wick_px }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleWidths {
    pub body_px: f64,
    pub wick_px: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

/// Run of consecutive path points sharing one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub session: Option<SessionKind>,
    pub points: Vec<PathPoint>,
}

/// Projected candle geometry in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleGeometry {
    pub index: usize,
    pub center_x: f64,
    pub body_left: f64,
    pub body_right: f64,
    pub body_top: f64,
    pub body_bottom: f64,
    pub wick_top: f64,
    pub wick_bottom: f64,
    pub wick_width: f64,
    pub is_bullish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub index: usize,
    pub center_x: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub is_bullish: bool,
}

/// Immutable `(regime, params)` pair for one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateMapper {
    regime: PositioningRegime,
    section: Section,
    price_scale: PriceScale,
    plot: PlotArea,
}

impl CoordinateMapper {
    #[must_use]
    pub fn new(
        regime: PositioningRegime,
        section: Section,
        price_scale: PriceScale,
        plot: PlotArea,
    ) -> Self {
        Self {
            regime,
            section,
            price_scale,
            plot,
        }
    }

    #[must_use]
    pub fn regime(&self) -> PositioningRegime {
        self.regime
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn price_scale(&self) -> PriceScale {
        self.price_scale
    }

    #[must_use]
    pub fn plot(&self) -> PlotArea {
        self.plot
    }

    #[must_use]
    pub fn x_fraction(&self, index: usize, timestamp: DateTime<Utc>) -> f64 {
        self.regime.fraction(index, timestamp)
    }

    #[must_use]
    pub fn x_for(&self, index: usize, timestamp: DateTime<Utc>) -> f64 {
        self.section.x_at(self.x_fraction(index, timestamp))
    }

    #[must_use]
    pub fn sample_x(&self, samples: &[Sample], index: usize) -> Option<f64> {
        samples
            .get(index)
            .map(|sample| self.x_for(index, sample.timestamp))
    }

    #[must_use]
    pub fn y_for(&self, value: f64) -> f64 {
        self.price_scale.price_to_pixel(value, self.plot)
    }

    /// Narrowest pixel gap between consecutive on-plot samples under this
    /// mapping. Fewer than two plotted samples share the section evenly.
    #[must_use]
    pub fn sample_slot_px(&self, samples: &[Sample]) -> f64 {
        let mut previous: Option<f64> = None;
        let mut slot: Option<f64> = None;
        let mut plotted = 0_usize;
        for (index, sample) in samples.iter().enumerate() {
            let fraction = self.x_fraction(index, sample.timestamp);
            if !Self::is_on_plot(fraction) {
                continue;
            }
            plotted += 1;
            let x = self.section.x_at(fraction);
            if let Some(gap) = previous.map(|prev| x - prev).filter(|gap| *gap > 0.0) {
                slot = Some(slot.map_or(gap, |current: f64| current.min(gap)));
            }
            previous = Some(x);
        }
        slot.unwrap_or_else(|| self.section.width.max(0.0) / plotted.max(1) as f64)
    }

    #[must_use]
    pub fn is_on_plot(fraction: f64) -> bool {
        fraction.is_finite()
            && fraction >= -PLOT_BOUNDS_EPSILON
            && fraction <= 1.0 + PLOT_BOUNDS_EPSILON
    }

    fn session_of(&self, sample: &Sample) -> Option<SessionKind> {
        sample.session.or_else(|| {
            self.regime
                .session_bounds()
                .and_then(|bounds| bounds.session_at(sample.timestamp))
        })
    }

    /// Close-price path split into runs of equal session. Samples falling
    /// off-plot (e.g. older than a fixed lookback window) are clipped.
    #[must_use]
    pub fn project_path(&self, samples: &[Sample]) -> Vec<PathSegment> {
        let mut segments: Vec<PathSegment> = Vec::new();
        for (index, sample) in samples.iter().enumerate() {
            let fraction = self.x_fraction(index, sample.timestamp);
            if !Self::is_on_plot(fraction) {
                continue;
            }
            let point = PathPoint {
                index,
                x: self.section.x_at(fraction),
                y: self.y_for(sample.close),
            };
            let session = self.session_of(sample);
            match segments.last_mut() {
                Some(segment) if segment.session == session => segment.points.push(point),
                _ => {
                    // Start the new run at the previous run's last point so the
                    // line stays continuous across session changes.
                    let mut points = Vec::with_capacity(samples.len() - index + 1);
                    if let Some(previous) = segments.last().and_then(|s| s.points.last()) {
                        points.push(*previous);
                    }
                    points.push(point);
                    segments.push(PathSegment { session, points });
                }
            }
        }
        segments
    }

    /// Projects candles with the shared mapping.
    pub fn project_candles(
        &self,
        samples: &[Sample],
        widths: CandleWidths,
    ) -> ChartResult<Vec<CandleGeometry>> {
        if !widths.body_px.is_finite() || widths.body_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "body width must be finite and > 0".to_owned(),
            ));
        }

        #[cfg(feature = "parallel-projection")]
        {
            Ok(samples
                .par_iter()
                .enumerate()
                .filter_map(|(index, sample)| self.project_single_candle(index, sample, widths))
                .collect())
        }

        #[cfg(not(feature = "parallel-projection"))]
        {
            Ok(samples
                .iter()
                .enumerate()
                .filter_map(|(index, sample)| self.project_single_candle(index, sample, widths))
                .collect())
        }
    }

    fn project_single_candle(
        &self,
        index: usize,
        sample: &Sample,
        widths: CandleWidths,
    ) -> Option<CandleGeometry> {
        let fraction = self.x_fraction(index, sample.timestamp);
        if !Self::is_on_plot(fraction) {
            return None;
        }
        let half = widths.body_px / 2.0;
        let center_x = self.section.x_at(fraction);
        let open_y = self.y_for(sample.open);
        let close_y = self.y_for(sample.close);

        Some(CandleGeometry {
            index,
            center_x,
            body_left: center_x - half,
            body_right: center_x + half,
            body_top: open_y.min(close_y),
            body_bottom: open_y.max(close_y),
            wick_top: self.y_for(sample.high),
            wick_bottom: self.y_for(sample.low),
            wick_width: widths.wick_px,
            is_bullish: sample.is_bullish(),
        })
    }

    /// Volume bars anchored to the plot bottom, scaled by the largest volume
    /// into the bottom `height_ratio` band.
    #[must_use]
    pub fn project_volume(
        &self,
        samples: &[Sample],
        height_ratio: f64,
        bar_width_px: f64,
    ) -> Vec<VolumeBar> {
        let max_volume = samples
            .iter()
            .map(|sample| sample.volume)
            .filter(|volume| volume.is_finite())
            .fold(0.0_f64, f64::max);
        if max_volume <= 0.0 {
            return Vec::new();
        }

        let band = self.plot.height * height_ratio.clamp(0.0, 1.0);
        let bottom = self.plot.bottom();
        let half = bar_width_px.max(0.0) / 2.0;

        samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                let fraction = self.x_fraction(index, sample.timestamp);
                if !Self::is_on_plot(fraction) || !sample.volume.is_finite() {
                    return None;
                }
                let center_x = self.section.x_at(fraction);
                let height = band * (sample.volume.max(0.0) / max_volume);
                Some(VolumeBar {
                    index,
                    center_x,
                    left: center_x - half,
                    right: center_x + half,
                    top: bottom - height,
                    bottom,
                    is_bullish: sample.is_bullish(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{CandleWidthConfig, PositioningRegime};

    #[test]
    fn index_regime_centers_single_sample() {
        let regime = PositioningRegime::IndexBased { count: 1 };
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        assert_eq!(regime.fraction(0, t), 0.5);
    }

    #[test]
    fn absolute_window_with_zero_span_stays_finite() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        let regime = PositioningRegime::AbsoluteWindow { start: t, end: t };
        assert!(regime.fraction(0, t + Duration::seconds(1)).is_finite());
    }

    #[test]
    fn wick_shrinks_with_compressed_history() {
        let config = CandleWidthConfig::default();
        let full = config.widths(12.0, 1.0);
        let compressed = config.widths(12.0, 0.6);
        assert!(compressed.wick_px < full.wick_px);
        assert_eq!(full.wick_px, config.max_wick_px);
    }

    #[test]
    fn body_width_is_clamped() {
        let config = CandleWidthConfig::default();
        assert_eq!(config.widths(500.0, 1.0).body_px, config.max_body_px);
        assert_eq!(config.widths(1.2, 1.0).body_px, config.min_body_px);
    }

    #[test]
    fn body_never_exceeds_sample_slot() {
        let config = CandleWidthConfig::default();
        assert_eq!(config.widths(0.5, 1.0).body_px, 0.5);
        assert!((config.widths(3.125, 1.0).body_px - 3.125 * 0.7).abs() < 1e-12);
    }
}
