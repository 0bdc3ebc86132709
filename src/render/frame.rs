use serde::{Deserialize, Serialize};

use crate::core::layout::{SectionGeometry, ViewportSplit};
use crate::core::positioning::{CandleGeometry, CoordinateMapper, PathSegment, VolumeBar};
use crate::core::types::{ChartRange, PlotArea, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::extensions::events::EventDot;
use crate::extensions::labels::AxisLabel;

/// Backend-agnostic scene for one chart draw pass.
///
/// Everything in here is derived from one input snapshot and one viewport.
/// The crosshair selection is handed to renderers separately so pointer
/// moves never invalidate a cached frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFrame {
    pub viewport: Viewport,
    pub range: ChartRange,
    pub split: ViewportSplit,
    pub sections: SectionGeometry,
    pub plot: PlotArea,
    pub mapper: CoordinateMapper,
    /// x of the past/future boundary.
    pub now_x: f64,
    pub sample_count: usize,
    pub path: Vec<PathSegment>,
    pub candles: Vec<CandleGeometry>,
    pub volume: Vec<VolumeBar>,
    pub scheduled_dots: Vec<EventDot>,
    pub historical_dots: Vec<EventDot>,
    pub labels: Vec<AxisLabel>,
    /// Previous-close line, when a reference value was supplied.
    pub reference_line_y: Option<f64>,
}

impl ChartFrame {
    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        for segment in &self.path {
            for point in &segment.points {
                ensure_finite(&[point.x, point.y], "path point")?;
            }
        }
        for candle in &self.candles {
            ensure_finite(
                &[
                    candle.center_x,
                    candle.body_left,
                    candle.body_right,
                    candle.body_top,
                    candle.body_bottom,
                    candle.wick_top,
                    candle.wick_bottom,
                    candle.wick_width,
                ],
                "candle",
            )?;
            if candle.body_left > candle.body_right || candle.body_top > candle.body_bottom {
                return Err(ChartError::InvalidData(format!(
                    "candle {} has inverted body bounds",
                    candle.index
                )));
            }
        }
        for bar in &self.volume {
            ensure_finite(&[bar.left, bar.right, bar.top, bar.bottom], "volume bar")?;
        }
        for dot in self.scheduled_dots.iter().chain(&self.historical_dots) {
            ensure_finite(&[dot.x, dot.y, dot.section_fraction], "event dot")?;
        }
        for label in &self.labels {
            ensure_finite(&[label.x_percent], "axis label")?;
        }
        if let Some(y) = self.reference_line_y {
            ensure_finite(&[y], "reference line")?;
        }
        ensure_finite(&[self.now_x], "now marker")?;

        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
            && self.candles.is_empty()
            && self.scheduled_dots.is_empty()
            && self.historical_dots.is_empty()
    }

    #[must_use]
    pub fn visible_labels(&self) -> impl Iterator<Item = &AxisLabel> {
        self.labels.iter().filter(|label| label.visible)
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::Serialization(format!("failed to serialize frame: {e}")))
    }
}

fn ensure_finite(values: &[f64], what: &str) -> ChartResult<()> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ChartError::InvalidData(format!(
            "{what} contains non-finite coordinates"
        )))
    }
}
