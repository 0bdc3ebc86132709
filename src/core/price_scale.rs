use serde::{Deserialize, Serialize};

use crate::core::primitives::{MIN_DENOMINATOR, guarded_ratio};
use crate::core::types::{PlotArea, Sample};
use crate::error::{ChartError, ChartResult};

/// Tuning controls for price-domain autoscaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScaleTuning {
    /// Fraction of the data span added above the max and below the min.
    pub padding_ratio: f64,
}

impl Default for PriceScaleTuning {
    fn default() -> Self {
        Self {
            padding_ratio: 0.10,
        }
    }
}

impl PriceScaleTuning {
    pub fn validate(self) -> ChartResult<Self> {
        if !self.padding_ratio.is_finite() || self.padding_ratio < 0.0 {
            return Err(ChartError::InvalidConfig(
                "price padding ratio must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Vertical mapping shared by every surface of one render.
///
/// An empty or zero-span domain maps every value to the vertical center of
/// the plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceScale {
    domain: Option<(f64, f64)>,
}

impl PriceScale {
    /// Creates a scale from an explicit domain.
    pub fn new(min: f64, max: f64) -> ChartResult<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ChartError::InvalidData(
                "price domain must be finite and ordered".to_owned(),
            ));
        }
        Ok(Self {
            domain: Some((min, max)),
        })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { domain: None }
    }

    /// Fits the domain over every OHLC field plus the optional reference
    /// value, then expands both sides by `padding_ratio` of the span. A flat
    /// series is widened by `padding_ratio` of its value (or by 1.0) so it
    /// sits at the vertical center.
    #[must_use]
    pub fn from_samples(
        samples: &[Sample],
        reference: Option<f64>,
        tuning: PriceScaleTuning,
    ) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for sample in samples {
            for value in [sample.open, sample.high, sample.low, sample.close] {
                if value.is_finite() {
                    min = min.min(value);
                    max = max.max(value);
                }
            }
        }
        if let Some(reference) = reference.filter(|value| value.is_finite()) {
            min = min.min(reference);
            max = max.max(reference);
        }

        if !min.is_finite() || !max.is_finite() {
            return Self::empty();
        }

        let padding_ratio = tuning.padding_ratio.max(0.0);
        if max - min <= MIN_DENOMINATOR {
            let half = min.abs() * padding_ratio;
            let half = if half > MIN_DENOMINATOR { half } else { 1.0 };
            return Self {
                domain: Some((min - half, max + half)),
            };
        }

        let padding = (max - min) * padding_ratio;
        Self {
            domain: Some((min - padding, max + padding)),
        }
    }

    #[must_use]
    pub fn domain(self) -> Option<(f64, f64)> {
        self.domain
    }

    /// `y = top + height - (value - min) / (max - min) * height`.
    #[must_use]
    pub fn price_to_pixel(self, value: f64, plot: PlotArea) -> f64 {
        match self.domain {
            Some((min, max)) if value.is_finite() && max - min > MIN_DENOMINATOR => {
                plot.top + plot.height - guarded_ratio(value - min, max - min) * plot.height
            }
            _ => plot.center_y(),
        }
    }

    #[must_use]
    pub fn pixel_to_price(self, pixel: f64, plot: PlotArea) -> Option<f64> {
        let (min, max) = self.domain?;
        if !pixel.is_finite() || plot.height <= 0.0 {
            return None;
        }
        let normalized = guarded_ratio(plot.top + plot.height - pixel, plot.height);
        Some(min + normalized * (max - min))
    }
}
