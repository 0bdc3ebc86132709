use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::decimal_to_f64;
use crate::error::{ChartError, ChartResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Vertical pixel margins reserved above and below the plotted price area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotInsets {
    pub top_px: f64,
    pub bottom_px: f64,
}

impl Default for PlotInsets {
    fn default() -> Self {
        Self {
            top_px: 16.0,
            bottom_px: 24.0,
        }
    }
}

/// Resolved vertical plot band in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotArea {
    pub top: f64,
    pub height: f64,
}

impl PlotArea {
    /// Resolves the plot band for a viewport. Insets larger than the viewport
    /// collapse the band to zero height at the top margin.
    #[must_use]
    pub fn from_viewport(viewport: Viewport, insets: PlotInsets) -> Self {
        let total = f64::from(viewport.height);
        let top = insets.top_px.max(0.0).min(total);
        let height = (total - top - insets.bottom_px.max(0.0)).max(0.0);
        Self { top, height }
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn center_y(self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Sub-period of a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    PreMarket,
    Regular,
    AfterHours,
}

/// One OHLCV sample produced by the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub session: Option<SessionKind>,
}

impl Sample {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            session: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionKind) -> Self {
        self.session = Some(session);
        self
    }

    /// Converts decimal prices coming from a market-data collaborator.
    pub fn from_decimal(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> ChartResult<Self> {
        let sample = Self::new(
            timestamp,
            decimal_to_f64(open, "open")?,
            decimal_to_f64(high, "high")?,
            decimal_to_f64(low, "low")?,
            decimal_to_f64(close, "close")?,
            decimal_to_f64(volume, "volume")?,
        );
        if !sample.has_finite_values() {
            return Err(ChartError::InvalidData(
                "sample values must be finite".to_owned(),
            ));
        }
        Ok(sample)
    }

    /// Returns `true` when every price is finite and strictly positive.
    #[must_use]
    pub fn has_positive_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|value| value.is_finite() && *value > 0.0)
    }

    #[must_use]
    pub fn has_finite_values(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|value| value.is_finite())
    }

    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Simplified line-form sample used when OHLC data is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl PricePoint {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<PricePoint> for Sample {
    fn from(point: PricePoint) -> Self {
        Sample::new(
            point.timestamp,
            point.value,
            point.value,
            point.value,
            point.value,
            0.0,
        )
    }
}

/// Selectable chart range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl ChartRange {
    pub const ALL: [ChartRange; 7] = [
        ChartRange::OneDay,
        ChartRange::OneWeek,
        ChartRange::OneMonth,
        ChartRange::ThreeMonths,
        ChartRange::YearToDate,
        ChartRange::OneYear,
        ChartRange::FiveYears,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ChartRange::OneDay => "1D",
            ChartRange::OneWeek => "1W",
            ChartRange::OneMonth => "1M",
            ChartRange::ThreeMonths => "3M",
            ChartRange::YearToDate => "YTD",
            ChartRange::OneYear => "1Y",
            ChartRange::FiveYears => "5Y",
        }
    }
}

impl std::str::FromStr for ChartRange {
    type Err = ChartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ChartRange::ALL
            .into_iter()
            .find(|range| range.code().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ChartError::InvalidData(format!("unknown chart range `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{ChartRange, PlotArea, PlotInsets, Sample, Viewport};

    #[test]
    fn decimal_prices_convert_to_sample() {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 20, 0, 0).unwrap();
        let sample = Sample::from_decimal(
            t,
            Decimal::new(10_125, 2),
            Decimal::new(10_250, 2),
            Decimal::new(10_000, 2),
            Decimal::new(10_200, 2),
            Decimal::new(1_500, 0),
        )
        .expect("decimal sample");
        assert_eq!(sample.open, 101.25);
        assert_eq!(sample.close, 102.0);
        assert_eq!(sample.volume, 1_500.0);
        assert!(sample.is_bullish());
    }

    #[test]
    fn chart_range_parses_codes_case_insensitively() {
        assert_eq!("ytd".parse::<ChartRange>().ok(), Some(ChartRange::YearToDate));
        assert_eq!("5Y".parse::<ChartRange>().ok(), Some(ChartRange::FiveYears));
        assert!("2Y".parse::<ChartRange>().is_err());
    }

    #[test]
    fn plot_area_collapses_when_insets_exceed_height() {
        let area = PlotArea::from_viewport(
            Viewport::new(100, 20),
            PlotInsets {
                top_px: 16.0,
                bottom_px: 24.0,
            },
        );
        assert_eq!(area.top, 16.0);
        assert_eq!(area.height, 0.0);
    }
}
