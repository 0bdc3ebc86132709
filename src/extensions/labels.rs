//! Time-axis label generation and greedy overlap removal.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::layout::ViewportSplit;
use crate::core::market_hours::MARKET_TIME_ZONE;
use crate::core::positioning::{CoordinateMapper, PositioningRegime};
use crate::core::primitives::duration_seconds;
use crate::core::types::{ChartRange, Sample};
use crate::error::{ChartError, ChartResult};
use crate::extensions::events::future_fraction;

const AVERAGE_MONTH_DAYS: f64 = 30.44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelSection {
    Past,
    Future,
}

/// One axis label; `x_percent` is a fraction of the full chart width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLabel {
    pub text: String,
    pub x_percent: f64,
    pub section: LabelSection,
    pub visible: bool,
}

impl AxisLabel {
    fn candidate(text: String, x_percent: f64, section: LabelSection) -> Self {
        Self {
            text,
            x_percent,
            section,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelPlacementConfig {
    /// Minimum distance between visible labels of one section, as a fraction
    /// of chart width.
    pub min_spacing: f64,
    /// Distance from a compressed section's inner boundary inside which labels
    /// are dropped.
    pub edge_threshold: f64,
    /// Sections narrower than this share of the chart count as compressed.
    pub compressed_section_threshold: f64,
    /// Target number of per-day labels for week/month views.
    pub day_label_target: usize,
    /// Upper bound on future-side labels.
    pub max_future_labels: usize,
}

impl Default for LabelPlacementConfig {
    fn default() -> Self {
        Self {
            min_spacing: 0.12,
            edge_threshold: 0.08,
            compressed_section_threshold: 0.25,
            day_label_target: 5,
            max_future_labels: 4,
        }
    }
}

impl LabelPlacementConfig {
    pub fn validate(self) -> ChartResult<Self> {
        for (value, name) in [
            (self.min_spacing, "min_spacing"),
            (self.edge_threshold, "edge_threshold"),
            (
                self.compressed_section_threshold,
                "compressed_section_threshold",
            ),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidConfig(format!(
                    "label config `{name}` must be finite and within [0, 1]"
                )));
            }
        }
        if self.day_label_target == 0 {
            return Err(ChartError::InvalidConfig(
                "label config `day_label_target` must be > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Inputs shared with the event projector so labels and dots agree on the
/// timestamp at every x.
#[derive(Debug, Clone, Copy)]
pub struct LabelContext<'a> {
    pub range: ChartRange,
    pub samples: &'a [Sample],
    pub regime: PositioningRegime,
    pub split: ViewportSplit,
    pub now: DateTime<Utc>,
    pub future_window: Duration,
    pub event_buffer: Duration,
}

/// Generates candidates for both sections and resolves visibility.
#[must_use]
pub fn build_labels(context: &LabelContext<'_>, config: LabelPlacementConfig) -> Vec<AxisLabel> {
    let mut candidates = past_label_candidates(context, config);
    candidates.extend(future_label_candidates(context, config));
    place_labels(candidates, context.split, config)
}

/// Historical-section candidates appropriate to the range.
#[must_use]
pub fn past_label_candidates(
    context: &LabelContext<'_>,
    config: LabelPlacementConfig,
) -> Vec<AxisLabel> {
    let past = context.split.past_fraction();
    let to_label = |text: String, fraction: f64| {
        CoordinateMapper::is_on_plot(fraction).then(|| {
            AxisLabel::candidate(text, past * fraction.clamp(0.0, 1.0), LabelSection::Past)
        })
    };

    match context.range {
        ChartRange::OneDay => match context.regime.session_bounds() {
            Some(bounds) => clock_instants(bounds.extended_open, bounds.regular_open, bounds.extended_close)
                .into_iter()
                .filter_map(|instant| {
                    let fraction = context.regime.fraction_for_time(instant)?;
                    to_label(format_clock(instant), fraction)
                })
                .collect(),
            None => first_index_per_key(context.samples, |local| {
                (local.date_naive(), local.hour())
            })
            .into_values()
            .filter_map(|index| {
                let sample = context.samples.get(index)?;
                to_label(
                    format_clock(sample.timestamp),
                    context.regime.fraction(index, sample.timestamp),
                )
            })
            .collect(),
        },
        ChartRange::OneWeek | ChartRange::OneMonth => {
            let days: Vec<usize> =
                first_index_per_key(context.samples, |local| local.date_naive())
                    .into_values()
                    .collect();
            let pattern = if context.range == ChartRange::OneWeek {
                "%a %-d"
            } else {
                "%b %-d"
            };
            subsample_evenly(&days, config.day_label_target)
                .into_iter()
                .filter_map(|index| {
                    let sample = context.samples.get(index)?;
                    let text = sample
                        .timestamp
                        .with_timezone(&MARKET_TIME_ZONE)
                        .format(pattern)
                        .to_string();
                    to_label(text, context.regime.fraction(index, sample.timestamp))
                })
                .collect()
        }
        ChartRange::ThreeMonths | ChartRange::YearToDate | ChartRange::OneYear => {
            let months: Vec<usize> = first_index_per_key(context.samples, |local| {
                (local.year(), local.month())
            })
            .into_values()
            .collect();
            let every_other = context.range == ChartRange::OneYear
                || (context.range == ChartRange::YearToDate && months.len() > 6);
            months
                .into_iter()
                .enumerate()
                .filter(|(position, _)| !every_other || position % 2 == 0)
                .filter_map(|(_, index)| {
                    let sample = context.samples.get(index)?;
                    let text = sample
                        .timestamp
                        .with_timezone(&MARKET_TIME_ZONE)
                        .format("%b")
                        .to_string();
                    to_label(text, context.regime.fraction(index, sample.timestamp))
                })
                .collect()
        }
        ChartRange::FiveYears => {
            let (start, end) = match context.regime {
                PositioningRegime::AbsoluteWindow { start, end } => (start, end),
                _ => return Vec::new(),
            };
            let first_year = start.with_timezone(&MARKET_TIME_ZONE).year() + 1;
            let last_year = end.with_timezone(&MARKET_TIME_ZONE).year();
            (first_year..=last_year)
                .filter_map(|year| {
                    let instant = local_month_start(year, 1)?;
                    let fraction = context.regime.fraction_for_time(instant)?;
                    to_label(year.to_string(), fraction)
                })
                .collect()
        }
    }
}

/// Future-section month (or year) labels sized from the future window.
#[must_use]
pub fn future_label_candidates(
    context: &LabelContext<'_>,
    config: LabelPlacementConfig,
) -> Vec<AxisLabel> {
    let window_days = duration_seconds(context.future_window) / 86_400.0;
    if window_days <= 0.0 || !context.split.shows_future() {
        return Vec::new();
    }

    let past = context.split.past_fraction();
    let future = context.split.future_fraction();
    let local_now = context.now.with_timezone(&MARKET_TIME_ZONE);
    let to_label = |text: String, instant: DateTime<Utc>| {
        let fraction = future_fraction(
            instant,
            context.now,
            context.future_window,
            context.event_buffer,
        )?;
        CoordinateMapper::is_on_plot(fraction).then(|| {
            AxisLabel::candidate(
                text,
                past + future * fraction.clamp(0.0, 1.0),
                LabelSection::Future,
            )
        })
    };

    if window_days >= 2.0 * 365.0 {
        let last = (context.now + context.future_window)
            .with_timezone(&MARKET_TIME_ZONE)
            .year();
        return ((local_now.year() + 1)..=last)
            .filter_map(|year| to_label(year.to_string(), local_month_start(year, 1)?))
            .take(config.max_future_labels.max(1))
            .collect();
    }

    let month_count = (window_days / AVERAGE_MONTH_DAYS).round().max(1.0) as u32;
    let step = month_count
        .div_ceil(config.max_future_labels.max(1) as u32)
        .max(1);
    let Some(current_month) = local_month_start(local_now.year(), local_now.month()) else {
        return Vec::new();
    };

    (1..=month_count)
        .filter(|offset| offset % step == 0)
        .filter_map(|offset| {
            let instant = current_month
                .with_timezone(&MARKET_TIME_ZONE)
                .checked_add_months(Months::new(offset))?
                .with_timezone(&Utc);
            let text = instant
                .with_timezone(&MARKET_TIME_ZONE)
                .format("%b")
                .to_string();
            to_label(text, instant)
        })
        .collect()
}

/// Resolves visibility with one left-to-right greedy sweep per section.
///
/// A candidate is kept when it sits at least `min_spacing` past the last kept
/// candidate of its section. In a section narrower than
/// `compressed_section_threshold`, candidates within `edge_threshold` of the
/// inner (past/future) boundary are hidden first.
#[must_use]
pub fn place_labels(
    candidates: Vec<AxisLabel>,
    split: ViewportSplit,
    config: LabelPlacementConfig,
) -> Vec<AxisLabel> {
    let boundary = split.past_fraction();
    let (mut past, mut future): (Vec<AxisLabel>, Vec<AxisLabel>) = candidates
        .into_iter()
        .partition(|label| label.section == LabelSection::Past);

    for (group, share) in [
        (&mut past, split.past_fraction()),
        (&mut future, split.future_fraction()),
    ] {
        group.sort_by_key(|label| OrderedFloat(label.x_percent));
        let compressed = share < config.compressed_section_threshold;
        let mut last_kept: Option<f64> = None;

        for label in group.iter_mut() {
            let near_inner_edge = compressed
                && (label.x_percent - boundary).abs() < config.edge_threshold;
            let spaced = last_kept.is_none_or(|last| label.x_percent - last >= config.min_spacing);
            label.visible = !near_inner_edge && spaced;
            if label.visible {
                last_kept = Some(label.x_percent);
            }
        }
    }

    past.extend(future);
    past
}

fn clock_instants(
    extended_open: DateTime<Utc>,
    regular_open: DateTime<Utc>,
    extended_close: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let mut instants = vec![regular_open];
    let local_open = extended_open.with_timezone(&MARKET_TIME_ZONE);
    let first_hour = if local_open.minute() == 0 && local_open.second() == 0 {
        extended_open
    } else {
        extended_open + Duration::minutes(i64::from(60 - local_open.minute()))
            - Duration::seconds(i64::from(local_open.second()))
    };

    let mut cursor = first_hour;
    while cursor <= extended_close {
        if cursor != regular_open {
            instants.push(cursor);
        }
        cursor += Duration::hours(1);
    }
    instants.sort();
    instants
}

fn format_clock(instant: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&MARKET_TIME_ZONE);
    if local.minute() == 0 {
        local.format("%-I %p").to_string()
    } else {
        local.format("%-I:%M %p").to_string()
    }
}

fn first_index_per_key<K, F>(samples: &[Sample], key: F) -> IndexMap<K, usize>
where
    K: std::hash::Hash + Eq,
    F: Fn(DateTime<chrono_tz::Tz>) -> K,
{
    let mut firsts = IndexMap::new();
    for (index, sample) in samples.iter().enumerate() {
        firsts
            .entry(key(sample.timestamp.with_timezone(&MARKET_TIME_ZONE)))
            .or_insert(index);
    }
    firsts
}

/// Picks `target` evenly spread entries, always keeping both ends.
fn subsample_evenly(items: &[usize], target: usize) -> Vec<usize> {
    if items.len() <= target || target == 0 {
        return items.to_vec();
    }
    if target == 1 {
        return vec![items[0]];
    }
    let last = (items.len() - 1) as f64;
    let mut picked: Vec<usize> = (0..target)
        .map(|slot| {
            let position = (slot as f64 * last / (target - 1) as f64).round() as usize;
            items[position.min(items.len() - 1)]
        })
        .collect();
    picked.dedup();
    picked
}

fn local_month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    MARKET_TIME_ZONE
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{AxisLabel, LabelPlacementConfig, LabelSection, place_labels, subsample_evenly};
    use crate::core::layout::ViewportSplit;

    fn label(x: f64, section: LabelSection) -> AxisLabel {
        AxisLabel {
            text: format!("{x}"),
            x_percent: x,
            section,
            visible: true,
        }
    }

    #[test]
    fn greedy_sweep_compares_against_last_kept() {
        let split = ViewportSplit::new(100.0).expect("split");
        let placed = place_labels(
            vec![
                label(0.0, LabelSection::Past),
                label(0.10, LabelSection::Past),
                label(0.13, LabelSection::Past),
                label(0.20, LabelSection::Past),
            ],
            split,
            LabelPlacementConfig::default(),
        );
        let visible: Vec<f64> = placed
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.x_percent)
            .collect();
        assert_eq!(visible, vec![0.0, 0.13]);
    }

    #[test]
    fn compressed_future_section_hides_labels_near_boundary() {
        let split = ViewportSplit::new(80.0).expect("split");
        let placed = place_labels(
            vec![
                label(0.85, LabelSection::Future),
                label(0.97, LabelSection::Future),
            ],
            split,
            LabelPlacementConfig::default(),
        );
        assert!(!placed[0].visible);
        assert!(placed[1].visible);
    }

    #[test]
    fn subsample_keeps_both_ends() {
        let items: Vec<usize> = (0..21).collect();
        assert_eq!(subsample_evenly(&items, 5), vec![0, 5, 10, 15, 20]);
        assert_eq!(subsample_evenly(&items[..3], 5), vec![0, 1, 2]);
    }
}
