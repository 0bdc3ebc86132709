use tracing::debug;

use crate::core::layout::SectionGeometry;
use crate::core::market_hours::MarketHoursResolver;
use crate::core::normalize::{BucketKind, normalize};
use crate::core::positioning::{CoordinateMapper, PositioningRegime};
use crate::core::price_scale::PriceScale;
use crate::core::types::{PlotArea, Sample, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::extensions::events::EventProjector;
use crate::extensions::labels::{LabelContext, build_labels};
use crate::render::ChartFrame;

use super::{ChartEngineConfig, ChartInput};

pub(super) struct PreparedFrame {
    pub(super) samples: Vec<Sample>,
    pub(super) frame: ChartFrame,
}

/// Runs `normalize → layout → map → project events → place labels` for one
/// input snapshot.
pub(super) fn build_frame(
    input: &ChartInput,
    viewport: Viewport,
    config: &ChartEngineConfig,
    resolver: &dyn MarketHoursResolver,
) -> ChartResult<PreparedFrame> {
    if !viewport.is_valid() {
        return Err(ChartError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let samples = normalize(input.samples.clone(), input.range);
    debug!(
        range = input.range.code(),
        original = input.samples.len(),
        normalized = samples.len(),
        "normalized chart series"
    );

    let layout = config.layout()?;
    let split = layout.split(config.show_future_section);
    let sections = SectionGeometry::new(f64::from(viewport.width), split);
    let plot = PlotArea::from_viewport(viewport, config.insets);
    let price_scale =
        PriceScale::from_samples(&samples, input.previous_close, config.price_scale_tuning());
    let regime = PositioningRegime::resolve(input.range, &samples, input.now, resolver);
    let mapper = CoordinateMapper::new(regime, sections.past, price_scale, plot);

    let widths = config
        .candle
        .widths(mapper.sample_slot_px(&samples), split.past_fraction());
    let candles = mapper.project_candles(&samples, widths)?;
    let volume = mapper.project_volume(&samples, config.volume_height_ratio, widths.body_px);
    let path = mapper.project_path(&samples);

    let future_window = layout.future_window_duration(input.range, split.future_percent, input.now);
    let event_buffer = config.future_window.event_buffer();
    let projector = EventProjector {
        now: input.now,
        future_window,
        buffer: event_buffer,
        bucket_kind: BucketKind::for_range(input.range),
        filter: config.event_filter(),
        interpolate_within_buckets: config.interpolate_historical_events,
    };
    let scheduled_dots = projector.project_scheduled(&input.scheduled_events, sections, plot);
    let historical_dots = projector.project_historical(&input.historical_events, &samples, &mapper);
    debug!(
        scheduled = scheduled_dots.len(),
        scheduled_input = input.scheduled_events.len(),
        historical = historical_dots.len(),
        historical_input = input.historical_events.len(),
        "projected event dots"
    );

    let labels = build_labels(
        &LabelContext {
            range: input.range,
            samples: &samples,
            regime,
            split,
            now: input.now,
            future_window,
            event_buffer,
        },
        config.labels,
    );

    let reference_line_y = input
        .previous_close
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(|value| mapper.y_for(value));

    let frame = ChartFrame {
        viewport,
        range: input.range,
        split,
        sections,
        plot,
        mapper,
        now_x: sections.now_x(),
        sample_count: samples.len(),
        path,
        candles,
        volume,
        scheduled_dots,
        historical_dots,
        labels,
        reference_line_y,
    };
    Ok(PreparedFrame { samples, frame })
}
