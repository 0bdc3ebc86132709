use tracing::{debug, trace};

use crate::core::market_hours::{MarketHoursResolver, UsEquitySessionResolver};
use crate::core::types::{Sample, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{InteractionState, PointerEvent, Selection, hit_test};
use crate::render::{ChartFrame, Renderer};

use super::frame_builder::build_frame;
use super::frame_cache::{FrameCacheEntry, FrameCacheKey, FrameCacheStats, input_fingerprint};
use super::{ChartEngineConfig, ChartInput};

/// Main orchestration facade consumed by host applications.
///
/// `ChartEngine` owns the current input snapshot, viewport and config, builds
/// frames on demand through a single-entry cache, and routes pointer events
/// through the gesture state machine against the last built frame.
pub struct ChartEngine<R: Renderer> {
    renderer: R,
    viewport: Viewport,
    config: ChartEngineConfig,
    config_generation: u64,
    resolver: Box<dyn MarketHoursResolver>,
    resolver_generation: u64,
    input: Option<ChartInput>,
    input_fingerprint: u64,
    interaction: InteractionState,
    cache: Option<FrameCacheEntry>,
    cache_stats: FrameCacheStats,
}

impl<R: Renderer> ChartEngine<R> {
    /// Creates an engine using the US-equity session calendar.
    pub fn new(renderer: R, viewport: Viewport, config: ChartEngineConfig) -> ChartResult<Self> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        config.validate()?;

        Ok(Self {
            renderer,
            viewport,
            interaction: InteractionState::new(config.interaction),
            config,
            config_generation: 0,
            resolver: Box::new(UsEquitySessionResolver::new()),
            resolver_generation: 0,
            input: None,
            input_fingerprint: 0,
            cache: None,
            cache_stats: FrameCacheStats::default(),
        })
    }

    /// Replaces the trading calendar used by the intraday regime.
    #[must_use]
    pub fn with_market_hours_resolver<M>(mut self, resolver: M) -> Self
    where
        M: MarketHoursResolver + 'static,
    {
        self.resolver = Box::new(resolver);
        self.resolver_generation += 1;
        self
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn config(&self) -> &ChartEngineConfig {
        &self.config
    }

    #[must_use]
    pub fn input(&self) -> Option<&ChartInput> {
        self.input.as_ref()
    }

    #[must_use]
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.interaction.selection()
    }

    #[must_use]
    pub fn cache_stats(&self) -> FrameCacheStats {
        self.cache_stats
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Replaces the input snapshot. Any selection refers to the old series
    /// and is cleared.
    pub fn set_input(&mut self, input: ChartInput) {
        self.input_fingerprint = input_fingerprint(&input);
        debug!(
            range = input.range.code(),
            samples = input.samples.len(),
            scheduled = input.scheduled_events.len(),
            historical = input.historical_events.len(),
            "chart input replaced"
        );
        self.input = Some(input);
        self.interaction.clear();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> ChartResult<()> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        if viewport != self.viewport {
            self.viewport = viewport;
            self.interaction.clear();
        }
        Ok(())
    }

    pub fn set_config(&mut self, config: ChartEngineConfig) -> ChartResult<()> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        self.interaction.set_behavior(config.interaction);
        self.interaction.clear();
        self.config = config;
        self.config_generation += 1;
        Ok(())
    }

    /// Current frame, rebuilt only when input, viewport, config or calendar
    /// changed since the last call.
    pub fn frame(&mut self) -> ChartResult<&ChartFrame> {
        Ok(&self.ensure_frame()?.frame)
    }

    /// Normalized series backing the current frame.
    pub fn normalized_samples(&mut self) -> ChartResult<&[Sample]> {
        Ok(&self.ensure_frame()?.samples)
    }

    pub fn render(&mut self) -> ChartResult<()> {
        self.ensure_frame()?;
        let entry = self.cache.as_ref().ok_or_else(missing_frame)?;
        self.renderer
            .render(&entry.frame, self.interaction.selection())
    }

    /// Feeds one pointer event through the gesture state machine and returns
    /// the resulting selection.
    pub fn pointer_event(&mut self, event: PointerEvent) -> ChartResult<Option<Selection>> {
        if self.input.is_none() {
            return Ok(self.interaction.handle(event, |_, _| None).cloned());
        }

        self.ensure_frame()?;
        let entry = self.cache.as_ref().ok_or_else(missing_frame)?;
        let scene = entry.hit_test_scene();
        let config = self.config.hit_test;
        let previous = self.interaction.selection().cloned();

        let selection = self
            .interaction
            .handle(event, |x, y| hit_test(&scene, config, x, y))
            .cloned();
        if selection != previous {
            debug!(
                kind = ?event.kind,
                sample_index = ?selection.as_ref().and_then(Selection::sample_index),
                event_id = ?selection.as_ref().and_then(Selection::event_id),
                "selection changed"
            );
        }
        Ok(selection)
    }

    /// Stateless hit test against the current frame.
    pub fn hit_test(&mut self, x: f64, y: f64) -> ChartResult<Option<Selection>> {
        let config = self.config.hit_test;
        let entry = self.ensure_frame()?;
        Ok(hit_test(&entry.hit_test_scene(), config, x, y))
    }

    fn cache_key(&self) -> u64 {
        FrameCacheKey {
            input_fingerprint: self.input_fingerprint,
            viewport: self.viewport,
            config_generation: self.config_generation,
            resolver_generation: self.resolver_generation,
        }
        .digest()
    }

    fn ensure_frame(&mut self) -> ChartResult<&FrameCacheEntry> {
        let key = self.cache_key();
        let input = self.input.as_ref().ok_or_else(|| {
            ChartError::InvalidData("chart input has not been set".to_owned())
        })?;

        if self.cache.as_ref().is_some_and(|entry| entry.key == key) {
            self.cache_stats.hits += 1;
            trace!(key, hits = self.cache_stats.hits, "frame cache hit");
        } else {
            self.cache_stats.misses += 1;
            let prepared = build_frame(input, self.viewport, &self.config, self.resolver.as_ref())?;
            debug!(
                key,
                misses = self.cache_stats.misses,
                candles = prepared.frame.candles.len(),
                labels = prepared.frame.labels.len(),
                "frame recomputed"
            );
            self.cache = Some(FrameCacheEntry {
                key,
                samples: prepared.samples,
                frame: prepared.frame,
            });
        }

        self.cache.as_ref().ok_or_else(missing_frame)
    }
}

fn missing_frame() -> ChartError {
    ChartError::InvalidData("no frame available".to_owned())
}
