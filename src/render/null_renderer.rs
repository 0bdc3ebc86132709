use crate::error::ChartResult;
use crate::interaction::Selection;
use crate::render::{ChartFrame, Renderer};

/// No-op renderer used by tests and headless engine usage.
///
/// It still validates frame content so tests catch invalid geometry without
/// a drawing backend.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames_rendered: u64,
    pub last_candle_count: usize,
    pub last_visible_label_count: usize,
    pub last_event_dot_count: usize,
    pub last_selection: Option<Selection>,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &ChartFrame, selection: Option<&Selection>) -> ChartResult<()> {
        frame.validate()?;
        self.frames_rendered += 1;
        self.last_candle_count = frame.candles.len();
        self.last_visible_label_count = frame.visible_labels().count();
        self.last_event_dot_count = frame.scheduled_dots.len() + frame.historical_dots.len();
        self.last_selection = selection.cloned();
        Ok(())
    }
}
