mod frame;
mod null_renderer;

pub use frame::ChartFrame;
pub use null_renderer::NullRenderer;

use crate::error::ChartResult;
use crate::interaction::Selection;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized, deterministic `ChartFrame` plus the
/// current crosshair selection, so drawing code stays isolated from chart
/// math and pointer handling.
pub trait Renderer {
    fn render(&mut self, frame: &ChartFrame, selection: Option<&Selection>) -> ChartResult<()>;
}
