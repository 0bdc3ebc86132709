//! catalyst-chart: coordinate and interaction engine for price charts.
//!
//! The crate turns a sample series plus scheduled and historical catalyst
//! events into pixel geometry for a split chart: history on the left, a
//! forward-looking event timeline on the right. Drawing is left to a
//! [`render::Renderer`] backend; pointer input arrives as
//! [`interaction::PointerEvent`] values.

pub mod api;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod render;
pub mod telemetry;

pub use api::{ChartEngine, ChartEngineConfig, ChartInput};
pub use error::{ChartError, ChartResult};
