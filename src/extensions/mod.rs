//! Timeline overlays built on top of the core mapping: event dots and axis
//! labels.

pub mod events;
pub mod labels;

pub use events::{
    EventDot, EventFilter, EventKind, EventProjector, HistoricalEvent, ScheduledEvent,
};
pub use labels::{AxisLabel, LabelContext, LabelPlacementConfig, LabelSection};
