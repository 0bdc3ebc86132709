//! Host-facing facade: configuration, input snapshot, frame pipeline and
//! pointer dispatch.

mod chart_input;
mod engine;
mod engine_config;
mod frame_builder;
mod frame_cache;
mod json_contract;

pub use chart_input::ChartInput;
pub use engine::ChartEngine;
pub use engine_config::ChartEngineConfig;
pub use frame_cache::FrameCacheStats;
pub use json_contract::{
    CHART_CONFIG_JSON_SCHEMA_V1, CHART_FRAME_JSON_SCHEMA_V1, ChartEngineConfigJsonContractV1,
    ChartFrameJsonContractV1,
};
