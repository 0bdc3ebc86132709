use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChartError, ChartResult};
use crate::render::ChartFrame;

use super::ChartEngineConfig;

pub const CHART_CONFIG_JSON_SCHEMA_V1: u32 = 1;
pub const CHART_FRAME_JSON_SCHEMA_V1: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEngineConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: ChartEngineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFrameJsonContractV1 {
    pub schema_version: u32,
    pub frame: ChartFrame,
}

impl ChartEngineConfig {
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::Serialization(format!("failed to serialize config: {e}")))
    }

    pub fn to_json_contract_v1_pretty(&self) -> ChartResult<String> {
        let payload = ChartEngineConfigJsonContractV1 {
            schema_version: CHART_CONFIG_JSON_SCHEMA_V1,
            config: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::Serialization(format!("failed to serialize config contract v1: {e}"))
        })
    }

    /// Parses either a bare config object or a versioned contract payload,
    /// then validates the result.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let value: Value = serde_json::from_str(input).map_err(|e| {
            ChartError::Serialization(format!("failed to parse config json payload: {e}"))
        })?;

        // Every config field is optional, so the envelope is detected by key
        // instead of by a failed bare parse.
        let config = if value.get("schema_version").is_some() {
            let payload: ChartEngineConfigJsonContractV1 = serde_json::from_value(value)
                .map_err(|e| {
                    ChartError::Serialization(format!("failed to parse config contract: {e}"))
                })?;
            if payload.schema_version != CHART_CONFIG_JSON_SCHEMA_V1 {
                return Err(ChartError::Serialization(format!(
                    "unsupported config schema version: {}",
                    payload.schema_version
                )));
            }
            payload.config
        } else {
            serde_json::from_value(value)
                .map_err(|e| ChartError::Serialization(format!("failed to parse config: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }
}

impl ChartFrame {
    pub fn to_json_contract_v1_pretty(&self) -> ChartResult<String> {
        let payload = ChartFrameJsonContractV1 {
            schema_version: CHART_FRAME_JSON_SCHEMA_V1,
            frame: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::Serialization(format!("failed to serialize frame contract v1: {e}"))
        })
    }

    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(frame) = serde_json::from_str::<ChartFrame>(input) {
            return Ok(frame);
        }
        let payload: ChartFrameJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ChartError::Serialization(format!("failed to parse frame json payload: {e}"))
        })?;
        if payload.schema_version != CHART_FRAME_JSON_SCHEMA_V1 {
            return Err(ChartError::Serialization(format!(
                "unsupported frame schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.frame)
    }
}
