//! Orchestration tunables, read from `CONCIERGE_*` environment variables

use super::dispatcher::DispatchMode;
use crate::config::presets;
use crate::error::{Error, Result};
use crate::specialist::SpecialistSettings;
use crate::telemetry::LogFormat;
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator configuration. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Model for the classification call
    pub planner_model: String,
    /// Model for specialist tool loops
    pub specialist_model: String,
    /// Model for the summarization call
    pub synthesis_model: String,
    /// Concurrent or sequential dispatch
    pub dispatch_mode: DispatchMode,
    pub planner_timeout_secs: u64,
    pub specialist_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
    /// Model round-trips allowed per specialist task
    pub max_tool_loops: u32,
    /// Log line format
    pub log_format: LogFormat,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            planner_model: presets::FAST.to_string(),
            specialist_model: presets::FAST.to_string(),
            synthesis_model: presets::FAST.to_string(),
            dispatch_mode: DispatchMode::Concurrent,
            planner_timeout_secs: 60,
            specialist_timeout_secs: 120,
            synthesis_timeout_secs: 90,
            max_tool_loops: 8,
            log_format: LogFormat::Text,
        }
    }
}

impl OrchestratorConfig {
    /// Load from the environment (`CONCIERGE_PLANNER_MODEL`,
    /// `CONCIERGE_DISPATCH_MODE`, ...), honouring a `.env` file
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_builder(
            Config::builder().add_source(Environment::with_prefix("CONCIERGE").try_parsing(true)),
        )
    }

    /// Load from an arbitrary source stack
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let timeouts = [
            ("planner_timeout_secs", self.planner_timeout_secs),
            ("specialist_timeout_secs", self.specialist_timeout_secs),
            ("synthesis_timeout_secs", self.synthesis_timeout_secs),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(Error::config(format!("{} must be greater than zero", key)));
        }
        if self.max_tool_loops == 0 {
            return Err(Error::config("max_tool_loops must be at least 1"));
        }
        Ok(())
    }

    pub fn planner_timeout(&self) -> Duration {
        Duration::from_secs(self.planner_timeout_secs)
    }

    /// Bound on one specialist call as enforced by the dispatcher
    pub fn specialist_timeout(&self) -> Duration {
        Duration::from_secs(self.specialist_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    /// Settings for the built-in specialists. Their own run budget is a
    /// little shorter than the dispatcher's so a slow run ends in the
    /// no-response sentinel rather than a timeout error.
    pub fn specialist_settings(&self) -> SpecialistSettings {
        let dispatch = self.specialist_timeout();
        SpecialistSettings {
            model: self.specialist_model.clone(),
            max_loops: self.max_tool_loops,
            run_timeout: dispatch.mul_f32(0.9),
        }
    }
}
