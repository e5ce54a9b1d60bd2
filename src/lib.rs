//! # Concierge
//!
//! Routes a free-form travel question to specialist agents and merges their
//! answers.
//!
//! - **Planner**: classifies the request into a [`Plan`](orchestrator::Plan)
//!   naming the specialists it needs and the location it is about
//! - **Dispatcher**: runs those specialists, concurrently by default, each
//!   behind a timeout, with failures isolated per agent
//! - **Synthesizer**: merges the replies into one attributed answer
//!
//! Specialists are function-calling agents over any OpenAI-compatible API
//! (OpenRouter by default) with weather (OpenWeatherMap) and attraction
//! (TripAdvisor) tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use concierge::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OrchestratorConfig::from_env()?;
//!     let client: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::from_env()?);
//!     let registry = SpecialistRegistry::from_env(client.clone(), &config.specialist_settings())?;
//!     let orchestrator = Orchestrator::from_config(client, &config, registry)?;
//!
//!     let result = orchestrator
//!         .handle_request("What are good things to do in Austin given the weather?")
//!         .await?;
//!     println!("{}", result.final_answer);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod agent;
pub mod config;
pub mod error;
pub mod llm_client;
pub mod openrouter;
pub mod orchestrator;
pub mod react;
pub mod specialist;
pub mod telemetry;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use agent::{Agent, AgentBuilder, AgentRun};
pub use config::{AttractionsApiConfig, ModelConfig, OpenRouterConfig, WeatherApiConfig};
pub use error::{Error, Result};
pub use llm_client::LlmClient;
pub use openrouter::{CompletionRequest, CompletionResponse, Message, OpenRouterClient};
pub use orchestrator::{
    DispatchMode, Orchestrator, OrchestratorConfig, Plan, RequestResult, SpecialistRegistry,
};
pub use react::{ReActTrace, StopReason};
pub use specialist::{Specialist, SpecialistAgent, SpecialistSettings};
pub use telemetry::{init_tracing, LogFormat};
pub use tools::{Tool, ToolContext, ToolOutput};
pub use types::{AgentId, AgentName, ConversationId, TokenUsage};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::llm_client::LlmClient;
    pub use crate::openrouter::OpenRouterClient;
    pub use crate::orchestrator::{Orchestrator, OrchestratorConfig, RequestResult, SpecialistRegistry};
    pub use crate::specialist::{Specialist, SpecialistAgent};
    pub use crate::types::AgentName;
}
