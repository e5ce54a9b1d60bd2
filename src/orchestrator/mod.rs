//! Orchestration core: planner, dispatcher, synthesizer and the composition root
//!
//! A request flows through three phases:
//!
//! - **Plan**: one classification call picks the specialists and extracts the location
//! - **Dispatch**: the picked specialists run, concurrently by default
//! - **Synthesize**: one summarization call merges their replies
//!
//! # Example
//!
//! ```rust,ignore
//! use concierge::orchestrator::{Orchestrator, OrchestratorConfig, SpecialistRegistry};
//!
//! let config = OrchestratorConfig::from_env()?;
//! let client = Arc::new(OpenRouterClient::from_env()?);
//! let registry = SpecialistRegistry::from_env(client.clone(), &config.specialist_settings())?;
//! let orchestrator = Orchestrator::from_config(client, &config, registry)?;
//! let result = orchestrator.handle_request("What's the weather like in Paris?").await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod registry;
pub mod result;
pub mod synthesizer;

pub use config::OrchestratorConfig;
pub use dispatcher::{specialist_task, DispatchMode, DispatchReport, Dispatcher};
pub use pipeline::Orchestrator;
pub use plan::{normalize_location, Plan, FALLBACK_REASONING, UNSPECIFIED_LOCATION};
pub use planner::Planner;
pub use registry::SpecialistRegistry;
pub use result::{RequestMetadata, RequestResult, REQUEST_CANCELLED};
pub use synthesizer::{Synthesizer, SYNTHESIS_NO_RESPONSE};
