//! Error types for the concierge pipeline

use crate::types::AgentName;
use thiserror::Error;

/// Result type alias for concierge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the concierge pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// The classification engine could not be reached; fatal for a request
    #[error("Planner unavailable: {0}")]
    PlannerUnavailable(String),

    /// The classification engine replied with something that is not a plan
    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    /// A specialist invocation failed. The display form is what lands in the
    /// specialist's slot of the response map.
    #[error("{} agent error: {message}", agent.display_name())]
    SpecialistInvocation { agent: AgentName, message: String },

    /// The summarization call failed
    #[error("Synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    /// Error from the OpenRouter API
    #[error("OpenRouter API error: {message}")]
    OpenRouter {
        /// HTTP status, when the API answered at all
        status: Option<u16>,
        message: String,
    },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tool execution error
    #[error("Tool execution error: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request was cancelled by the caller
    #[error("Request cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON Schema validation error
    #[error("JSON Schema validation error: {0}")]
    JsonSchema(String),
}

impl Error {
    /// Create a planner-unavailable error
    pub fn planner_unavailable(msg: impl Into<String>) -> Self {
        Self::PlannerUnavailable(msg.into())
    }

    /// Create a malformed-plan error
    pub fn malformed_plan(msg: impl Into<String>) -> Self {
        Self::MalformedPlan(msg.into())
    }

    /// Create a specialist invocation error
    pub fn specialist(agent: AgentName, message: impl Into<String>) -> Self {
        Self::SpecialistInvocation {
            agent,
            message: message.into(),
        }
    }

    /// Create an OpenRouter error
    pub fn openrouter(msg: impl Into<String>) -> Self {
        Self::OpenRouter {
            status: None,
            message: msg.into(),
        }
    }

    /// Create an OpenRouter error for a non-success HTTP response
    pub fn openrouter_status(status: u16, msg: impl Into<String>) -> Self {
        Self::OpenRouter {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a tool execution error
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status behind this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::OpenRouter { status, .. } => *status,
            Self::Http(e) => e.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Whether this error means the caller gets no `RequestResult` at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PlannerUnavailable(_) | Self::Cancelled)
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
