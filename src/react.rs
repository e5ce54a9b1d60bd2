//! Trace of a tool-calling (ReAct) loop: what the model asked for and what it saw

use crate::types::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the tool-calling loop stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a final text reply
    Completed,
    /// The model kept calling tools until the loop budget ran out
    MaxIterations,
    /// The model replied with neither text nor tool calls
    EmptyReply,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::MaxIterations => write!(f, "max iterations reached"),
            StopReason::EmptyReply => write!(f, "empty reply"),
        }
    }
}

/// A trace of one loop execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReActTrace {
    /// Number of model round-trips
    pub iterations: usize,
    /// All actions taken during execution
    pub actions: Vec<Action>,
    /// All observations received during execution
    pub observations: Vec<Observation>,
    /// When the trace started
    pub started_at: DateTime<Utc>,
    /// When the trace completed
    pub completed_at: Option<DateTime<Utc>>,
    /// Total token usage across all steps
    pub total_tokens: TokenUsage,
}

impl ReActTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self {
            iterations: 0,
            actions: Vec::new(),
            observations: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            total_tokens: TokenUsage::default(),
        }
    }

    /// Record one model round-trip
    pub fn add_iteration(&mut self, tokens: TokenUsage) {
        self.iterations += 1;
        self.total_tokens.add(tokens);
    }

    /// Add an action to the trace
    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Add an observation to the trace
    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Mark the trace as completed
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Number of tool calls made
    pub fn tool_call_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, Action::ToolCall { .. }))
            .count()
    }
}

impl Default for ReActTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// An action in the loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Call a tool
    ToolCall {
        /// Tool identifier
        tool_id: String,
        /// Provider-assigned call id
        call_id: String,
        /// Tool parameters
        params: serde_json::Value,
        /// When this action occurred
        timestamp: DateTime<Utc>,
    },
    /// Provide final answer
    FinalAnswer {
        /// The answer content
        answer: String,
        /// When this action occurred
        timestamp: DateTime<Utc>,
    },
}

impl Action {
    /// Create a tool call action
    pub fn tool_call(
        tool_id: impl Into<String>,
        call_id: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self::ToolCall {
            tool_id: tool_id.into(),
            call_id: call_id.into(),
            params,
            timestamp: Utc::now(),
        }
    }

    /// Create a final answer action
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self::FinalAnswer {
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The result of a tool call as fed back to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// The observation content
    pub content: String,
    /// When this observation occurred
    pub timestamp: DateTime<Utc>,
    /// Whether this observation indicates an error
    pub is_error: bool,
}

impl Observation {
    /// Create a new observation
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    /// Create an error observation
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
            is_error: true,
        }
    }
}
