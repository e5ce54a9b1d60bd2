//! Request result types

use super::dispatcher::DispatchMode;
use super::plan::Plan;
use crate::types::AgentName;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Final answer when the caller cancelled before synthesis
pub const REQUEST_CANCELLED: &str = "Request cancelled before an answer was produced";

/// Everything one request produced
#[derive(Debug, Clone, Serialize)]
pub struct RequestResult {
    /// Synthesized answer, or a sentinel
    pub final_answer: String,
    /// Specialists attempted, in plan order
    pub agents_used: Vec<AgentName>,
    /// Raw reply (or attributed error string) per specialist
    pub per_agent_responses: BTreeMap<AgentName, String>,
    /// The plan that drove the request
    pub plan: Plan,
    /// Timings and flags
    pub metadata: RequestMetadata,
}

/// Execution metadata
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    /// Correlates log lines of one request
    pub request_id: Uuid,
    /// How specialists were scheduled
    pub dispatch_mode: DispatchMode,
    pub planning_ms: u64,
    pub dispatch_ms: u64,
    pub synthesis_ms: u64,
    pub total_ms: u64,
    /// Whether the request was cancelled after planning
    pub cancelled: bool,
}

impl RequestMetadata {
    pub(crate) fn new(request_id: Uuid, dispatch_mode: DispatchMode) -> Self {
        Self {
            request_id,
            dispatch_mode,
            planning_ms: 0,
            dispatch_ms: 0,
            synthesis_ms: 0,
            total_ms: 0,
            cancelled: false,
        }
    }
}

impl RequestResult {
    /// Reply recorded for one specialist
    pub fn response(&self, agent: AgentName) -> Option<&str> {
        self.per_agent_responses.get(&agent).map(String::as_str)
    }
}
