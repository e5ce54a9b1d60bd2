//! Core type definitions for the concierge pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an agent instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Create a new random agent ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one conversation context (one exchange with an agent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Create a new random conversation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of specialist agents the planner may select.
///
/// Adding a specialist means adding a variant here and registering a
/// [`Specialist`](crate::specialist::Specialist) for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    /// Current conditions and forecasts
    Weather,
    /// Things to see and do
    Attractions,
}

impl AgentName {
    /// Every known agent, in canonical order
    pub const ALL: [AgentName; 2] = [AgentName::Weather, AgentName::Attractions];

    /// Wire name used in plans and result maps
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Attractions => "attractions",
        }
    }

    /// Human-facing name used in error strings
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Weather => "Weather",
            Self::Attractions => "Attractions",
        }
    }

    /// Key of this agent's sub-task in the planner's JSON reply
    pub fn task_key(&self) -> &'static str {
        match self {
            Self::Weather => "weather_task",
            Self::Attractions => "attractions_task",
        }
    }

    /// One-line capability summary shown to the planner
    pub fn capability(&self) -> &'static str {
        match self {
            Self::Weather => "current weather conditions and short-term forecasts for a location",
            Self::Attractions => "attractions, sights and things to do in a location",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAgent(pub String);

impl fmt::Display for UnknownAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown agent '{}'", self.0)
    }
}

impl std::error::Error for UnknownAgent {}

impl FromStr for AgentName {
    type Err = UnknownAgent;

    /// Accepts `weather`, `weather-agent` and `weather_agent`, case-insensitively
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let base = normalized
            .strip_suffix("-agent")
            .or_else(|| normalized.strip_suffix("_agent"))
            .unwrap_or(&normalized);

        AgentName::ALL
            .into_iter()
            .find(|name| name.as_str() == base)
            .ok_or_else(|| UnknownAgent(s.to_string()))
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a new token usage record
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add another token usage to this one
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_name_parsing_accepts_suffixes() {
        assert_eq!("weather".parse::<AgentName>(), Ok(AgentName::Weather));
        assert_eq!("Weather-Agent".parse::<AgentName>(), Ok(AgentName::Weather));
        assert_eq!(" attractions_agent ".parse::<AgentName>(), Ok(AgentName::Attractions));
        assert!("restaurants".parse::<AgentName>().is_err());
        assert!("agent".parse::<AgentName>().is_err());
    }

    #[test]
    fn test_agent_name_serializes_snake_case() {
        let json = serde_json::to_string(&AgentName::Attractions).unwrap();
        assert_eq!(json, "\"attractions\"");
        assert_eq!(AgentName::Weather.task_key(), "weather_task");
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage::new(10, 5));
        total.add(TokenUsage::new(3, 2));
        assert_eq!(total, TokenUsage::new(13, 7));
    }
}
