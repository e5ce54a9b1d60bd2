//! The execution plan and its construction from classification output

use crate::error::{Error, Result};
use crate::types::AgentName;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Location used when none could be resolved
pub const UNSPECIFIED_LOCATION: &str = "unspecified";

/// Reasoning recorded on a fallback plan
pub const FALLBACK_REASONING: &str = "Fallback to using all agents";

const MAX_LOCATION_CHARS: usize = 100;

const LOCATION_PLACEHOLDERS: &[&str] = &[
    "unspecified",
    "not specified",
    "location not specified",
    "unknown",
    "none",
    "null",
    "n/a",
    "na",
    "any",
    "anywhere",
    "location",
];

/// Which specialists to run, with what instructions, for which place.
///
/// Immutable once built. Every key of [`Plan::sub_tasks`] is one of
/// [`Plan::agents_needed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    agents_needed: Vec<AgentName>,
    sub_tasks: BTreeMap<AgentName, String>,
    location: String,
    reasoning: String,
    fallback: bool,
}

impl Plan {
    /// Build a plan. Duplicate agents keep their first position and sub-tasks
    /// for unselected agents are dropped.
    pub fn new(
        agents: impl IntoIterator<Item = AgentName>,
        mut sub_tasks: BTreeMap<AgentName, String>,
        location: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        let mut agents_needed = Vec::new();
        for agent in agents {
            if !agents_needed.contains(&agent) {
                agents_needed.push(agent);
            }
        }
        sub_tasks.retain(|agent, _| agents_needed.contains(agent));

        Self {
            agents_needed,
            sub_tasks,
            location: location.into(),
            reasoning: reasoning.into(),
            fallback: false,
        }
    }

    /// Every known agent, each tasked with the raw user message
    pub fn fallback(user_message: &str) -> Self {
        let sub_tasks = AgentName::ALL
            .iter()
            .map(|agent| (*agent, user_message.to_string()))
            .collect();
        let mut plan = Self::new(AgentName::ALL, sub_tasks, UNSPECIFIED_LOCATION, FALLBACK_REASONING);
        plan.fallback = true;
        plan
    }

    /// Parse the classification model's reply.
    ///
    /// Accepts a JSON object, optionally wrapped in a Markdown code fence or
    /// surrounded by prose. Unknown agent names are dropped; a selected agent
    /// without its own sub-task is given the user message.
    pub fn from_model_output(text: &str, user_message: &str) -> Result<Self> {
        let fields = first_json_object(text)?;

        let names: Vec<&str> = match fields.get("agents_needed") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(single)) => vec![single.as_str()],
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(Error::malformed_plan(format!(
                    "agents_needed must be an array, got {}",
                    other
                )))
            }
            None => return Err(Error::malformed_plan("missing agents_needed")),
        };

        let agents: Vec<AgentName> = names
            .into_iter()
            .filter_map(|name| match name.parse::<AgentName>() {
                Ok(agent) => Some(agent),
                Err(unknown) => {
                    tracing::debug!(%unknown, "dropping agent from plan");
                    None
                }
            })
            .collect();

        let sub_tasks = agents
            .iter()
            .map(|agent| {
                let task = fields
                    .get(agent.task_key())
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|task| !task.is_empty())
                    .unwrap_or(user_message);
                (*agent, task.to_string())
            })
            .collect();

        let location = fields
            .get("location")
            .and_then(Value::as_str)
            .map(normalize_location)
            .unwrap_or_default();
        let reasoning = fields
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Self::new(agents, sub_tasks, location, reasoning))
    }

    /// Selected agents, deduplicated, in the order the planner named them
    pub fn agents_needed(&self) -> &[AgentName] {
        &self.agents_needed
    }

    /// Per-agent instructions
    pub fn sub_tasks(&self) -> &BTreeMap<AgentName, String> {
        &self.sub_tasks
    }

    /// Sub-task for one agent
    pub fn sub_task(&self, agent: AgentName) -> Option<&str> {
        self.sub_tasks.get(&agent).map(String::as_str)
    }

    /// Resolved location; empty when unresolved
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Location to hand to specialists
    pub fn dispatch_location(&self) -> &str {
        if self.location.is_empty() {
            UNSPECIFIED_LOCATION
        } else {
            &self.location
        }
    }

    /// Planner's explanation
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Whether this is the default all-agents plan
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// First JSON object embedded in `text`. Code fences and prose on either
/// side are skipped.
fn first_json_object(text: &str) -> Result<Map<String, Value>> {
    let mut first_error = None;
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(fields))) => return Ok(fields),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            _ => {}
        }
    }
    Err(match first_error {
        Some(e) => Error::malformed_plan(format!("invalid JSON: {}", e)),
        None => Error::malformed_plan("reply contains no JSON object"),
    })
}

/// Clean up a model-extracted location. Returns an empty string when the
/// value cannot be a place name.
pub fn normalize_location(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '"' | '\'' | '`' | '_'))
        .trim();

    let rejected = cleaned.is_empty()
        || cleaned.chars().count() > MAX_LOCATION_CHARS
        || cleaned.contains(['\n', '\r'])
        || !cleaned.chars().any(char::is_alphabetic)
        || LOCATION_PLACEHOLDERS.contains(&cleaned.to_lowercase().as_str());

    if rejected {
        if !raw.trim().is_empty() {
            tracing::debug!(raw, "discarding implausible location");
        }
        String::new()
    } else {
        cleaned.to_string()
    }
}
