//! Synthesizer: merges specialist replies into one answer

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::types::AgentName;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Returned when the summarization call yields nothing
pub const SYNTHESIS_NO_RESPONSE: &str = "No response received from final orchestrator";

const SYNTHESIS_PROMPT: &str = "You write the final answer to a user's travel question from \
the reports of specialist agents.\n\n\
- Attribute facts to the specialist that supplied them (for example \"according to the weather report\").\n\
- When more than one specialist reported, connect their information, such as recommending \
attractions that suit the forecast.\n\
- If a specialist reported an error or no data, say so briefly and work with what is available.\n\
- Answer in natural prose. Do not return JSON or another structured object.";

/// Build the user turn for the summarization call
pub fn synthesis_prompt(user_message: &str, responses: &BTreeMap<AgentName, String>) -> String {
    if responses.is_empty() {
        return format!(
            "Original user question: {user_message}\n\n\
No specialist agent gathered data for this question. Answer it directly as well as you can, \
and mention that no live weather or attraction data was consulted."
        );
    }

    let mut prompt = format!("Original user question: {user_message}\n\n");
    for (agent, text) in responses {
        prompt.push_str(&format!(
            "=== {} AGENT RESPONSE ===\n{}\n\n",
            agent.as_str().to_uppercase(),
            text.trim()
        ));
    }
    prompt.push_str("Please synthesize these responses into a comprehensive final answer.");
    prompt
}

/// Produces the final answer
pub struct Synthesizer {
    agent: Agent,
    timeout: Duration,
}

impl Synthesizer {
    /// Use an already configured tool-less agent
    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Build the summarization agent on `client`
    pub fn from_client(client: Arc<dyn LlmClient>, model: &str, timeout: Duration) -> Result<Self> {
        let agent = Agent::builder()
            .name("synthesizer")
            .system_prompt(SYNTHESIS_PROMPT)
            .model(model)
            .temperature(0.5)
            .max_loops(1)
            .client(client)
            .build()?;
        Ok(Self::new(agent, timeout))
    }

    /// Merge `responses` into an answer to `user_message`. Never fails: any
    /// problem yields [`SYNTHESIS_NO_RESPONSE`].
    pub async fn synthesize(&self, user_message: &str, responses: &BTreeMap<AgentName, String>) -> String {
        let started = Instant::now();
        let prompt = synthesis_prompt(user_message, responses);

        let outcome = match tokio::time::timeout(self.timeout, self.agent.run(&prompt)).await {
            Ok(Ok(run)) => run
                .reply
                .ok_or_else(|| Error::SynthesisUnavailable(format!("no reply ({})", run.stop_reason))),
            Ok(Err(e)) => Err(Error::SynthesisUnavailable(e.to_string())),
            Err(_) => Err(Error::SynthesisUnavailable(format!(
                "timed out after {}s",
                self.timeout.as_secs_f32()
            ))),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(answer) => {
                tracing::info!(sources = responses.len(), elapsed_ms, "synthesis complete");
                answer
            }
            Err(e) => {
                tracing::warn!(error = %e, elapsed_ms, "synthesis failed");
                SYNTHESIS_NO_RESPONSE.to_string()
            }
        }
    }
}
