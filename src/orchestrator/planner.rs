//! Task planner: one classification exchange turning a request into a [`Plan`]

use super::plan::Plan;
use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::types::AgentName;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// System prompt listing every known agent and the reply schema
pub fn planner_prompt() -> String {
    let agents: String = AgentName::ALL
        .iter()
        .map(|agent| format!("- \"{}\": {}\n", agent.as_str(), agent.capability()))
        .collect();
    let task_fields: String = AgentName::ALL
        .iter()
        .map(|agent| {
            format!(
                "  \"{}\": \"what the {} agent should do (only if selected)\",\n",
                agent.task_key(),
                agent.as_str()
            )
        })
        .collect();

    format!(
        "You are the coordinator of a team of specialist agents. Decide which \
specialists a user request needs and extract the location it is about.\n\n\
Available agents:\n{agents}\n\
Reply with a single JSON object and nothing else:\n\
{{\n  \"agents_needed\": [\"weather\", \"attractions\"],\n{task_fields}  \
\"reasoning\": \"why these agents\",\n  \"location\": \"the place the request is about\"\n}}\n\n\
Rules:\n\
- Select only agents whose capability the request actually needs; an empty list is allowed.\n\
- \"location\" is the city or region named in the request, e.g. \"Austin\" for \
\"what are good things to do in Austin\". Use an empty string if no place is named.\n\
- Do not wrap the JSON in Markdown."
    )
}

/// Classifies requests into plans
pub struct Planner {
    agent: Agent,
    timeout: Duration,
}

impl Planner {
    /// Use an already configured tool-less agent
    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Build the classification agent on `client`
    pub fn from_client(client: Arc<dyn LlmClient>, model: &str, timeout: Duration) -> Result<Self> {
        let agent = Agent::builder()
            .name("planner")
            .system_prompt(planner_prompt())
            .model(model)
            .temperature(0.0)
            .max_loops(1)
            .client(client)
            .build()?;
        Ok(Self::new(agent, timeout))
    }

    /// Produce a plan for `user_message`.
    ///
    /// Fails only when the classification engine is unreachable or times out.
    /// A reply that is not a usable plan yields [`Plan::fallback`].
    pub async fn plan(&self, user_message: &str) -> Result<Plan> {
        let started = Instant::now();
        let run = match tokio::time::timeout(self.timeout, self.agent.run(user_message)).await {
            Ok(Ok(run)) => run,
            Ok(Err(e)) => return Err(Error::planner_unavailable(e.to_string())),
            Err(_) => {
                return Err(Error::planner_unavailable(format!(
                    "classification timed out after {}s",
                    self.timeout.as_secs_f32()
                )))
            }
        };

        let plan = match run.reply {
            None => {
                tracing::warn!(stop_reason = %run.stop_reason, "planner produced no reply; using fallback plan");
                Plan::fallback(user_message)
            }
            Some(text) => match Plan::from_model_output(&text, user_message) {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::warn!(error = %e, "unusable plan; using fallback plan");
                    tracing::debug!(raw = %text, "planner reply");
                    Plan::fallback(user_message)
                }
            },
        };

        tracing::info!(
            agents = ?plan.agents_needed(),
            location = plan.location(),
            fallback = plan.is_fallback(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plan produced"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{no_choices, reply, ScriptedClient};

    fn planner(client: ScriptedClient) -> (Arc<ScriptedClient>, Planner) {
        let client = Arc::new(client);
        let planner = Planner::from_client(client.clone(), "m", Duration::from_secs(5)).unwrap();
        (client, planner)
    }

    #[test]
    fn test_prompt_lists_every_agent() {
        let prompt = planner_prompt();
        for agent in AgentName::ALL {
            assert!(prompt.contains(agent.task_key()));
            assert!(prompt.contains(agent.capability()));
        }
    }

    #[tokio::test]
    async fn test_well_formed_reply() {
        let (client, planner) = planner(ScriptedClient::new(vec![Ok(reply(
            r#"{"agents_needed": ["weather-agent"], "weather_task": "Current conditions",
                "reasoning": "weather only", "location": "Paris"}"#,
        ))]));

        let plan = planner.plan("What's the weather like in Paris?").await.unwrap();
        assert_eq!(plan.agents_needed(), &[AgentName::Weather]);
        assert_eq!(plan.location(), "Paris");

        let request = &client.requests()[0];
        assert!(request.tools.is_none());
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(client.user_prompt(0), "What's the weather like in Paris?");
    }

    #[tokio::test]
    async fn test_garbage_and_silence_fall_back() {
        let (_, garbage) = planner(ScriptedClient::new(vec![Ok(reply("Sure! Weather and attractions."))]));
        let plan = garbage.plan("Anything fun?").await.unwrap();
        assert!(plan.is_fallback());
        assert_eq!(plan.location(), "unspecified");

        let (_, silent) = planner(ScriptedClient::new(vec![Ok(no_choices())]));
        assert!(silent.plan("Anything fun?").await.unwrap().is_fallback());
    }

    #[tokio::test]
    async fn test_engine_failure_is_planner_unavailable() {
        let (_, down) = planner(ScriptedClient::new(vec![Err(Error::openrouter("503"))]));
        let err = down.plan("hi").await.unwrap_err();
        assert!(matches!(err, Error::PlannerUnavailable(_)));

        let slow = Arc::new(
            ScriptedClient::new(vec![Ok(reply("{}"))]).with_delay(Duration::from_millis(200)),
        );
        let planner = Planner::from_client(slow, "m", Duration::from_millis(20)).unwrap();
        let err = planner.plan("hi").await.unwrap_err();
        assert!(matches!(err, Error::PlannerUnavailable(ref msg) if msg.contains("timed out")));
    }
}
