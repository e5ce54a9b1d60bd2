//! Specialist agents: one narrow capability behind a task-in, text-out contract

use crate::agent::Agent;
use crate::config::presets;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::tools::{weather_tools, CurrentAttractionsTool, OpenWeatherClient, TripAdvisorClient};
use crate::types::{AgentId, AgentName};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WEATHER_PROMPT: &str = "You specialize in providing weather information and forecasts. \
Your role is to:\n\
1. Use the get_current_weather tool to gather current weather data for the specified location\n\
2. Use the get_weather_forecast tool to get weather forecasts for the specified location\n\
3. Analyze weather patterns and trends\n\
4. Provide recommendations for weather-related inquiries\n\
5. Compare and contrast different weather scenarios\n\
6. Draw meaningful conclusions from weather data\n\n\
IMPORTANT: The location will be provided to you. Use this exact location when calling weather tools. \
Do not try to extract or parse a location from the rest of the message.";

const ATTRACTIONS_PROMPT: &str = "You specialize in researching attractions based on location. \
Your role is to:\n\
1. Use the get_current_attractions tool to gather attraction information for the specified location\n\
2. Identify credible sources and key data points\n\
3. Summarize findings in a clear, organized manner\n\
4. Highlight important facts, ratings and review counts\n\
5. Provide context and background information when relevant\n\n\
IMPORTANT: The location will be provided to you. Use this exact location when calling attraction tools. \
Do not try to extract or parse a location from the rest of the message.";

/// A capability the dispatcher can invoke.
///
/// Implementations should turn every failure into text themselves; the
/// `Result` lets the dispatcher attribute the ones that slip through.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// Which agent this is
    fn name(&self) -> AgentName;

    /// Process one task and return the reply text
    async fn process_task(&self, task: &str) -> Result<String>;
}

/// Text returned when a specialist run ends without a terminal reply
pub fn no_response_sentinel(name: AgentName) -> String {
    format!("No response received from {} agent", name.as_str())
}

/// Knobs shared by the built-in specialists
#[derive(Debug, Clone)]
pub struct SpecialistSettings {
    /// Model identifier
    pub model: String,
    /// Maximum model round-trips per task
    pub max_loops: u32,
    /// Budget for one task; exceeding it yields the no-response sentinel
    pub run_timeout: Duration,
}

impl Default for SpecialistSettings {
    fn default() -> Self {
        Self {
            model: presets::FAST.to_string(),
            max_loops: 8,
            run_timeout: Duration::from_secs(120),
        }
    }
}

/// Model-driven specialist backed by an [`Agent`]
pub struct SpecialistAgent {
    name: AgentName,
    agent: Agent,
    run_timeout: Duration,
}

impl SpecialistAgent {
    /// Wrap an already configured agent
    pub fn new(name: AgentName, agent: Agent, run_timeout: Duration) -> Self {
        Self {
            name,
            agent,
            run_timeout,
        }
    }

    /// Weather specialist with current-conditions and forecast tools
    pub fn weather(
        client: Arc<dyn LlmClient>,
        weather: Arc<OpenWeatherClient>,
        settings: &SpecialistSettings,
    ) -> Result<Self> {
        let agent = Agent::builder()
            .name("weather-agent")
            .system_prompt(WEATHER_PROMPT)
            .model(&settings.model)
            .temperature(0.3)
            .max_loops(settings.max_loops)
            .tools(weather_tools(weather))
            .client(client)
            .build()?;
        Ok(Self::new(AgentName::Weather, agent, settings.run_timeout))
    }

    /// Attractions specialist with the attraction search tool
    pub fn attractions(
        client: Arc<dyn LlmClient>,
        attractions: Arc<TripAdvisorClient>,
        settings: &SpecialistSettings,
    ) -> Result<Self> {
        let agent = Agent::builder()
            .name("attractions-agent")
            .system_prompt(ATTRACTIONS_PROMPT)
            .model(&settings.model)
            .temperature(0.3)
            .max_loops(settings.max_loops)
            .tool(Arc::new(CurrentAttractionsTool::new(attractions)))
            .client(client)
            .build()?;
        Ok(Self::new(AgentName::Attractions, agent, settings.run_timeout))
    }

    /// Identity of the underlying agent, stable for the process lifetime
    pub fn agent_id(&self) -> AgentId {
        self.agent.id
    }
}

#[async_trait]
impl Specialist for SpecialistAgent {
    fn name(&self) -> AgentName {
        self.name
    }

    async fn process_task(&self, task: &str) -> Result<String> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.run_timeout, self.agent.run(task)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let text = match outcome {
            Ok(Ok(run)) => match run.reply {
                Some(reply) => reply,
                None => {
                    tracing::warn!(
                        agent = %self.name,
                        stop_reason = %run.stop_reason,
                        elapsed_ms,
                        "specialist produced no reply"
                    );
                    no_response_sentinel(self.name)
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(agent = %self.name, error = %e, elapsed_ms, "specialist engine failure");
                Error::specialist(self.name, e.to_string()).to_string()
            }
            Err(_) => {
                tracing::warn!(agent = %self.name, elapsed_ms, "specialist run timed out");
                no_response_sentinel(self.name)
            }
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherApiConfig;
    use crate::testing::{reply, ScriptedClient};
    use url::Url;

    fn weather_specialist(client: Arc<ScriptedClient>, run_timeout: Duration) -> SpecialistAgent {
        let weather = OpenWeatherClient::new(WeatherApiConfig::new(
            None,
            Url::parse("http://127.0.0.1:9").unwrap(),
        ))
        .unwrap();
        let settings = SpecialistSettings {
            run_timeout,
            ..SpecialistSettings::default()
        };
        SpecialistAgent::weather(client, Arc::new(weather), &settings).unwrap()
    }

    #[tokio::test]
    async fn test_reply_is_returned_verbatim() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(reply("  72°F and clear.\n"))]));
        let specialist = weather_specialist(client.clone(), Duration::from_secs(5));

        let text = specialist.process_task("Location: Austin").await.unwrap();
        assert_eq!(text, "  72°F and clear.\n");

        let tools = client.requests()[0].tools.clone().unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, vec!["get_current_weather", "get_weather_forecast"]);
    }

    #[tokio::test]
    async fn test_failures_become_text() {
        let failing = Arc::new(ScriptedClient::new(vec![Err(Error::openrouter("connection refused"))]));
        let text = weather_specialist(failing, Duration::from_secs(5))
            .process_task("task")
            .await
            .unwrap();
        assert!(text.starts_with("Weather agent error:"));
        assert!(text.contains("connection refused"));

        let silent = Arc::new(ScriptedClient::new(vec![Ok(reply(""))]));
        let text = weather_specialist(silent, Duration::from_secs(5))
            .process_task("task")
            .await
            .unwrap();
        assert_eq!(text, "No response received from weather agent");
    }

    #[tokio::test]
    async fn test_run_timeout_yields_sentinel() {
        let slow = Arc::new(
            ScriptedClient::new(vec![Ok(reply("late"))]).with_delay(Duration::from_millis(200)),
        );
        let text = weather_specialist(slow, Duration::from_millis(20))
            .process_task("task")
            .await
            .unwrap();
        assert_eq!(text, no_response_sentinel(AgentName::Weather));
    }

    #[tokio::test]
    async fn test_identity_is_stable_across_tasks() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(reply("a")), Ok(reply("b"))]));
        let specialist = weather_specialist(client, Duration::from_secs(5));
        let id = specialist.agent_id();
        specialist.process_task("one").await.unwrap();
        specialist.process_task("two").await.unwrap();
        assert_eq!(specialist.agent_id(), id);
    }
}
