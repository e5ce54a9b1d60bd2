//! Agent implementation with a function-calling ReAct loop

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message, ToolCall, ToolDefinition};
use crate::react::{Action, Observation, ReActTrace, StopReason};
use crate::tools::{Tool, ToolContext, ToolOutput};
use crate::types::{AgentId, ConversationId};
use serde::Serialize;
use std::sync::Arc;

/// Agent structure
pub struct Agent {
    /// Unique identifier, fixed for the agent's lifetime
    pub id: AgentId,
    /// Human-readable name for tracing and debugging
    pub name: String,
    /// System prompt defining agent persona and capabilities
    pub system_prompt: String,
    /// LLM model configuration
    pub model: ModelConfig,
    /// Available tools this agent can invoke
    pub tools: Vec<Arc<dyn Tool>>,
    /// Maximum model round-trips per run
    pub max_loops: u32,
    /// LLM client
    client: Arc<dyn LlmClient>,
}

/// Outcome of one [`Agent::run`]
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    /// Agent that ran
    pub agent_id: AgentId,
    /// Conversation context the run used
    pub conversation_id: ConversationId,
    /// First terminal assistant message, verbatim
    pub reply: Option<String>,
    /// Actions and observations of the loop
    pub trace: ReActTrace,
    /// Why the loop stopped
    pub stop_reason: StopReason,
}

/// One exchange's message history. Opened per run and dropped on every exit
/// path, so nothing leaks between runs of the same agent.
struct Conversation<'a> {
    id: ConversationId,
    agent: &'a str,
    messages: Vec<Message>,
}

impl<'a> Conversation<'a> {
    fn open(agent: &'a str, system_prompt: &str, input: &str) -> Self {
        let id = ConversationId::new();
        tracing::trace!(agent, conversation_id = %id, "conversation opened");
        Self {
            id,
            agent,
            messages: vec![Message::system(system_prompt), Message::user(input)],
        }
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl Drop for Conversation<'_> {
    fn drop(&mut self) {
        tracing::trace!(
            agent = self.agent,
            conversation_id = %self.id,
            messages = self.messages.len(),
            "conversation released"
        );
    }
}

impl Agent {
    /// Create a new agent builder
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Run one independent exchange: submit `input`, let the model call tools
    /// until it produces a terminal reply or the loop budget runs out.
    ///
    /// Errors only when the execution engine itself fails. Tool failures are
    /// fed back to the model and never abort the run.
    pub async fn run(&self, input: &str) -> Result<AgentRun> {
        let mut conversation = Conversation::open(&self.name, &self.system_prompt, input);
        let ctx = ToolContext::new(self.id, conversation.id);
        let definitions: Vec<ToolDefinition> = self.tools.iter().map(|t| t.definition()).collect();
        let mut trace = ReActTrace::new();

        for iteration in 0..self.max_loops {
            let mut request = CompletionRequest::new(&self.model.model, conversation.messages.clone())
                .with_temperature(self.model.temperature)
                .with_tools(definitions.clone());
            if let Some(max_tokens) = self.model.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = self.client.complete(request).await?;
            trace.add_iteration(response.token_usage());

            let Some(message) = response.message().cloned() else {
                return Ok(self.finish(&conversation, None, trace, StopReason::EmptyReply));
            };

            let calls = message.requested_tool_calls().to_vec();
            if calls.is_empty() {
                if message.text().trim().is_empty() {
                    return Ok(self.finish(&conversation, None, trace, StopReason::EmptyReply));
                }
                let reply = message.text().to_string();
                trace.add_action(Action::final_answer(&reply));
                return Ok(self.finish(&conversation, Some(reply), trace, StopReason::Completed));
            }

            tracing::debug!(
                agent = %self.name,
                iteration,
                tool_calls = calls.len(),
                "model requested tools"
            );
            conversation.push(Message::assistant_tool_calls(message.content.clone(), calls.clone()));

            for call in &calls {
                let (params, observation) = self.invoke_tool(call, &ctx).await;
                trace.add_action(Action::tool_call(&call.function.name, &call.id, params));
                conversation.push(Message::tool(observation.content.clone(), &call.id));
                trace.add_observation(observation);
            }
        }

        tracing::warn!(agent = %self.name, max_loops = self.max_loops, "tool loop budget exhausted");
        Ok(self.finish(&conversation, None, trace, StopReason::MaxIterations))
    }

    fn finish(
        &self,
        conversation: &Conversation<'_>,
        reply: Option<String>,
        mut trace: ReActTrace,
        stop_reason: StopReason,
    ) -> AgentRun {
        trace.complete();
        tracing::debug!(
            agent = %self.name,
            iterations = trace.iterations,
            tool_calls = trace.tool_call_count(),
            stop_reason = %stop_reason,
            "agent run finished"
        );
        AgentRun {
            agent_id: self.id,
            conversation_id: conversation.id,
            reply,
            trace,
            stop_reason,
        }
    }

    /// Execute one requested tool call. Every failure becomes a normalized
    /// error observation for the model.
    async fn invoke_tool(&self, call: &ToolCall, ctx: &ToolContext) -> (serde_json::Value, Observation) {
        let name = call.function.name.as_str();
        let raw_args = call.function.arguments.trim();
        let params = if raw_args.is_empty() {
            Ok(serde_json::json!({}))
        } else {
            serde_json::from_str::<serde_json::Value>(raw_args)
        };

        let params = match params {
            Ok(params) => params,
            Err(e) => {
                let output = ToolOutput::failure(format!("Invalid arguments for {}: {}", name, e));
                return (
                    serde_json::Value::String(raw_args.to_string()),
                    Observation::error(output.to_model_content()),
                );
            }
        };

        let output = match self.execute_tool(name, params.clone(), ctx).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(agent = %self.name, tool = name, error = %e, "tool call failed");
                ToolOutput::failure(e.to_string())
            }
        };

        let observation = if output.success {
            Observation::new(output.to_model_content())
        } else {
            Observation::error(output.to_model_content())
        };
        (params, observation)
    }

    async fn execute_tool(
        &self,
        tool_id: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.id() == tool_id)
            .ok_or_else(|| Error::tool_execution(tool_id, "Tool not found"))?;

        tool.validate(&params)?;
        tool.execute(params, ctx).await
    }
}

/// Agent builder
pub struct AgentBuilder {
    name: Option<String>,
    system_prompt: Option<String>,
    model: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    max_loops: u32,
    temperature: f32,
    max_tokens: Option<u32>,
    client: Option<Arc<dyn LlmClient>>,
}

impl AgentBuilder {
    /// Create a new agent builder
    pub fn new() -> Self {
        Self {
            name: None,
            system_prompt: None,
            model: None,
            tools: Vec::new(),
            max_loops: 8,
            temperature: 0.7,
            max_tokens: None,
            client: None,
        }
    }

    /// Set the agent name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add multiple tools
    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Set the maximum loops
    pub fn max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap completion tokens per round-trip
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the LLM client
    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<Agent> {
        let name = self.name.ok_or_else(|| Error::config("Agent name is required"))?;
        let system_prompt = self
            .system_prompt
            .ok_or_else(|| Error::config("System prompt is required"))?;
        if self.max_loops == 0 {
            return Err(Error::config("max_loops must be at least 1"));
        }
        let model_name = self.model.unwrap_or_else(|| crate::config::presets::FAST.to_string());

        let client = match self.client {
            Some(client) => client,
            None => Arc::new(crate::openrouter::OpenRouterClient::from_env()?) as Arc<dyn LlmClient>,
        };

        let mut model = ModelConfig::new(model_name).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            model = model.with_max_tokens(max_tokens);
        }

        Ok(Agent {
            id: AgentId::new(),
            name,
            system_prompt,
            model,
            tools: self.tools,
            max_loops: self.max_loops,
            client,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
