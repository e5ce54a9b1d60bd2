//! Test doubles: a scripted execution engine, a trivial tool and fake specialists

use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{
    Choice, CompletionRequest, CompletionResponse, FunctionCall, Message, ToolCall, Usage,
};
use crate::specialist::Specialist;
use crate::tools::{schema_for, Tool, ToolContext, ToolOutput};
use crate::types::AgentName;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

fn response(message: Message) -> CompletionResponse {
    CompletionResponse {
        id: "gen-test".to_string(),
        model: "test-model".to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// Assistant text reply
pub fn reply(text: &str) -> CompletionResponse {
    response(Message::assistant(text))
}

/// Assistant turn requesting one tool call
pub fn tool_call_reply(call_id: &str, tool: &str, arguments: &str) -> CompletionResponse {
    response(Message::assistant_tool_calls(
        None,
        vec![ToolCall {
            id: call_id.to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: tool.to_string(),
                arguments: arguments.to_string(),
            },
        }],
    ))
}

/// Response with no choices at all
pub fn no_choices() -> CompletionResponse {
    CompletionResponse {
        id: String::new(),
        model: String::new(),
        choices: vec![],
        usage: None,
    }
}

/// [`LlmClient`] replaying a fixed script and recording every request
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<CompletionResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Text of the last user message of request `index`
    pub fn user_prompt(&self, index: usize) -> String {
        self.requests()[index]
            .messages
            .iter()
            .rev()
            .find(|m| m.role == crate::openrouter::Role::User)
            .map(|m| m.text().to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(Error::openrouter("script exhausted")))
    }

    fn client_type(&self) -> &str {
        "scripted"
    }

    fn endpoint(&self) -> &str {
        "memory://scripted"
    }
}

#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
struct EchoArgs {
    /// Location to echo
    location: String,
}

/// Tool echoing its arguments back
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn id(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the arguments"
    }

    fn input_schema(&self) -> Value {
        schema_for::<EchoArgs>()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::success(serde_json::json!({ "echo": params })))
    }
}

/// What a [`FakeSpecialist`] does when invoked
pub enum Behavior {
    Reply(String),
    Fail(String),
    Panic,
    Sleep(Duration, String),
}

/// Specialist with scripted behavior that records the tasks it receives
pub struct FakeSpecialist {
    name: AgentName,
    behavior: Behavior,
    tasks: Mutex<Vec<String>>,
}

impl FakeSpecialist {
    pub fn new(name: AgentName, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(name: AgentName, text: &str) -> Self {
        Self::new(name, Behavior::Reply(text.to_string()))
    }

    pub fn tasks(&self) -> Vec<String> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Specialist for FakeSpecialist {
    fn name(&self) -> AgentName {
        self.name
    }

    async fn process_task(&self, task: &str) -> Result<String> {
        self.tasks.lock().unwrap().push(task.to_string());
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Fail(message) => Err(Error::specialist(self.name, message.clone())),
            Behavior::Panic => panic!("{} specialist blew up", self.name),
            Behavior::Sleep(duration, text) => {
                tokio::time::sleep(*duration).await;
                Ok(text.clone())
            }
        }
    }
}
