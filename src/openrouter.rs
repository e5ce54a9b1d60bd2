//! OpenRouter (OpenAI-compatible) chat completions client with function calling

use crate::config::OpenRouterConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::types::TokenUsage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter API client
pub struct OpenRouterClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenRouterConfig::from_env()?;
        Self::new(config)
    }

    /// Create a new OpenRouter client with the given configuration
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Send a completion request, retrying transport failures, 429 and 5xx
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut attempt = 0;
        loop {
            match self.send(&request).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.config.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    let backoff = backoff_for(attempt);
                    tracing::warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying completion request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = self.config.endpoint("chat/completions");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("X-Title", &self.config.app_name)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::openrouter_status(
                status.as_u16(),
                format!("Request failed with status {}: {}", status, error_text),
            ));
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(completion)
    }
}

const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 30_000;

fn backoff_for(attempt: u32) -> Duration {
    let ms = BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(MAX_BACKOFF_MS))
}

fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Http(e) => e.is_timeout() || e.is_connect(),
        Error::OpenRouter {
            status: Some(status),
            ..
        } => StatusCode::from_u16(*status)
            .map(|status| status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        OpenRouterClient::complete(self, request).await
    }

    fn client_type(&self) -> &str {
        "openrouter"
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_str()
    }
}

/// Completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens for completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            tools: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tools; an empty list leaves the request tool-less
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
        }
        self
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Text content; assistant turns that only call tools carry none
    #[serde(default)]
    pub content: Option<String>,
    /// Optional name of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional tool calls (for assistant messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            name: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Create a tool message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Text content, empty when absent
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Tool calls requested by this message, if any
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool message
    Tool,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Create a function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function definition for tool calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
}

/// Tool call from the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Type (always "function")
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Function call details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments (JSON string)
    #[serde(default)]
    pub arguments: String,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choices
    pub choices: Vec<Choice>,
    /// Token usage; some providers omit it
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// The first choice's message, if any
    pub fn message(&self) -> Option<&Message> {
        self.choices.first().map(|choice| &choice.message)
    }

    /// Token usage, zero when the provider did not report it
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.clone().map(TokenUsage::from).unwrap_or_default()
    }
}

/// Choice in completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Index of the choice
    #[serde(default)]
    pub index: u32,
    /// Message content
    pub message: Message,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Total tokens
    pub total_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}
