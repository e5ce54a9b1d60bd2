//! Tool trait, tool output and the data-provider tools specialists call
//!
//! Every tool failure reaches the model in one normalized shape: a JSON object
//! with an `"error"` string plus whatever context the tool can add (the
//! requested `"location"`, the provider `"status_code"`). A tool never answers
//! with `null`.

pub mod attractions;
pub mod weather;

use crate::error::{Error, Result};
use crate::openrouter::ToolDefinition;
use crate::types::{AgentId, ConversationId};
use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use attractions::{CurrentAttractionsTool, TripAdvisorClient};
pub use weather::{weather_tools, CurrentWeatherTool, OpenWeatherClient, Units, WeatherForecastTool};

/// Context provided to tools during execution
#[derive(Debug, Clone, Copy)]
pub struct ToolContext {
    /// ID of the agent executing the tool
    pub agent_id: AgentId,
    /// Conversation the call belongs to
    pub conversation_id: ConversationId,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(agent_id: AgentId, conversation_id: ConversationId) -> Self {
        Self {
            agent_id,
            conversation_id,
        }
    }
}

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// Structured result (or normalized failure object)
    pub data: Value,
    /// Error message when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// Create a failed tool output carrying only the error text
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: serde_json::json!({ "error": error }),
            error: Some(error),
        }
    }

    /// Create a failed tool output with extra context fields.
    ///
    /// `context` must be a JSON object; the `"error"` key is always set.
    pub fn failure_with_context(error: impl Into<String>, context: Value) -> Self {
        let error = error.into();
        let mut data = match context {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        data.insert("error".to_string(), Value::String(error.clone()));
        Self {
            success: false,
            data: Value::Object(data),
            error: Some(error),
        }
    }

    /// Text handed back to the model as the tool message
    pub fn to_model_content(&self) -> String {
        self.data.to_string()
    }
}

/// Tool trait defining the interface for agent capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name advertised to the model
    fn id(&self) -> &str;

    /// Description for LLM function calling
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Validate parameters against [`Tool::input_schema`] before execution
    fn validate(&self, params: &Value) -> Result<()> {
        validate_against_schema(&self.input_schema(), params)
    }

    /// Function-calling definition sent with each completion request
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.id(), self.description(), self.input_schema())
    }
}

/// JSON Schema for a tool argument struct, with subschemas inlined so the
/// model sees one self-contained object schema
pub fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();

    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
    }
    value
}

/// Check `params` against `schema`, collecting every violation
pub fn validate_against_schema(schema: &Value, params: &Value) -> Result<()> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| Error::JsonSchema(e.to_string()))?;

    let result = match validator.validate(params) {
        Ok(()) => Ok(()),
        Err(errors) => {
            let violations: Vec<String> = errors.map(|e| e.to_string()).collect();
            Err(Error::JsonSchema(violations.join("; ")))
        }
    };
    result
}

/// Failure talking to a third-party data provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key configured
    #[error("{0} API key not found; set {1} in the environment")]
    MissingKey(&'static str, &'static str),

    /// Non-success HTTP status
    #[error("HTTP {status} error: {body}")]
    Status { status: u16, body: String },

    /// Transport-level failure
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered 200 but reported an error in the payload
    #[error("Provider error: {0}")]
    Provider(String),
}

impl ProviderError {
    /// HTTP status, when the provider answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Normalized failure output for a call about `location`
    pub fn into_tool_output(self, location: &str, extra: Value) -> ToolOutput {
        let mut context = match extra {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        context.insert("location".to_string(), Value::String(location.to_string()));
        if let Some(status) = self.status_code() {
            context.insert("status_code".to_string(), Value::from(status));
        }
        ToolOutput::failure_with_context(self.to_string(), Value::Object(context))
    }
}

/// Turn a non-success response into [`ProviderError::Status`]
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Args {
        /// Where to look
        location: String,
        #[serde(default)]
        units: Units,
    }

    #[test]
    fn test_schema_for_inlines_enums() {
        let schema = schema_for::<Args>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["location"]));
        assert_eq!(schema["properties"]["location"]["description"], "Where to look");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());
        let units = schema["properties"]["units"].to_string();
        assert!(units.contains("metric") && units.contains("imperial"));
    }

    #[test]
    fn test_validation_reports_missing_fields() {
        let schema = schema_for::<Args>();
        assert!(validate_against_schema(&schema, &serde_json::json!({"location": "Oslo"})).is_ok());

        let err = validate_against_schema(&schema, &serde_json::json!({"units": "metric"}))
            .unwrap_err();
        assert!(matches!(err, Error::JsonSchema(ref msg) if msg.contains("location")));

        let err = validate_against_schema(&schema, &serde_json::json!({"units": "kelvin"}))
            .unwrap_err();
        assert!(matches!(err, Error::JsonSchema(ref msg) if msg.contains("kelvin") && msg.contains("; ")));
    }

    #[test]
    fn test_provider_error_normalizes_to_error_object() {
        let output = ProviderError::Status {
            status: 404,
            body: "city not found".to_string(),
        }
        .into_tool_output("Atlantis", serde_json::json!({ "attractions": [] }));

        assert!(!output.success);
        assert_eq!(output.data["location"], "Atlantis");
        assert_eq!(output.data["status_code"], 404);
        assert_eq!(output.data["attractions"], serde_json::json!([]));
        assert!(output.data["error"].as_str().unwrap().contains("city not found"));
    }
}
