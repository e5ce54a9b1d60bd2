//! Configuration types for the execution engine and the data providers
//!
//! Everything is sourced from the environment. A `.env` file in the working
//! directory is honoured for local development.

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const TRIPADVISOR_BASE_URL: &str = "https://api.content.tripadvisor.com/api/v1";

/// Model configuration for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    /// Temperature for sampling (0.0-2.0)
    pub temperature: f32,
    /// Maximum tokens for completion
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    /// Create a new model configuration
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// OpenRouter client configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key (loaded from environment variable)
    pub api_key: SecretString,
    /// Base URL of any OpenAI-compatible chat completions API
    pub base_url: Url,
    /// Maximum retries on failure
    pub max_retries: u32,
    /// Request timeout
    pub timeout: Duration,
    /// App name for OpenRouter tracking
    pub app_name: String,
}

impl OpenRouterConfig {
    /// Create a new OpenRouter configuration from environment
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up OPENROUTER_API_KEY
        let _ = dotenv();

        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| Error::config("OPENROUTER_API_KEY environment variable not set"))?;

        let config = Self::new(api_key)?;
        match std::env::var("OPENROUTER_BASE_URL") {
            Ok(base) => Ok(config.with_base_url(parse_url("OPENROUTER_BASE_URL", &base)?)),
            Err(_) => Ok(config),
        }
    }

    /// Create a new OpenRouter configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            base_url: parse_url("OPENROUTER_BASE_URL", OPENROUTER_BASE_URL)?,
            max_retries: 2,
            timeout: Duration::from_secs(120),
            app_name: "Concierge".to_string(),
        })
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries on transport failures and 5xx replies
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Full URL of an API path below the base URL
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// OpenWeatherMap access
#[derive(Clone)]
pub struct WeatherApiConfig {
    /// API key; `None` makes every weather tool call report a failure
    pub api_key: Option<SecretString>,
    /// Base URL of the 2.5 data API
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
}

impl WeatherApiConfig {
    /// Read `WEATHER_API_KEY` and `WEATHER_API_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        let base = std::env::var("WEATHER_API_BASE_URL")
            .unwrap_or_else(|_| OPENWEATHER_BASE_URL.to_string());

        Ok(Self {
            api_key: std::env::var("WEATHER_API_KEY").ok().map(SecretString::from),
            base_url: parse_url("WEATHER_API_BASE_URL", &base)?,
            timeout: Duration::from_secs(30),
        })
    }

    /// Configuration pointing at an explicit endpoint
    pub fn new(api_key: Option<String>, base_url: Url) -> Self {
        Self {
            api_key: api_key.map(SecretString::from),
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// Full URL of an API path below the base URL
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl std::fmt::Debug for WeatherApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// TripAdvisor content API access
#[derive(Clone)]
pub struct AttractionsApiConfig {
    /// API key; `None` makes every attractions tool call report a failure
    pub api_key: Option<SecretString>,
    /// Base URL of the content API
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
}

impl AttractionsApiConfig {
    /// Read `TRIPADVISOR_KEY` and `TRIPADVISOR_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        let base = std::env::var("TRIPADVISOR_BASE_URL")
            .unwrap_or_else(|_| TRIPADVISOR_BASE_URL.to_string());

        Ok(Self {
            api_key: std::env::var("TRIPADVISOR_KEY").ok().map(SecretString::from),
            base_url: parse_url("TRIPADVISOR_BASE_URL", &base)?,
            timeout: Duration::from_secs(30),
        })
    }

    /// Configuration pointing at an explicit endpoint
    pub fn new(api_key: Option<String>, base_url: Url) -> Self {
        Self {
            api_key: api_key.map(SecretString::from),
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// Full URL of an API path below the base URL
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

impl std::fmt::Debug for AttractionsApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttractionsApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("{} is not a valid URL ({}): {}", var, raw, e)))
}

fn join_url(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Recommended model identifiers
pub mod presets {
    /// Small, fast model suited to classification and tool calling
    pub const FAST: &str = "openai/gpt-4o-mini";

    /// Balanced performance and cost
    pub const BALANCED: &str = "anthropic/claude-sonnet-4";

    /// GPT-4o
    pub const GPT4O: &str = "openai/gpt-4o";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = OpenRouterConfig::new("key")
            .unwrap()
            .with_base_url(Url::parse("http://127.0.0.1:9000").unwrap());
        assert_eq!(config.endpoint("/chat/completions"), "http://127.0.0.1:9000/chat/completions");

        let default = OpenRouterConfig::new("key").unwrap();
        assert_eq!(
            default.endpoint("chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = OpenRouterConfig::new("sk-super-secret").unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-super-secret"));
        assert!(rendered.contains("REDACTED"));

        let weather = WeatherApiConfig::new(
            Some("owm-secret".to_string()),
            Url::parse(OPENWEATHER_BASE_URL).unwrap(),
        );
        assert!(!format!("{:?}", weather).contains("owm-secret"));
    }

    #[test]
    fn test_model_config_builder() {
        let model = ModelConfig::new(presets::FAST)
            .with_temperature(0.0)
            .with_max_tokens(512);
        assert_eq!(model.model, "openai/gpt-4o-mini");
        assert_eq!(model.temperature, 0.0);
        assert_eq!(model.max_tokens, Some(512));
    }
}
