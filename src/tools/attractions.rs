//! TripAdvisor-backed attractions tool

use super::{check_status, schema_for, ProviderError, Tool, ToolContext, ToolOutput};
use crate::config::AttractionsApiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const MAX_ATTRACTIONS: usize = 10;

/// Arguments of `get_current_attractions`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AttractionsArgs {
    /// Location name, e.g. "Austin" or "Kyoto, Japan"
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSearch {
    data: Vec<RawLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocation {
    name: Option<String>,
    location_id: Option<Value>,
    address_obj: Option<RawAddress>,
    rating: Option<Value>,
    num_reviews: Option<Value>,
    category: Option<RawCategory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAddress {
    address_string: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCategory {
    name: Option<String>,
}

/// One attraction as handed to the model
#[derive(Debug, Clone, Serialize)]
pub struct Attraction {
    /// Display name
    pub name: String,
    /// Provider location id
    pub location_id: Option<Value>,
    /// Street address
    pub address: String,
    /// Average rating, if the provider has one
    pub rating: Option<Value>,
    /// Review count
    pub num_reviews: Value,
    /// Category label
    pub category: String,
}

impl From<RawLocation> for Attraction {
    fn from(raw: RawLocation) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
            location_id: raw.location_id,
            address: raw
                .address_obj
                .and_then(|address| address.address_string)
                .unwrap_or_else(|| "Address not available".to_string()),
            rating: raw.rating,
            num_reviews: raw.num_reviews.unwrap_or_else(|| Value::from(0)),
            category: raw
                .category
                .and_then(|category| category.name)
                .unwrap_or_else(|| "Attraction".to_string()),
        }
    }
}

/// Search result: the top matches plus how many the provider found
#[derive(Debug, Clone, Serialize)]
pub struct AttractionSearch {
    /// Requested location
    pub location: String,
    /// Up to ten attractions
    pub attractions: Vec<Attraction>,
    /// Number of matches before truncation
    pub total_found: usize,
    /// Set when nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// HTTP client for the TripAdvisor content API
pub struct TripAdvisorClient {
    http: Client,
    config: AttractionsApiConfig,
}

impl TripAdvisorClient {
    /// Create a client from configuration
    pub fn new(config: AttractionsApiConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Search attractions near `location`
    pub async fn search(&self, location: &str) -> std::result::Result<AttractionSearch, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(ProviderError::MissingKey("TripAdvisor", "TRIPADVISOR_KEY"))?;

        let response = self
            .http
            .get(self.config.endpoint("location/search"))
            .query(&[
                ("key", api_key),
                ("searchQuery", location),
                ("category", "attractions"),
                ("language", "en"),
            ])
            .send()
            .await?;
        let raw: RawSearch = check_status(response).await?.json().await?;

        let total_found = raw.data.len();
        let attractions: Vec<Attraction> = raw
            .data
            .into_iter()
            .take(MAX_ATTRACTIONS)
            .map(Attraction::from)
            .collect();
        let message = attractions
            .is_empty()
            .then(|| "No attractions found for this location".to_string());

        Ok(AttractionSearch {
            location: location.to_string(),
            attractions,
            total_found,
            message,
        })
    }
}

/// `get_current_attractions` tool
pub struct CurrentAttractionsTool {
    client: Arc<TripAdvisorClient>,
}

impl CurrentAttractionsTool {
    /// Wrap an attractions client
    pub fn new(client: Arc<TripAdvisorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CurrentAttractionsTool {
    fn id(&self) -> &str {
        "get_current_attractions"
    }

    fn description(&self) -> &str {
        "Get current attractions for a location"
    }

    fn input_schema(&self) -> Value {
        schema_for::<AttractionsArgs>()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let args: AttractionsArgs = serde_json::from_value(params)
            .map_err(|e| Error::InvalidInput(format!("get_current_attractions: {}", e)))?;

        match self.client.search(&args.location).await {
            Ok(found) => {
                tracing::debug!(
                    location = %args.location,
                    total_found = found.total_found,
                    "attractions search complete"
                );
                Ok(ToolOutput::success(serde_json::to_value(found)?))
            }
            Err(err) => {
                tracing::warn!(location = %args.location, error = %err, "attractions lookup failed");
                Ok(err.into_tool_output(&args.location, serde_json::json!({ "attractions": [] })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, ConversationId};
    use mockito::Matcher;
    use url::Url;

    fn tool_for(server: &mockito::ServerGuard, key: Option<&str>) -> CurrentAttractionsTool {
        let config = AttractionsApiConfig::new(
            key.map(str::to_string),
            Url::parse(&server.url()).unwrap(),
        );
        CurrentAttractionsTool::new(Arc::new(TripAdvisorClient::new(config).unwrap()))
    }

    fn ctx() -> ToolContext {
        ToolContext::new(AgentId::new(), ConversationId::new())
    }

    #[tokio::test]
    async fn test_search_truncates_and_fills_defaults() {
        let mut server = mockito::Server::new_async().await;
        let items: Vec<Value> = (0..12)
            .map(|i| {
                if i == 0 {
                    serde_json::json!({
                        "location_id": "123",
                        "name": "Zilker Park",
                        "address_obj": {"address_string": "2100 Barton Springs Rd, Austin"},
                        "rating": "4.5",
                        "num_reviews": "2100",
                        "category": {"name": "Park"}
                    })
                } else {
                    serde_json::json!({ "location_id": i.to_string() })
                }
            })
            .collect();
        let mock = server
            .mock("GET", "/location/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("searchQuery".into(), "Austin".into()),
                Matcher::UrlEncoded("category".into(), "attractions".into()),
                Matcher::UrlEncoded("key".into(), "ta".into()),
            ]))
            .with_status(200)
            .with_body(serde_json::json!({ "data": items }).to_string())
            .create_async()
            .await;

        let output = tool_for(&server, Some("ta"))
            .execute(serde_json::json!({"location": "Austin"}), &ctx())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(output.success);
        assert_eq!(output.data["total_found"], 12);
        let attractions = output.data["attractions"].as_array().unwrap();
        assert_eq!(attractions.len(), 10);
        assert_eq!(attractions[0]["name"], "Zilker Park");
        assert_eq!(attractions[0]["category"], "Park");
        assert_eq!(attractions[1]["name"], "Unknown");
        assert_eq!(attractions[1]["address"], "Address not available");
        assert_eq!(attractions[1]["num_reviews"], 0);
        assert_eq!(attractions[1]["category"], "Attraction");
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/location/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let output = tool_for(&server, Some("ta"))
            .execute(serde_json::json!({"location": "Atlantis"}), &ctx())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.data["attractions"], serde_json::json!([]));
        assert_eq!(output.data["message"], "No attractions found for this location");
    }

    #[tokio::test]
    async fn test_failures_keep_empty_attractions_list() {
        let mut server = mockito::Server::new_async().await;
        let output = tool_for(&server, None)
            .execute(serde_json::json!({"location": "Austin"}), &ctx())
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.data["error"].as_str().unwrap().contains("TRIPADVISOR_KEY"));
        assert_eq!(output.data["attractions"], serde_json::json!([]));

        server
            .mock("GET", "/location/search")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;
        let output = tool_for(&server, Some("ta"))
            .execute(serde_json::json!({"location": "Austin"}), &ctx())
            .await
            .unwrap();
        assert_eq!(output.data["status_code"], 403);
        assert_eq!(output.data["location"], "Austin");
    }
}
