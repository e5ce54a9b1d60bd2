//! OpenWeatherMap-backed weather tools

use super::{check_status, schema_for, ProviderError, Tool, ToolContext, ToolOutput};
use crate::config::WeatherApiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_FORECAST_INTERVALS: u32 = 8;
const MAX_FORECAST_INTERVALS: u32 = 40;

/// Unit system for temperatures and wind speeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Celsius and metres per second
    Metric,
    /// Fahrenheit and miles per hour
    #[default]
    Imperial,
}

impl Units {
    /// Query value understood by OpenWeatherMap
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Temperature unit label
    pub fn temperature_unit(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    /// Wind speed unit label
    pub fn speed_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }
}

/// Arguments of `get_current_weather`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CurrentWeatherArgs {
    /// Location name, e.g. "Paris" or "Austin, US"
    pub location: String,
    /// Unit system for the reply
    #[serde(default)]
    pub units: Units,
}

/// Arguments of `get_weather_forecast`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ForecastArgs {
    /// Location name, e.g. "Paris" or "Austin, US"
    pub location: String,
    /// Unit system for the reply
    #[serde(default)]
    pub units: Units,
    /// Number of 3-hour intervals to return
    #[serde(default = "default_intervals")]
    pub cnt: u32,
}

fn default_intervals() -> u32 {
    DEFAULT_FORECAST_INTERVALS
}

/// HTTP client for the OpenWeatherMap 2.5 API
pub struct OpenWeatherClient {
    http: Client,
    config: WeatherApiConfig,
}

impl OpenWeatherClient {
    /// Create a client from configuration
    pub fn new(config: WeatherApiConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn api_key(&self) -> std::result::Result<&str, ProviderError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(ProviderError::MissingKey("OpenWeatherMap", "WEATHER_API_KEY"))
    }

    /// Current conditions for a location
    pub async fn current(
        &self,
        location: &str,
        units: Units,
    ) -> std::result::Result<CurrentWeather, ProviderError> {
        let api_key = self.api_key()?;
        let response = self
            .http
            .get(self.config.endpoint("weather"))
            .query(&[("q", location), ("appid", api_key), ("units", units.as_str())])
            .send()
            .await?;
        let raw: RawCurrent = check_status(response).await?.json().await?;

        if !cod_ok(&raw.cod) {
            return Err(ProviderError::Provider(provider_message(&raw.message)));
        }
        Ok(CurrentWeather::from_raw(raw, units))
    }

    /// Forecast in 3-hour intervals for a location
    pub async fn forecast(
        &self,
        location: &str,
        units: Units,
        intervals: u32,
    ) -> std::result::Result<Forecast, ProviderError> {
        let api_key = self.api_key()?;
        let cnt = intervals.clamp(1, MAX_FORECAST_INTERVALS).to_string();
        let response = self
            .http
            .get(self.config.endpoint("forecast"))
            .query(&[
                ("q", location),
                ("appid", api_key),
                ("units", units.as_str()),
                ("cnt", cnt.as_str()),
            ])
            .send()
            .await?;
        let raw: RawForecast = check_status(response).await?.json().await?;

        if !cod_ok(&raw.cod) {
            return Err(ProviderError::Provider(provider_message(&raw.message)));
        }
        Ok(Forecast::from_raw(raw, units))
    }
}

// `/weather` reports cod as a number, `/forecast` as a string.
fn cod_ok(cod: &Option<Value>) -> bool {
    match cod {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s == "200",
        _ => false,
    }
}

fn provider_message(message: &Option<Value>) -> String {
    match message {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unexpected response from weather provider".to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCurrent {
    cod: Option<Value>,
    message: Option<Value>,
    name: Option<String>,
    sys: RawSys,
    coord: RawCoord,
    main: RawMain,
    visibility: Option<i64>,
    wind: RawWind,
    weather: Vec<RawCondition>,
    clouds: RawClouds,
    rain: Option<Value>,
    snow: Option<Value>,
    dt: Option<i64>,
    timezone: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawForecast {
    cod: Option<Value>,
    message: Option<Value>,
    city: RawCity,
    list: Vec<RawForecastItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCity {
    name: Option<String>,
    country: Option<String>,
    coord: RawCoord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawForecastItem {
    dt: Option<i64>,
    dt_txt: Option<String>,
    main: RawMain,
    weather: Vec<RawCondition>,
    wind: RawWind,
    clouds: RawClouds,
    rain: Option<Value>,
    snow: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(default)]
struct RawCoord {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<i64>,
    pressure: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWind {
    speed: Option<f64>,
    deg: Option<i64>,
    gust: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct RawCondition {
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClouds {
    all: Option<i64>,
}

/// Where the provider resolved the query to
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLocation {
    /// City name
    pub name: String,
    /// ISO country code
    pub country: String,
    /// Latitude/longitude
    pub coordinates: Coordinates,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    /// Latitude
    pub lat: Option<f64>,
    /// Longitude
    pub lon: Option<f64>,
}

impl From<RawCoord> for Coordinates {
    fn from(raw: RawCoord) -> Self {
        Self {
            lat: raw.lat,
            lon: raw.lon,
        }
    }
}

/// Sky conditions
#[derive(Debug, Clone, Serialize)]
pub struct Conditions {
    /// Condition group ("Rain", "Clear", ...)
    pub main: Option<String>,
    /// Longer description
    pub description: Option<String>,
    /// Provider icon code
    pub icon: Option<String>,
}

impl Conditions {
    fn from_first(raw: &[RawCondition]) -> Self {
        let first = raw.first().cloned().unwrap_or_default();
        Self {
            main: first.main,
            description: first.description,
            icon: first.icon,
        }
    }
}

/// Current conditions block
#[derive(Debug, Clone, Serialize)]
pub struct CurrentConditions {
    /// Temperature
    pub temperature: Option<f64>,
    /// Temperature unit label
    pub temperature_unit: &'static str,
    /// Perceived temperature
    pub feels_like: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<i64>,
    /// Pressure, hPa
    pub pressure: Option<i64>,
    /// Visibility, metres
    pub visibility: Option<i64>,
}

/// Wind block
#[derive(Debug, Clone, Serialize)]
pub struct Wind {
    /// Wind speed
    pub speed: Option<f64>,
    /// Wind speed unit label
    pub speed_unit: &'static str,
    /// Direction, degrees
    pub direction: Option<i64>,
    /// Gust speed
    pub gust: Option<f64>,
}

/// Reply of `get_current_weather`
#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeather {
    /// Resolved location
    pub location: ResolvedLocation,
    /// Temperature and atmosphere
    pub current: CurrentConditions,
    /// Wind
    pub wind: Wind,
    /// Sky conditions
    pub weather: Conditions,
    /// Cloud coverage, percent
    pub cloud_coverage: Option<i64>,
    /// Rain volume block as reported
    pub rain: Value,
    /// Snow volume block as reported
    pub snow: Value,
    /// Observation time, unix seconds
    pub timestamp: Option<i64>,
    /// UTC offset, seconds
    pub timezone: Option<i64>,
    /// Sunrise, unix seconds
    pub sunrise: Option<i64>,
    /// Sunset, unix seconds
    pub sunset: Option<i64>,
}

impl CurrentWeather {
    fn from_raw(raw: RawCurrent, units: Units) -> Self {
        Self {
            location: ResolvedLocation {
                name: raw.name.unwrap_or_else(|| "Unknown".to_string()),
                country: raw.sys.country.unwrap_or_default(),
                coordinates: raw.coord.into(),
            },
            current: CurrentConditions {
                temperature: raw.main.temp,
                temperature_unit: units.temperature_unit(),
                feels_like: raw.main.feels_like,
                humidity: raw.main.humidity,
                pressure: raw.main.pressure,
                visibility: raw.visibility,
            },
            wind: Wind {
                speed: raw.wind.speed,
                speed_unit: units.speed_unit(),
                direction: raw.wind.deg,
                gust: raw.wind.gust,
            },
            weather: Conditions::from_first(&raw.weather),
            cloud_coverage: raw.clouds.all,
            rain: raw.rain.unwrap_or_else(|| serde_json::json!({})),
            snow: raw.snow.unwrap_or_else(|| serde_json::json!({})),
            timestamp: raw.dt,
            timezone: raw.timezone,
            sunrise: raw.sys.sunrise,
            sunset: raw.sys.sunset,
        }
    }
}

/// Temperatures of one forecast interval
#[derive(Debug, Clone, Serialize)]
pub struct ForecastTemperature {
    /// Temperature
    pub temp: Option<f64>,
    /// Perceived temperature
    pub feels_like: Option<f64>,
    /// Minimum in the interval
    pub temp_min: Option<f64>,
    /// Maximum in the interval
    pub temp_max: Option<f64>,
    /// Temperature unit label
    pub unit: &'static str,
}

/// One 3-hour forecast interval
#[derive(Debug, Clone, Serialize)]
pub struct ForecastEntry {
    /// Interval start, provider text form
    pub datetime: Option<String>,
    /// Interval start, unix seconds
    pub timestamp: Option<i64>,
    /// Temperatures
    pub temperature: ForecastTemperature,
    /// Sky conditions
    pub weather: Conditions,
    /// Relative humidity, percent
    pub humidity: Option<i64>,
    /// Pressure, hPa
    pub pressure: Option<i64>,
    /// Wind
    pub wind: Wind,
    /// Cloud coverage, percent
    pub clouds: Option<i64>,
    /// Rain volume block as reported
    pub rain: Value,
    /// Snow volume block as reported
    pub snow: Value,
}

/// Reply of `get_weather_forecast`
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    /// Resolved location
    pub location: ResolvedLocation,
    /// Intervals in chronological order
    pub forecast: Vec<ForecastEntry>,
}

impl Forecast {
    fn from_raw(raw: RawForecast, units: Units) -> Self {
        let forecast = raw
            .list
            .into_iter()
            .map(|item| ForecastEntry {
                datetime: item.dt_txt,
                timestamp: item.dt,
                temperature: ForecastTemperature {
                    temp: item.main.temp,
                    feels_like: item.main.feels_like,
                    temp_min: item.main.temp_min,
                    temp_max: item.main.temp_max,
                    unit: units.temperature_unit(),
                },
                weather: Conditions::from_first(&item.weather),
                humidity: item.main.humidity,
                pressure: item.main.pressure,
                wind: Wind {
                    speed: item.wind.speed,
                    speed_unit: units.speed_unit(),
                    direction: item.wind.deg,
                    gust: item.wind.gust,
                },
                clouds: item.clouds.all,
                rain: item.rain.unwrap_or_else(|| serde_json::json!({})),
                snow: item.snow.unwrap_or_else(|| serde_json::json!({})),
            })
            .collect();

        Self {
            location: ResolvedLocation {
                name: raw.city.name.unwrap_or_else(|| "Unknown".to_string()),
                country: raw.city.country.unwrap_or_default(),
                coordinates: raw.city.coord.into(),
            },
            forecast,
        }
    }
}

/// `get_current_weather` tool
pub struct CurrentWeatherTool {
    client: Arc<OpenWeatherClient>,
}

impl CurrentWeatherTool {
    /// Wrap a weather client
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CurrentWeatherTool {
    fn id(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get current weather conditions for a location"
    }

    fn input_schema(&self) -> Value {
        schema_for::<CurrentWeatherArgs>()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let args: CurrentWeatherArgs = serde_json::from_value(params)
            .map_err(|e| Error::InvalidInput(format!("get_current_weather: {}", e)))?;

        match self.client.current(&args.location, args.units).await {
            Ok(report) => Ok(ToolOutput::success(serde_json::to_value(report)?)),
            Err(err) => {
                tracing::warn!(location = %args.location, error = %err, "current weather lookup failed");
                Ok(err.into_tool_output(&args.location, serde_json::json!({})))
            }
        }
    }
}

/// `get_weather_forecast` tool
pub struct WeatherForecastTool {
    client: Arc<OpenWeatherClient>,
}

impl WeatherForecastTool {
    /// Wrap a weather client
    pub fn new(client: Arc<OpenWeatherClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherForecastTool {
    fn id(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Get the weather forecast for a location in 3-hour intervals"
    }

    fn input_schema(&self) -> Value {
        schema_for::<ForecastArgs>()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let args: ForecastArgs = serde_json::from_value(params)
            .map_err(|e| Error::InvalidInput(format!("get_weather_forecast: {}", e)))?;

        match self.client.forecast(&args.location, args.units, args.cnt).await {
            Ok(report) => Ok(ToolOutput::success(serde_json::to_value(report)?)),
            Err(err) => {
                tracing::warn!(location = %args.location, error = %err, "weather forecast lookup failed");
                Ok(err.into_tool_output(&args.location, serde_json::json!({})))
            }
        }
    }
}

/// Both weather tools over one shared client
pub fn weather_tools(client: Arc<OpenWeatherClient>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CurrentWeatherTool::new(client.clone())),
        Arc::new(WeatherForecastTool::new(client)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, ConversationId};
    use mockito::Matcher;
    use url::Url;

    fn client_for(server: &mockito::ServerGuard, key: Option<&str>) -> Arc<OpenWeatherClient> {
        let config = WeatherApiConfig::new(
            key.map(str::to_string),
            Url::parse(&server.url()).unwrap(),
        );
        Arc::new(OpenWeatherClient::new(config).unwrap())
    }

    fn ctx() -> ToolContext {
        ToolContext::new(AgentId::new(), ConversationId::new())
    }

    #[tokio::test]
    async fn test_current_weather_reshapes_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Paris".into()),
                Matcher::UrlEncoded("units".into(), "metric".into()),
                Matcher::UrlEncoded("appid".into(), "k".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"cod":200,"name":"Paris","sys":{"country":"FR","sunrise":1,"sunset":2},
                    "coord":{"lat":48.85,"lon":2.35},
                    "main":{"temp":14.2,"feels_like":13.1,"humidity":71,"pressure":1012},
                    "wind":{"speed":3.6,"deg":240},
                    "weather":[{"main":"Clouds","description":"broken clouds","icon":"04d"}],
                    "clouds":{"all":75},"dt":1700000000,"timezone":3600}"#,
            )
            .create_async()
            .await;

        let tool = CurrentWeatherTool::new(client_for(&server, Some("k")));
        let output = tool
            .execute(serde_json::json!({"location": "Paris", "units": "metric"}), &ctx())
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(output.success);
        assert_eq!(output.data["location"]["country"], "FR");
        assert_eq!(output.data["current"]["temperature_unit"], "°C");
        assert_eq!(output.data["wind"]["speed_unit"], "m/s");
        assert_eq!(output.data["weather"]["description"], "broken clouds");
    }

    #[tokio::test]
    async fn test_forecast_accepts_string_cod() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/forecast")
            .match_query(Matcher::UrlEncoded("cnt".into(), "2".into()))
            .with_status(200)
            .with_body(
                r#"{"cod":"200","message":0,"city":{"name":"Austin","country":"US","coord":{"lat":30.2,"lon":-97.7}},
                    "list":[
                      {"dt":1,"dt_txt":"2024-05-01 12:00:00","main":{"temp":88.0},"weather":[{"main":"Clear"}],"wind":{"speed":5.0}},
                      {"dt":2,"dt_txt":"2024-05-01 15:00:00","main":{"temp":91.0},"weather":[{"main":"Clear"}],"wind":{"speed":6.0}}
                    ]}"#,
            )
            .create_async()
            .await;

        let tool = WeatherForecastTool::new(client_for(&server, Some("k")));
        let output = tool
            .execute(serde_json::json!({"location": "Austin", "cnt": 2}), &ctx())
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.data["forecast"].as_array().unwrap().len(), 2);
        assert_eq!(output.data["forecast"][1]["temperature"]["unit"], "°F");
        assert_eq!(output.data["location"]["name"], "Austin");
    }

    #[tokio::test]
    async fn test_missing_key_and_http_errors_are_normalized() {
        let mut server = mockito::Server::new_async().await;
        let no_key = CurrentWeatherTool::new(client_for(&server, None));
        let output = no_key
            .execute(serde_json::json!({"location": "Paris"}), &ctx())
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.data["error"].as_str().unwrap().contains("WEATHER_API_KEY"));
        assert_eq!(output.data["location"], "Paris");

        server
            .mock("GET", "/weather")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"cod":"404","message":"city not found"}"#)
            .create_async()
            .await;
        let tool = CurrentWeatherTool::new(client_for(&server, Some("k")));
        let output = tool
            .execute(serde_json::json!({"location": "Nowhere"}), &ctx())
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.data["status_code"], 404);
    }

    #[test]
    fn test_forecast_schema_has_defaults() {
        let schema = WeatherForecastTool::new(Arc::new(
            OpenWeatherClient::new(WeatherApiConfig::new(
                None,
                Url::parse("http://localhost").unwrap(),
            ))
            .unwrap(),
        ))
        .input_schema();

        assert_eq!(schema["required"], serde_json::json!(["location"]));
        assert_eq!(schema["properties"]["cnt"]["default"], 8);
    }
}
