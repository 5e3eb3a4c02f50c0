//! Weather worker returning current conditions from the wttr.in JSON API.

use async_trait::async_trait;
use patternrun_core::error::ToolError;
use patternrun_core::tool::{Tool, ToolArgs};
use serde_json::Value;

const DOCUMENTATION: &str = "\
Fetches weather data for a given location using the wttr.in API.

Args:
    location (str): The name of the city or location to fetch weather data for.

Returns:
    The current conditions as reported by wttr.in, including temperature
    (temp_C, temp_F), humidity, wind speed and a weather description.

Example Usage:
    [[WORKER: {\"name\": \"weather_api\", \"args\": {\"location\": \"London\"}}]]";

const USER_AGENT: &str = "patternrun-weather-worker/0.1";

pub struct WeatherApiTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherApiTool {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{location}?format=j1`, with the location percent-encoded as a path segment.
    fn request_url(&self, location: &str) -> Result<reqwest::Url, ToolError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| failed(format!("invalid weather base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| failed("weather base URL cannot carry a path".into()))?
            .pop_if_empty()
            .push(location);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "weather_api".into(),
        reason,
    }
}

#[async_trait]
impl Tool for WeatherApiTool {
    fn name(&self) -> &str {
        "weather_api"
    }

    fn documentation(&self) -> &str {
        DOCUMENTATION
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let location = args
            .get("location")
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'location' argument".into()))?;

        let url = self.request_url(location)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| failed(format!("Unable to fetch weather data for {location}: {e}")))?;

        if !response.status().is_success() {
            return Err(failed(format!(
                "Unable to fetch weather data for {location} (status {})",
                response.status().as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| failed(format!("weather response is not valid JSON: {e}")))?;
        current_condition(body)
    }
}

/// Pull `current_condition` out of a wttr.in `format=j1` document.
fn current_condition(mut body: Value) -> Result<Value, ToolError> {
    match body.get_mut("current_condition") {
        Some(condition) => Ok(condition.take()),
        None => Err(failed("weather response has no 'current_condition'".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_location_as_a_path_segment() {
        let tool = WeatherApiTool::new(reqwest::Client::new(), "https://wttr.in/");
        let url = tool.request_url("New York").unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/New%20York?format=j1");

        let url = tool.request_url("a/b").unwrap();
        assert_eq!(url.as_str(), "https://wttr.in/a%2Fb?format=j1");
    }

    #[test]
    fn extracts_current_condition() {
        let body = serde_json::json!({
            "current_condition": [{"temp_C": "14", "humidity": "71"}],
            "weather": []
        });
        let condition = current_condition(body).unwrap();
        assert_eq!(condition[0]["temp_C"], "14");
    }

    #[test]
    fn missing_current_condition_is_an_error() {
        let err = current_condition(serde_json::json!({"weather": []})).unwrap_err();
        assert!(err.to_string().contains("current_condition"));
    }

    #[tokio::test]
    async fn blank_location_is_rejected() {
        let tool = WeatherApiTool::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let mut args = ToolArgs::new();
        args.insert("location".into(), "   ".into());
        let err = tool.execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
