//! Ollama-compatible provider implementation.
//!
//! Talks to the two endpoints the engine needs:
//! - `GET  /api/tags`: list installed models
//! - `POST /api/chat`: chat completion, answered as a stream of
//!   newline-delimited JSON objects
//!
//! The chat stream is consumed to completion before `complete()` returns;
//! a transport error part-way through fails the whole call.

use async_trait::async_trait;
use futures::StreamExt;
use patternrun_core::error::ProviderError;
use patternrun_core::message::Message;
use patternrun_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::ndjson::NdjsonDecoder;

/// A provider backed by an Ollama-compatible HTTP server.
pub struct OllamaProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new provider. `timeout` bounds each request end to end.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "ollama".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert transcript turns to the wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    async fn error_for_status(
        response: reqwest::Response,
        model: Option<&str>,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %error_body, "Backend returned error");

        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(model) = model {
                return Err(ProviderError::ModelNotFound(model.to_string()));
            }
        }
        Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message: error_body,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ApiChatRequest {
            model: &request.model,
            messages: Self::to_api_messages(&request.messages),
        };

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let response = Self::error_for_status(response, Some(&request.model)).await?;

        let mut decoder = NdjsonDecoder::new();
        let mut byte_stream = response.bytes_stream();
        while let Some(chunk) = byte_stream.next().await {
            let bytes = chunk.map_err(|e| ProviderError::StreamInterrupted(e.to_string()))?;
            decoder.feed(&bytes);
        }
        let decoded = decoder.finish();

        if let Some(error) = decoded.backend_error {
            return Err(ProviderError::StreamInterrupted(error));
        }
        for failure in &decoded.failures {
            warn!(
                provider = %self.name,
                line_number = failure.line_number,
                line = %failure.line,
                error = %failure.reason,
                "Skipping undecodable stream line"
            );
        }

        Ok(ProviderResponse {
            content: decoded.content,
            model: decoded.model.unwrap_or(request.model),
            usage: decoded.usage,
            decode_failures: decoded.failures,
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let response = Self::error_for_status(response, None).await?;

        let tags: ApiTagsResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse model list: {e}"))
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiModel>,
}

#[derive(Debug, Deserialize)]
struct ApiModel {
    name: String,
}
