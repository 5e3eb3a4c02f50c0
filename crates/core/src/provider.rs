//! Provider trait: the abstraction over generation backends.
//!
//! A Provider takes the full transcript, runs one chat completion, and hands
//! back the complete assistant text. Streaming, if the backend does it, is
//! consumed to completion inside the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen2.5:7b", "llama3.1:8b")
    pub model: String,

    /// The full transcript so far, system turn first
    pub messages: Vec<Message>,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The concatenated assistant text
    pub content: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics, when the backend reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Stream lines that could not be decoded and were left out of `content`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decode_failures: Vec<LineDecodeFailure>,
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One undecodable line of a newline-delimited response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDecodeFailure {
    /// 1-based line number within the stream
    pub line_number: usize,

    /// The raw line text
    pub line: String,

    /// Why it failed to decode
    pub reason: String,
}

/// The core Provider trait.
///
/// The conversation engine calls `complete()` without knowing which backend
/// is behind it, which is also how the tests substitute scripted backends.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send the transcript and get the complete assistant response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Whether the backend is reachable.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
