//! Generation backend implementations for patternrun.
//!
//! All providers implement the `patternrun_core::Provider` trait.
//! [`build_from_config`] wires the configured backend.

pub mod ndjson;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;
use patternrun_config::AppConfig;
use patternrun_core::error::ProviderError;
use patternrun_core::provider::Provider;

pub use ndjson::{DecodedChat, NdjsonDecoder};
pub use ollama::OllamaProvider;

/// Build the generation backend from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let timeout = match config.request_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let provider = OllamaProvider::new(&config.api_base_url, timeout)?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ollama_from_defaults() {
        let provider = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn zero_timeout_still_builds() {
        let config = AppConfig {
            request_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_ok());
    }
}
