//! Built-in worker implementations for patternrun.
//!
//! Workers are what a pattern may call out to mid-conversation: look up
//! known-exploited CVEs, score the sentiment of a passage, or fetch the
//! current weather for a place.
//!
//! Each worker is registered explicitly by [`default_registry`]; nothing is
//! discovered at runtime.

pub mod cve_lookup;
pub mod sentiment_analysis;
pub mod weather_api;

use std::sync::Arc;
use std::time::Duration;
use patternrun_config::WorkersConfig;
use patternrun_core::tool::ToolRegistry;

pub use cve_lookup::CveLookupTool;
pub use sentiment_analysis::SentimentAnalysisTool;
pub use weather_api::WeatherApiTool;

/// Create the registry of built-in workers.
///
/// Registration order is the order workers are advertised in prompts.
pub fn default_registry(config: &WorkersConfig) -> ToolRegistry {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client for workers: {e}");
            reqwest::Client::new()
        });

    ToolRegistry::new()
        .with(Arc::new(CveLookupTool::new(client.clone(), &config.cve_catalog_url)))
        .with(Arc::new(SentimentAnalysisTool))
        .with(Arc::new(WeatherApiTool::new(client, &config.weather_base_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_workers_in_order() {
        let registry = default_registry(&WorkersConfig::default());
        assert_eq!(
            registry.names(),
            vec!["cve_lookup", "sentiment_analysis", "weather_api"]
        );
    }

    #[test]
    fn every_worker_documents_its_directive() {
        let registry = default_registry(&WorkersConfig::default());
        for tool in registry.iter() {
            let doc = tool.documentation();
            assert!(doc.contains("[[WORKER:"), "{} lacks an example directive", tool.name());
            assert!(doc.contains(tool.name()));
        }
    }
}
