//! Subcommand implementations.

pub mod config_cmd;
pub mod doctor;
pub mod models;
pub mod run;
pub mod workers;

use std::sync::Arc;

use patternrun_config::AppConfig;
use patternrun_engine::PatternExecutor;

/// Build the executor the commands share: configured backend plus built-in workers.
pub fn build_executor(config: &AppConfig) -> Result<PatternExecutor, Box<dyn std::error::Error>> {
    let provider = patternrun_providers::build_from_config(config)
        .map_err(|e| format!("Failed to set up backend at {}: {e}", config.api_base_url))?;
    let registry = Arc::new(patternrun_tools::default_registry(&config.workers));
    Ok(PatternExecutor::new(provider, registry))
}
