//! `patternrun models`: List models served by the backend.

use patternrun_config::AppConfig;

use super::build_executor;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let executor = build_executor(config)?;
    let models = executor.list_models().await?;

    println!("🤖 Available models ({})", config.api_base_url);
    if models.is_empty() {
        println!("   (none; pull one with `ollama pull {}`)", config.default_model);
    }
    for model in &models {
        let marker = if *model == config.default_model { " (default)" } else { "" };
        println!("- {model}{marker}");
    }
    Ok(())
}
