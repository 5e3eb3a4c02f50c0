//! `patternrun workers`: List built-in workers and their documentation.

use patternrun_config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = patternrun_tools::default_registry(&config.workers);

    println!("🔧 Available workers:");
    for tool in registry.iter() {
        let allowed = config.allowed_workers.iter().any(|w| w == tool.name());
        let marker = if allowed { " (allowed by default)" } else { "" };
        println!("\n{}{marker}:", tool.name());
        println!("{}", tool.documentation());
    }
    Ok(())
}
