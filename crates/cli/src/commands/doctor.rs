//! `patternrun doctor`: Diagnose configuration and backend health.

use patternrun_config::AppConfig;

use super::build_executor;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 patternrun doctor");
    println!("====================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid ({})", config_path.display());
            } else {
                println!("  ℹ️  No config file, using defaults");
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config before running patterns.");
            return Ok(());
        }
    };

    let executor = build_executor(&config)?;
    let provider = executor.provider();
    match provider.health_check().await {
        Ok(true) => println!("  ✅ Backend reachable at {}", config.api_base_url),
        Ok(false) => {
            println!("  ❌ Backend at {} answered with an error", config.api_base_url);
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Backend unreachable at {}: {e}", config.api_base_url);
            issues += 1;
        }
    }

    if issues == 0 {
        match provider.list_models().await {
            Ok(models) if models.iter().any(|m| *m == config.default_model) => {
                println!("  ✅ Default model '{}' is available", config.default_model);
            }
            Ok(_) => {
                println!(
                    "  ⚠️  Default model '{}' not found, run `ollama pull {}`",
                    config.default_model, config.default_model
                );
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Could not list models: {e}");
                issues += 1;
            }
        }
    }

    let registry = patternrun_tools::default_registry(&config.workers);
    println!("  ✅ {} workers registered", registry.len());
    for name in &config.allowed_workers {
        if !registry.contains(name) {
            println!("  ⚠️  allowed_workers lists unknown worker '{name}'");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
