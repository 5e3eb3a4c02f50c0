//! `patternrun run`: Execute a pattern or a pipeline of patterns.

use std::path::{Path, PathBuf};

use patternrun_config::AppConfig;
use patternrun_engine::Pipeline;
use tracing::{debug, info};

use super::build_executor;

pub struct RunArgs {
    pub patterns: Vec<PathBuf>,
    pub input: String,
    pub model: Option<String>,
    pub allowed_workers: Vec<String>,
}

pub async fn run(config: &AppConfig, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input = resolve_input(&args.input)?;
    let model = args.model.unwrap_or_else(|| config.default_model.clone());
    let allowed = if args.allowed_workers.is_empty() {
        config.allowed_workers.clone()
    } else {
        args.allowed_workers
    };

    let executor = build_executor(config)?;
    for name in &allowed {
        if !executor.registry().contains(name) {
            tracing::warn!(worker = %name, "Allowed worker is not registered and will be ignored");
        }
    }
    debug!(model = %model, workers = ?allowed, "Run settings");

    let output = match args.patterns.as_slice() {
        [single] => executor.execute_text(single, &input, &model, &allowed).await?,
        many => {
            info!(stages = many.len(), "Running pipeline");
            Pipeline::new(executor)
                .run(many, &input, &model, &allowed)
                .await?
        }
    };

    println!("{output}");
    Ok(())
}

/// `--input` names a file when one exists at that path; otherwise it is the text itself.
fn resolve_input(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    let path = Path::new(input);
    if path.is_file() {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read input file {}: {e}", path.display()))?;
        Ok(text)
    } else {
        Ok(input.to_string())
    }
}
