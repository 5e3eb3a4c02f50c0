//! patternrun CLI: the main entry point.
//!
//! Commands:
//! - `run`      Execute one pattern, or pipe several
//! - `models`   List models served by the backend
//! - `workers`  List built-in workers and their documentation
//! - `config`   Show the effective configuration or its path
//! - `doctor`   Diagnose configuration and backend reachability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use patternrun_config::{AppConfig, ConfigError};

mod commands;

#[derive(Parser)]
#[command(
    name = "patternrun",
    about = "patternrun: run markdown prompt patterns against a local model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pattern, or pipe several patterns in order
    Run {
        /// Path(s) to pattern file(s); several paths form a pipeline
        #[arg(required = true)]
        patterns: Vec<PathBuf>,

        /// Input text, or a path to a file containing it
        #[arg(short, long)]
        input: String,

        /// Model to use (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,

        /// Workers the model may call (defaults to the configured list)
        #[arg(short = 'w', long, num_args = 1.., value_delimiter = ',')]
        allowed_workers: Vec<String>,
    },

    /// List models available on the backend
    Models,

    /// List built-in workers and their documentation
    Workers,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration and backend health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli, AppConfig::load).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Run one command. `load` is only called by commands that need the config,
/// so `config path` and `doctor` still work when it is broken.
async fn dispatch(
    cli: Cli,
    load: impl Fn() -> Result<AppConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let verbose = cli.verbose;
    let configured = || -> Result<AppConfig, Box<dyn std::error::Error>> {
        let config = load().map_err(|e| format!("Failed to load config: {e}"))?;
        init_tracing(verbose, &config.log_level);
        Ok(config)
    };

    match cli.command {
        Commands::Run {
            patterns,
            input,
            model,
            allowed_workers,
        } => {
            let args = commands::run::RunArgs {
                patterns,
                input,
                model,
                allowed_workers,
            };
            commands::run::run(&configured()?, args).await
        }
        Commands::Models => commands::models::run(&configured()?).await,
        Commands::Workers => commands::workers::run(&configured()?).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => commands::config_cmd::show(&configured()?).await,
        Commands::Config {
            action: ConfigAction::Path,
        } => commands::config_cmd::path().await,
        Commands::Doctor => {
            init_tracing(verbose, "warn");
            commands::doctor::run().await
        }
    }
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(verbose: bool, level: &str) {
    let filter = if verbose { "debug" } else { level };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_several_patterns_and_workers() {
        let cli = Cli::try_parse_from([
            "patternrun",
            "run",
            "a.md",
            "b.md",
            "--input",
            "hello",
            "--allowed-workers",
            "weather_api,cve_lookup",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                patterns,
                input,
                model,
                allowed_workers,
            } => {
                assert_eq!(patterns, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
                assert_eq!(input, "hello");
                assert!(model.is_none());
                assert_eq!(allowed_workers, vec!["weather_api", "cve_lookup"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_a_pattern_and_input() {
        assert!(Cli::try_parse_from(["patternrun", "run", "--input", "x"]).is_err());
        assert!(Cli::try_parse_from(["patternrun", "run", "a.md"]).is_err());
    }

    fn broken_config() -> Result<AppConfig, ConfigError> {
        Err(ConfigError::ValidationError("log_level must be one of ...".into()))
    }

    #[tokio::test]
    async fn config_path_does_not_load_the_config() {
        let cli = Cli::try_parse_from(["patternrun", "config", "path"]).unwrap();
        let loads = std::cell::Cell::new(0);
        let result = dispatch(cli, || {
            loads.set(loads.get() + 1);
            broken_config()
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(loads.get(), 0);
    }

    #[tokio::test]
    async fn config_dependent_commands_report_a_broken_config() {
        for args in [
            &["patternrun", "models"][..],
            &["patternrun", "workers"][..],
            &["patternrun", "config", "show"][..],
            &["patternrun", "run", "a.md", "--input", "x"][..],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            let err = dispatch(cli, broken_config).await.unwrap_err();
            assert!(err.to_string().starts_with("Failed to load config"), "{args:?}");
        }
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::try_parse_from(["patternrun", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
