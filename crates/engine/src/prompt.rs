//! System prompt assembly.

use std::sync::Arc;

use patternrun_core::error::Result;
use patternrun_core::tool::Tool;

use crate::pattern::Pattern;

const STEPS_HEADER: &str = "Follow these steps:\n";

const DIRECTIVE_USAGE: &str = "To use a worker, include [[WORKER: {\"name\": \"worker_name\", \"args\": {\"arg_name\": \"value\"}}]] in your response. \
Argument values must be strings. You may include several directives in one response; \
their results will be sent back to you in a single message.";

/// Build the system prompt for a pattern and the workers it may use.
///
/// Deterministic in its inputs. `tools` is advertised in the order given;
/// an empty slice leaves the worker catalog out entirely.
pub fn assemble_system_prompt(pattern: &Pattern, tools: &[Arc<dyn Tool>]) -> Result<String> {
    let mut prompt = format!("{}\n\n", pattern.identity()?);
    prompt.push_str(STEPS_HEADER);
    prompt.push_str(&render_steps(pattern.steps()?));

    if !tools.is_empty() {
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        prompt.push_str(&format!("\n\nAvailable workers: {}", names.join(", ")));
        prompt.push('\n');
        prompt.push_str(DIRECTIVE_USAGE);

        let details: Vec<String> = tools
            .iter()
            .map(|t| format!("{}:\n{}", t.name(), t.documentation()))
            .collect();
        prompt.push_str(&format!("\n\nWorker Details:\n{}", details.join("\n")));
    }

    Ok(prompt)
}

/// Renumber the `- ` bullet lines of a STEPS body; other lines are ignored.
pub fn render_steps(steps: &str) -> String {
    steps
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
