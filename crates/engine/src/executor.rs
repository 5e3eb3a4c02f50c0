//! Single-pattern execution: load, assemble, converse.

use std::path::Path;
use std::sync::Arc;

use patternrun_core::error::Result;
use patternrun_core::provider::Provider;
use patternrun_core::tool::ToolRegistry;
use tracing::{debug, info};

use crate::conversation::{ConversationEngine, Execution};
use crate::pattern::Pattern;
use crate::prompt::assemble_system_prompt;
use crate::protocol::ToolCallProtocol;

/// Runs patterns against one backend with one worker registry.
#[derive(Clone)]
pub struct PatternExecutor {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
}

impl PatternExecutor {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute the pattern at `path` on `input`.
    ///
    /// Only workers that are both in `allowed` and registered are advertised
    /// or dispatched. The pattern is validated before any backend call.
    pub async fn execute<S: AsRef<str>>(
        &self,
        path: &Path,
        input: &str,
        model: &str,
        allowed: &[S],
    ) -> Result<Execution> {
        info!(pattern = %path.display(), model, "Executing pattern");

        let pattern = Pattern::load(path).await?;
        let protocol = ToolCallProtocol::new(&self.registry, allowed);
        let system_prompt = assemble_system_prompt(&pattern, protocol.tools())?;
        let workers: Vec<&str> = protocol.tools().iter().map(|t| t.name()).collect();
        debug!(?workers, "Permitted workers");
        debug!("System prompt:\n{system_prompt}");

        ConversationEngine::new(self.provider.clone(), model)
            .run(system_prompt, input, &protocol, pattern.output_instructions())
            .await
    }

    /// Like [`execute`](Self::execute), returning only the final output.
    pub async fn execute_text<S: AsRef<str>>(
        &self,
        path: &Path,
        input: &str,
        model: &str,
        allowed: &[S],
    ) -> Result<String> {
        Ok(self.execute(path, input, model, allowed).await?.output)
    }

    /// Models the backend can serve.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.provider.list_models().await?)
    }
}
