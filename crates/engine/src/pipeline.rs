//! Pattern chaining: each stage's output is the next stage's input.

use std::path::{Path, PathBuf};

use patternrun_core::error::{Error, Result};
use tracing::info;

use crate::executor::PatternExecutor;

/// A sequence of pattern executions sharing one executor.
pub struct Pipeline {
    executor: PatternExecutor,
}

impl Pipeline {
    pub fn new(executor: PatternExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &PatternExecutor {
        &self.executor
    }

    /// Run `paths` in order, starting from `input`; returns the last output.
    ///
    /// Each stage gets a fresh transcript; only the output text crosses
    /// stage boundaries. The first failing stage stops the pipeline and is
    /// reported as [`Error::Stage`].
    pub async fn run<P, S>(
        &self,
        paths: &[P],
        input: &str,
        model: &str,
        allowed: &[S],
    ) -> Result<String>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        if paths.is_empty() {
            return Err(Error::Config {
                message: "pipeline needs at least one pattern".into(),
            });
        }

        let mut current = input.to_string();
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            info!(stage = index + 1, of = paths.len(), pattern = %path.display(), "Pipeline stage");

            current = self
                .executor
                .execute_text(path, &current, model, allowed)
                .await
                .map_err(|source| Error::Stage {
                    index,
                    pattern: PathBuf::from(path),
                    source: Box::new(source),
                })?;
        }

        Ok(current)
    }
}
