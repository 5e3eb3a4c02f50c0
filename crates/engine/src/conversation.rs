//! The conversation state machine for one pattern execution.
//!
//! ```text
//! Init -> FirstResponse -> ToolResolution? -> Refinement? -> Done
//! ```
//!
//! `ToolResolution` runs only when at least one worker is permitted, and
//! re-prompts only when the first reply actually contained directives: all
//! outcomes go back in a single digest turn. `Refinement` runs only when the
//! pattern has output instructions. A run therefore makes at most three
//! backend calls.

use std::fmt;
use std::sync::Arc;

use patternrun_core::error::Result;
use patternrun_core::message::Transcript;
use patternrun_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

use crate::protocol::{ToolCallOutcome, ToolCallProtocol, format_digest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    FirstResponse,
    ToolResolution,
    Refinement,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::FirstResponse => "first_response",
            Stage::ToolResolution => "tool_resolution",
            Stage::Refinement => "refinement",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The final output text
    pub output: String,

    /// The full transcript, system turn first
    pub transcript: Transcript,

    /// Outcomes of the tool-resolution pass, in directive order
    pub outcomes: Vec<ToolCallOutcome>,

    /// Number of backend round trips made
    pub backend_calls: usize,

    /// Stages visited, in order
    pub stages: Vec<Stage>,
}

/// Drives one conversation against a generation backend.
pub struct ConversationEngine {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ConversationEngine {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Run the conversation to completion.
    ///
    /// Backend failures abort the run. Worker failures never do: they reach
    /// the model through the digest.
    pub async fn run(
        &self,
        system_prompt: String,
        input: &str,
        protocol: &ToolCallProtocol,
        output_instructions: Option<&str>,
    ) -> Result<Execution> {
        let mut run = Run {
            transcript: Transcript::new(system_prompt),
            outcomes: Vec::new(),
            backend_calls: 0,
            stages: vec![Stage::Init],
        };
        debug!(
            transcript = %run.transcript.id(),
            input_len = input.len(),
            "Starting conversation"
        );

        // Init -> FirstResponse
        run.enter(Stage::FirstResponse);
        run.transcript.push_user(input);
        let mut output = self.generate(&mut run).await?;

        // -> ToolResolution
        if protocol.is_enabled() {
            run.enter(Stage::ToolResolution);
            let outcomes = protocol.resolve(&output).await;
            if outcomes.is_empty() {
                debug!("No worker directives in response, skipping re-prompt");
            } else {
                let failed = outcomes.iter().filter(|o| !o.is_success()).count();
                info!(calls = outcomes.len(), failed, "Resolved worker directives");
                run.transcript.push_user(format_digest(&outcomes));
                run.outcomes = outcomes;
                output = self.generate(&mut run).await?;
            }
        }

        // -> Refinement
        if let Some(instructions) = output_instructions {
            run.enter(Stage::Refinement);
            run.transcript.push_user(instructions);
            output = self.generate(&mut run).await?;
        }

        run.enter(Stage::Done);
        info!(
            transcript = %run.transcript.id(),
            backend_calls = run.backend_calls,
            "Conversation complete"
        );

        Ok(Execution {
            output,
            transcript: run.transcript,
            outcomes: run.outcomes,
            backend_calls: run.backend_calls,
            stages: run.stages,
        })
    }

    /// One backend round trip over the whole transcript; appends the reply.
    async fn generate(&self, run: &mut Run) -> Result<String> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: run.transcript.messages().to_vec(),
        };

        run.backend_calls += 1;
        let response = self.provider.complete(request).await?;

        if !response.decode_failures.is_empty() {
            warn!(
                provider = self.provider.name(),
                skipped = response.decode_failures.len(),
                "Backend stream contained undecodable lines"
            );
        }
        debug!(model = %response.model, len = response.content.len(), "Assistant response");

        run.transcript.push_assistant(response.content.clone());
        Ok(response.content)
    }
}

/// Mutable state of a run in progress.
struct Run {
    transcript: Transcript,
    outcomes: Vec<ToolCallOutcome>,
    backend_calls: usize,
    stages: Vec<Stage>,
}

impl Run {
    fn enter(&mut self, stage: Stage) {
        info!(transcript = %self.transcript.id(), %stage, "Entering stage");
        self.stages.push(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use patternrun_core::error::{Error, ProviderError};
    use patternrun_core::message::Role;
    use patternrun_core::tool::ToolRegistry;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(StaticTool::new("weather_api", serde_json::json!({"temp_C": "9"}))))
            .with(Arc::new(FailingTool::new("cve_lookup", "catalog offline")))
            .with(Arc::new(PanickingTool::new("sentiment_analysis")))
    }

    fn roles(transcript: &Transcript) -> Vec<Role> {
        transcript.messages().iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn single_turn_without_tools_or_instructions() {
        let provider = Arc::new(SequentialMockProvider::texts(&["answer"]));
        let engine = ConversationEngine::new(provider.clone(), "m");

        let run = engine
            .run("sys".into(), "input", &ToolCallProtocol::default(), None)
            .await
            .unwrap();

        assert_eq!(run.output, "answer");
        assert_eq!(run.backend_calls, 1);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(roles(&run.transcript), vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(run.stages, vec![Stage::Init, Stage::FirstResponse, Stage::Done]);
    }

    #[tokio::test]
    async fn directives_are_ignored_when_no_worker_is_permitted() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"[[WORKER: {"name": "weather_api", "args": {"location": "Oslo"}}]]"#,
        ]));
        let engine = ConversationEngine::new(provider.clone(), "m");
        let protocol = ToolCallProtocol::new(&registry(), &[] as &[&str]);

        let run = engine.run("sys".into(), "in", &protocol, None).await.unwrap();
        assert_eq!(run.backend_calls, 1);
        assert!(run.outcomes.is_empty());
        assert!(!run.stages.contains(&Stage::ToolResolution));
    }

    #[tokio::test]
    async fn no_directives_skips_the_reprompt() {
        let provider = Arc::new(SequentialMockProvider::texts(&["plain answer"]));
        let engine = ConversationEngine::new(provider.clone(), "m");
        let protocol = ToolCallProtocol::new(&registry(), &["weather_api"]);

        let run = engine.run("sys".into(), "in", &protocol, None).await.unwrap();
        assert_eq!(run.output, "plain answer");
        assert_eq!(run.backend_calls, 1);
        assert!(run.stages.contains(&Stage::ToolResolution));
    }

    #[tokio::test]
    async fn tool_outcomes_are_batched_into_one_digest_turn() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            concat!(
                r#"[[WORKER: {"name": "weather_api", "args": {"location": "Oslo"}}]]"#,
                r#"[[WORKER: {"name": "cve_lookup", "args": {"cve_list": "CVE-1"}}]]"#,
                r#"[[WORKER: {"name": "sentiment_analysis", "args": {"text": "x"}}]]"#,
            ),
            "final with data",
        ]));
        let engine = ConversationEngine::new(provider.clone(), "m");
        let protocol = ToolCallProtocol::new(
            &registry(),
            &["weather_api", "cve_lookup", "sentiment_analysis"],
        );

        let run = engine.run("sys".into(), "in", &protocol, None).await.unwrap();

        assert_eq!(run.output, "final with data");
        assert_eq!(run.backend_calls, 2);
        assert_eq!(run.outcomes.len(), 3);
        assert!(run.outcomes[0].is_success());
        assert!(!run.outcomes[1].is_success());
        assert!(!run.outcomes[2].is_success());

        let second = &provider.requests()[1];
        let digest = &second.messages.last().unwrap().content;
        assert_eq!(second.messages.len(), 4);
        assert!(digest.contains("[[WORKER_RESPONSE]]\nWorker: weather_api"));
        assert!(digest.contains("catalog offline"));
        assert!(digest.contains("worker panicked"));
        assert_eq!(
            roles(&run.transcript),
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn refinement_turn_carries_output_instructions() {
        let provider = Arc::new(SequentialMockProvider::texts(&["draft", "polished"]));
        let engine = ConversationEngine::new(provider.clone(), "m");

        let run = engine
            .run("sys".into(), "in", &ToolCallProtocol::default(), Some("Use bullet points.\n"))
            .await
            .unwrap();

        assert_eq!(run.output, "polished");
        assert_eq!(run.backend_calls, 2);
        let refine = &provider.requests()[1];
        assert_eq!(refine.messages.last().unwrap().content, "Use bullet points.\n");
        assert_eq!(refine.messages[2].content, "draft");
        assert_eq!(run.stages.last(), Some(&Stage::Done));
    }

    #[tokio::test]
    async fn full_run_makes_at_most_three_calls() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"[[WORKER: {"name": "weather_api", "args": {"location": "Oslo"}}]] and [[WORKER: {"name": "weather_api", "args": {"location": "Bergen"}}]]"#,
            "with data",
            "refined",
        ]));
        let engine = ConversationEngine::new(provider.clone(), "m");
        let protocol = ToolCallProtocol::new(&registry(), &["weather_api"]);

        let run = engine
            .run("sys".into(), "in", &protocol, Some("Be brief."))
            .await
            .unwrap();

        assert_eq!(run.output, "refined");
        assert_eq!(run.backend_calls, 3);
        assert_eq!(run.transcript.len(), 7);
        assert_eq!(
            run.stages,
            vec![
                Stage::Init,
                Stage::FirstResponse,
                Stage::ToolResolution,
                Stage::Refinement,
                Stage::Done
            ]
        );
    }

    #[tokio::test]
    async fn requests_use_the_configured_model() {
        let provider = Arc::new(SequentialMockProvider::texts(&["ok"]));
        let engine = ConversationEngine::new(provider.clone(), "llama3.1:8b");
        engine
            .run("sys".into(), "in", &ToolCallProtocol::default(), None)
            .await
            .unwrap();
        assert_eq!(provider.requests()[0].model, "llama3.1:8b");
    }

    #[tokio::test]
    async fn backend_failure_aborts_the_run() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_text_response("draft")),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
        ]));
        let engine = ConversationEngine::new(provider.clone(), "m");

        let err = engine
            .run("sys".into(), "in", &ToolCallProtocol::default(), Some("refine"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert_eq!(provider.call_count(), 2);
    }
}
