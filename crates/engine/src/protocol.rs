//! The inline worker-call protocol.
//!
//! Models request workers by embedding directives in their replies:
//!
//! ```text
//! [[WORKER: {"name": "weather_api", "args": {"location": "London"}}]]
//! ```
//!
//! One pass over a reply scans every directive, dispatches the well-formed
//! ones to permitted workers, and turns each occurrence into exactly one
//! [`ToolCallOutcome`]. Nothing here returns an error to the caller: parse
//! failures, unknown workers and worker errors (panics included) all become
//! `Failure` outcomes so the conversation can carry on.

use std::any::Any;
use std::ops::Range;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use patternrun_core::error::ToolError;
use patternrun_core::tool::{Tool, ToolArgs, ToolRegistry};
use serde_json::Value;
use tracing::{debug, warn};

pub const DIRECTIVE_OPEN: &str = "[[WORKER:";
pub const DIRECTIVE_CLOSE: &str = "]]";

/// Name reported when a malformed directive has no recoverable worker name.
pub const UNKNOWN_WORKER: &str = "unknown";

/// A well-formed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub name: String,
    pub args: ToolArgs,

    /// Byte range of the whole directive in the scanned text
    pub span: Range<usize>,
}

/// One scanned directive occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Request(ToolCallRequest),
    Malformed {
        name: String,
        reason: String,
        span: Range<usize>,
    },
}

impl Directive {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Directive::Request(request) => &request.span,
            Directive::Malformed { span, .. } => span,
        }
    }
}

/// The result of one directive.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    Success {
        name: String,
        args: ToolArgs,
        /// Worker output serialized as JSON text
        output: String,
    },
    Failure {
        name: String,
        /// `None` when the directive could not be parsed
        args: Option<ToolArgs>,
        error: ToolError,
    },
}

impl ToolCallOutcome {
    pub fn name(&self) -> &str {
        match self {
            ToolCallOutcome::Success { name, .. } | ToolCallOutcome::Failure { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolCallOutcome::Success { .. })
    }
}

// --- Scanning ---

/// Find every directive in `text`, in order of occurrence.
///
/// Spans never overlap. After a malformed directive, scanning resumes past
/// the next `]]` or at the next opening tag, whichever comes first. With
/// neither, it resumes just past the opening tag.
pub fn scan_directives(text: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(DIRECTIVE_OPEN) {
        let start = cursor + found;
        let payload_start = skip_whitespace(text, start + DIRECTIVE_OPEN.len());

        let directive = match read_payload(text, payload_start) {
            Ok((payload, payload_end)) => {
                let close = skip_whitespace(text, payload_end);
                if text[close..].starts_with(DIRECTIVE_CLOSE) {
                    let span = start..close + DIRECTIVE_CLOSE.len();
                    decode_payload(payload, span)
                } else {
                    malformed(text, start, payload_start, "expected `]]` after the payload".into())
                }
            }
            Err(reason) => malformed(text, start, payload_start, reason),
        };

        cursor = directive.span().end;
        directives.push(directive);
    }

    directives
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start().len())
}

/// Read one JSON value starting at `from`; returns it with its end offset.
fn read_payload(text: &str, from: usize) -> Result<(Value, usize), String> {
    let mut stream = serde_json::Deserializer::from_str(&text[from..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok((value, from + stream.byte_offset())),
        Some(Err(e)) => Err(format!("payload is not valid JSON: {e}")),
        None => Err("directive has no payload".into()),
    }
}

/// A malformed directive never reaches past the next opening tag, so the
/// directive after it is still scanned.
fn malformed(text: &str, start: usize, payload_start: usize, reason: String) -> Directive {
    let rest = &text[payload_start..];
    let next_open = rest.find(DIRECTIVE_OPEN);
    let close = rest.find(DIRECTIVE_CLOSE);

    let (fragment, end) = match (close, next_open) {
        (Some(close), Some(open)) if open < close => (&rest[..open], payload_start + open),
        (Some(close), _) => (&rest[..close], payload_start + close + DIRECTIVE_CLOSE.len()),
        (None, Some(open)) => (&rest[..open], payload_start + open),
        (None, None) => ("", start + DIRECTIVE_OPEN.len()),
    };
    Directive::Malformed {
        name: salvage_name(fragment).unwrap_or_else(|| UNKNOWN_WORKER.to_string()),
        reason,
        span: start..end,
    }
}

/// Best-effort worker name from a payload that failed to parse.
///
/// Looks for a `"name": "..."` pair first, then a bare leading identifier
/// (`[[WORKER:weather_api, location="London"]]`).
fn salvage_name(fragment: &str) -> Option<String> {
    if let Some(key) = fragment.find("\"name\"") {
        let rest = fragment[key + "\"name\"".len()..].trim_start();
        let rest = rest.strip_prefix(':')?.trim_start();
        let rest = rest.strip_prefix('"')?;
        let name = &rest[..rest.find('"')?];
        return (!name.is_empty()).then(|| name.to_string());
    }

    let ident: String = fragment
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!ident.is_empty()).then_some(ident)
}

fn decode_payload(payload: Value, span: Range<usize>) -> Directive {
    let salvaged = payload
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    match parse_request(payload) {
        Ok((name, args)) => Directive::Request(ToolCallRequest { name, args, span }),
        Err(reason) => Directive::Malformed {
            name: salvaged.unwrap_or_else(|| UNKNOWN_WORKER.to_string()),
            reason,
            span,
        },
    }
}

fn parse_request(payload: Value) -> Result<(String, ToolArgs), String> {
    let Value::Object(mut fields) = payload else {
        return Err("payload must be a JSON object".into());
    };

    let name = match fields.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::String(_)) => return Err("'name' must not be empty".into()),
        Some(_) => return Err("'name' must be a string".into()),
        None => return Err("payload has no 'name'".into()),
    };

    let mut args = ToolArgs::new();
    match fields.remove("args") {
        None => {}
        Some(Value::Object(map)) => {
            for (key, value) in map {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err(format!("argument '{key}' must be a string")),
                };
                args.insert(key, value);
            }
        }
        Some(_) => return Err("'args' must be an object".into()),
    }

    Ok((name, args))
}

// --- Dispatch ---

/// Dispatches directives to the workers permitted for one execution.
#[derive(Clone, Default)]
pub struct ToolCallProtocol {
    permitted: Vec<Arc<dyn Tool>>,
}

impl ToolCallProtocol {
    /// Permit the workers in `allowed` that the registry knows, in registry order.
    pub fn new<S: AsRef<str>>(registry: &ToolRegistry, allowed: &[S]) -> Self {
        Self {
            permitted: registry.permitted(allowed),
        }
    }

    /// Workers advertised to the model and eligible for dispatch.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.permitted
    }

    pub fn is_enabled(&self) -> bool {
        !self.permitted.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.permitted.iter().find(|t| t.name() == name).cloned()
    }

    /// Scan `text` and resolve every directive in it.
    ///
    /// Workers run concurrently; outcomes come back in directive order.
    pub async fn resolve(&self, text: &str) -> Vec<ToolCallOutcome> {
        let calls = scan_directives(text)
            .into_iter()
            .map(|directive| self.dispatch(directive));
        join_all(calls).await
    }

    async fn dispatch(&self, directive: Directive) -> ToolCallOutcome {
        let request = match directive {
            Directive::Request(request) => request,
            Directive::Malformed { name, reason, .. } => {
                warn!(tool = %name, %reason, "Malformed worker directive");
                return ToolCallOutcome::Failure {
                    name,
                    args: None,
                    error: ToolError::MalformedDirective(reason),
                };
            }
        };

        let Some(tool) = self.lookup(&request.name) else {
            warn!(tool = %request.name, "Worker not found or not allowed");
            return ToolCallOutcome::Failure {
                error: ToolError::NotFoundOrNotAllowed(request.name.clone()),
                name: request.name,
                args: Some(request.args),
            };
        };

        debug!(tool = %request.name, args = ?request.args, "Executing worker");
        let result = AssertUnwindSafe(tool.execute(request.args.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(ToolError::ExecutionFailed {
                    tool_name: request.name.clone(),
                    reason: format!("worker panicked: {}", panic_message(payload.as_ref())),
                })
            });

        match result {
            Ok(output) => {
                debug!(tool = %request.name, "Worker succeeded");
                ToolCallOutcome::Success {
                    name: request.name,
                    args: request.args,
                    output: output.to_string(),
                }
            }
            Err(error) => {
                warn!(tool = %request.name, %error, "Worker failed");
                ToolCallOutcome::Failure {
                    name: request.name,
                    args: Some(request.args),
                    error,
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// --- Digest ---

/// Format outcomes as the user turn sent back to the model.
pub fn format_digest(outcomes: &[ToolCallOutcome]) -> String {
    outcomes
        .iter()
        .map(format_outcome)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_outcome(outcome: &ToolCallOutcome) -> String {
    match outcome {
        ToolCallOutcome::Success { name, args, output } => format!(
            "[[WORKER_RESPONSE]]\nWorker: {name}\nArguments: {}\nOutput: {output}\n[[/WORKER_RESPONSE]]",
            args_json(args)
        ),
        ToolCallOutcome::Failure { name, error, .. } => {
            format!("[[WORKER_ERROR]]\nWorker: {name}\nError: {error}\n[[/WORKER_ERROR]]")
        }
    }
}

fn args_json(args: &ToolArgs) -> String {
    Value::Object(
        args.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
    .to_string()
}
