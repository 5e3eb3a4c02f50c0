//! The pattern execution engine.
//!
//! A run goes through five steps:
//!
//! 1. **Parse** the pattern document into sections ([`Pattern`])
//! 2. **Assemble** the system prompt from identity, steps and permitted workers
//! 3. **Generate** the first reply for the input text
//! 4. **Resolve** any worker directives in that reply and send one digest back
//! 5. **Refine** with the pattern's output instructions, when it has them
//!
//! [`Pipeline`] chains runs so each output becomes the next input.

pub mod conversation;
pub mod executor;
pub mod pattern;
pub mod pipeline;
pub mod prompt;
pub mod protocol;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use conversation::{ConversationEngine, Execution, Stage};
pub use executor::PatternExecutor;
pub use pattern::{Pattern, Section};
pub use pipeline::Pipeline;
pub use prompt::{assemble_system_prompt, render_steps};
pub use protocol::{
    Directive, ToolCallOutcome, ToolCallProtocol, ToolCallRequest, format_digest, scan_directives,
};
