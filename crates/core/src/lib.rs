//! # patternrun core
//!
//! Domain types, traits, and error definitions shared by every patternrun crate.
//! This crate has **no transport dependencies**: it defines the model that the
//! backend, worker, and engine crates implement against.
//!
//! - [`Transcript`]: the append-only conversation owned by one pattern execution
//! - [`Provider`]: the generation backend seam
//! - [`Tool`] / [`ToolRegistry`]: workers the model may invoke mid-conversation

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role, Transcript, TranscriptId};
pub use provider::{LineDecodeFailure, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolArgs, ToolRegistry};
