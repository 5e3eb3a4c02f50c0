//! Error types for the patternrun domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Backend and pattern-loading failures abort an execution; tool failures
//! never leave the tool-call protocol (they become failure outcomes).

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all patternrun operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Pattern loading ---
    #[error("Pattern not found at {path}: {reason}")]
    PatternNotFound { path: PathBuf, reason: String },

    #[error("Pattern is missing required section '# {section}'")]
    MissingRequiredSection { section: String },

    // --- Generation backend ---
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] ProviderError),

    // --- Pipeline ---
    #[error("Stage {index} ({pattern}) failed: {source}")]
    Stage {
        index: usize,
        pattern: PathBuf,
        #[source]
        source: Box<Error>,
    },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Worker '{0}' not found or not allowed")]
    NotFoundOrNotAllowed(String),

    #[error("Malformed worker directive: {0}")]
    MalformedDirective(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid worker arguments: {0}")]
    InvalidArguments(String),
}
