//! Decoder for newline-delimited JSON chat streams.
//!
//! The backend answers a chat request with one JSON object per line, each
//! optionally carrying a `message.content` fragment. The decoder is fed raw
//! byte chunks as they arrive (chunk boundaries may fall anywhere, including
//! inside a UTF-8 sequence), concatenates the content fragments in arrival
//! order, and records every line it could not decode instead of dropping it
//! silently.

use patternrun_core::provider::{LineDecodeFailure, Usage};
use serde::Deserialize;

/// Accumulates a streamed chat response.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    line_number: usize,
    content: String,
    model: Option<String>,
    done: bool,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    backend_error: Option<String>,
    failures: Vec<LineDecodeFailure>,
}

/// The typed result of a fully consumed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChat {
    /// All content fragments, concatenated in arrival order
    pub content: String,

    /// Model name reported by the backend, if any line carried one
    pub model: Option<String>,

    /// Whether a line with `"done": true` was seen
    pub done: bool,

    pub usage: Option<Usage>,

    /// An `{"error": ...}` line emitted by the backend mid-stream
    pub backend_error: Option<String>,

    /// Lines that were not valid JSON chunks
    pub failures: Vec<LineDecodeFailure>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of raw bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1]);
        }
    }

    /// Flush any unterminated trailing line and return the result.
    pub fn finish(mut self) -> DecodedChat {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.decode_line(&rest);
        }

        let usage = match (self.prompt_tokens, self.completion_tokens) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt = prompt.unwrap_or(0);
                let completion = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt.saturating_add(completion),
                })
            }
        };

        DecodedChat {
            content: self.content,
            model: self.model,
            done: self.done,
            usage,
            backend_error: self.backend_error,
            failures: self.failures,
        }
    }

    fn decode_line(&mut self, raw: &[u8]) {
        self.line_number += 1;

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                self.record_failure(String::from_utf8_lossy(raw).into_owned(), e.to_string());
                return;
            }
        };
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<ChatChunk>(line) {
            Ok(chunk) => {
                if let Some(content) = chunk.message.and_then(|m| m.content) {
                    self.content.push_str(&content);
                }
                if chunk.model.is_some() {
                    self.model = chunk.model;
                }
                if chunk.prompt_eval_count.is_some() {
                    self.prompt_tokens = chunk.prompt_eval_count;
                }
                if chunk.eval_count.is_some() {
                    self.completion_tokens = chunk.eval_count;
                }
                if let Some(error) = chunk.error {
                    self.backend_error = Some(error);
                }
                self.done |= chunk.done;
            }
            Err(e) => self.record_failure(line.to_string(), e.to_string()),
        }
    }

    fn record_failure(&mut self, line: String, reason: String) {
        self.failures.push(LineDecodeFailure {
            line_number: self.line_number,
            line,
            reason,
        });
    }
}
