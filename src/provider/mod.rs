//! Model gateway abstraction for revue.
//!
//! The control loop talks to the model only through [`ModelGateway`]: a
//! streamed chat turn over the conversation ledger, and a streamed
//! (optionally schema-constrained) completion. [`OllamaClient`] is the
//! production implementation.

mod client;
mod listing;
#[cfg(test)]
pub mod mock;
mod resolve;
mod stream;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;

use crate::message::{Message, ToolCall};
use crate::tools::ToolDefinition;

pub use client::OllamaClient;
pub use listing::list_models;
pub use resolve::{resolve_model, ModelSelection};

/// One increment of a streamed chat turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatDelta {
    /// Content text to append, possibly empty.
    pub content: String,
    /// Tool calls carried by this chunk, in arrival order.
    pub tool_calls: Vec<ToolCall>,
    /// Set on the final chunk of the turn.
    pub done: bool,
}

/// One increment of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateChunk {
    pub response: String,
    pub done: bool,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatDelta, GatewayError>> + Send>>;
pub type GenerateStream = Pin<Box<dyn Stream<Item = Result<GenerateChunk, GatewayError>> + Send>>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to model backend failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode model backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("model backend error: {0}")]
    Backend(String),
}

/// A backend able to stream model turns.
///
/// Implementations must deliver chunks in the order the backend produced
/// them; callers concatenate content and tool calls in arrival order.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Streams one assistant turn over `messages`, offering `tools`.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatStream, GatewayError>;

    /// Streams a completion for `prompt`. When `format` is given the backend
    /// is asked to constrain its output to that JSON schema.
    async fn generate(
        &self,
        prompt: &str,
        format: Option<&Value>,
    ) -> Result<GenerateStream, GatewayError>;
}
