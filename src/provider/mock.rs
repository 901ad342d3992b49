//! Scripted in-memory gateway for tests.
//!
//! Each `chat` call pops the next scripted turn; each `generate` call pops the
//! next scripted completion. Calls are counted and the messages seen by each
//! chat turn are recorded.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde_json::{Map, Value};

use super::{ChatDelta, ChatStream, GatewayError, GenerateChunk, GenerateStream, ModelGateway};
use crate::message::{Message, ToolCall};
use crate::tools::ToolDefinition;

#[derive(Default)]
pub struct ScriptedGateway {
    turns: Mutex<VecDeque<Vec<ChatDelta>>>,
    completions: Mutex<VecDeque<String>>,
    chat_calls: Mutex<Vec<ChatCall>>,
    generate_calls: Mutex<usize>,
}

/// What one chat call was given.
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Builds a tool call from a JSON object literal.
pub fn call(name: &str, arguments: Value) -> ToolCall {
    let arguments = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    ToolCall::new(name, arguments)
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a turn streamed as the given deltas.
    pub fn push_turn(&self, deltas: Vec<ChatDelta>) -> &Self {
        self.turns.lock().unwrap().push_back(deltas);
        self
    }

    /// Queues a turn with plain content and no tool calls.
    pub fn push_text(&self, text: &str) -> &Self {
        self.push_turn(vec![ChatDelta {
            content: text.to_string(),
            tool_calls: Vec::new(),
            done: true,
        }])
    }

    /// Queues a turn requesting the given tool calls.
    pub fn push_calls(&self, calls: Vec<ToolCall>) -> &Self {
        self.push_turn(vec![ChatDelta {
            content: String::new(),
            tool_calls: calls,
            done: true,
        }])
    }

    /// Queues a relevance decision (or any completion text).
    pub fn push_completion(&self, text: &str) -> &Self {
        self.completions.lock().unwrap().push_back(text.to_string());
        self
    }

    pub fn push_decision(&self, should_do: bool, confidence: f64) -> &Self {
        self.push_completion(&format!(
            r#"{{"should_do": {should_do}, "confidence": {confidence}}}"#
        ))
    }

    pub fn chat_calls(&self) -> Vec<ChatCall> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn chat_count(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
    }

    pub fn generate_count(&self) -> usize {
        *self.generate_calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatStream, GatewayError> {
        self.chat_calls.lock().unwrap().push(ChatCall {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        let deltas = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Backend("no scripted turn left".into()))?;
        Ok(stream::iter(deltas.into_iter().map(Ok)).boxed())
    }

    async fn generate(
        &self,
        _prompt: &str,
        _format: Option<&Value>,
    ) -> Result<GenerateStream, GatewayError> {
        *self.generate_calls.lock().unwrap() += 1;
        let text = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::Backend("no scripted completion left".into()))?;
        // Split so callers have to concatenate fragments.
        let mid = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
        let (head, tail) = text.split_at(mid);
        let chunks = vec![
            Ok(GenerateChunk {
                response: head.to_string(),
                done: false,
            }),
            Ok(GenerateChunk {
                response: tail.to_string(),
                done: true,
            }),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}
