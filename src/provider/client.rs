//! Ollama implementation of the model gateway.
//!
//! Contains [`OllamaClient`], which speaks Ollama's native HTTP API:
//! streamed `/api/chat` turns with tool definitions, streamed
//! `/api/generate` completions with an optional JSON-schema `format`, and
//! the model lifecycle calls (pre-load, unload, list).

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::resolve::ModelSelection;
use super::stream::ndjson_stream;
use super::{ChatDelta, ChatStream, GatewayError, GenerateChunk, GenerateStream, ModelGateway};
use crate::config::Config;
use crate::message::{Message, ToolCall};
use crate::tools::ToolDefinition;

/// A configured Ollama backend bound to one model.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    keep_alive: Option<String>,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

/// One line of a streamed `/api/chat` response.
#[derive(Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<ChatLineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatLineMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

impl ChatLine {
    fn into_delta(self) -> Result<ChatDelta, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::Backend(error));
        }
        let (content, tool_calls) = self
            .message
            .map(|m| (m.content, m.tool_calls))
            .unwrap_or_default();
        Ok(ChatDelta {
            content,
            tool_calls,
            done: self.done,
        })
    }
}

/// One line of a streamed `/api/generate` response.
#[derive(Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl GenerateLine {
    fn into_chunk(self) -> Result<GenerateChunk, GatewayError> {
        match self.error {
            Some(error) => Err(GatewayError::Backend(error)),
            None => Ok(GenerateChunk {
                response: self.response,
                done: self.done,
            }),
        }
    }
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            keep_alive: None,
        }
    }

    /// Creates a client from the loaded config and the resolved model.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Self {
        let mut client = Self::new(config.ollama_base_url(), selection.model.clone());
        client.keep_alive = config.ollama.keep_alive.clone();
        client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `body` and fails on any non-success status.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Loads the model into the backend's memory ahead of the first turn.
    pub async fn load_model(&self) -> Result<(), GatewayError> {
        let body = json!({ "model": self.model });
        let reply: Value = self.post("/api/generate", &body).await?.json().await?;
        if reply["done"].as_bool() == Some(true) {
            tracing::debug!(model = %self.model, "model loaded");
            Ok(())
        } else {
            Err(GatewayError::Backend(format!("could not load model {}", self.model)))
        }
    }

    /// Evicts the model from the backend's memory.
    pub async fn unload_model(&self) -> Result<(), GatewayError> {
        let body = json!({ "model": self.model, "keep_alive": 0 });
        let reply: Value = self.post("/api/generate", &body).await?.json().await?;
        if reply["done"].as_bool() == Some(true) {
            tracing::debug!(model = %self.model, "model unloaded");
            Ok(())
        } else {
            Err(GatewayError::Backend(format!("could not unload model {}", self.model)))
        }
    }

    /// Names of the models installed on the backend.
    pub async fn local_models(&self) -> Result<Vec<String>, GatewayError> {
        let response = self.http.get(self.url("/api/tags")).send().await?;
        let resp: Value = response.json().await?;
        let models = resp["models"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["name"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }
}

#[async_trait]
impl ModelGateway for OllamaClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatStream, GatewayError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools: tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
            stream: true,
            keep_alive: self.keep_alive.as_deref(),
        };
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "opening chat turn"
        );
        let response = self.post("/api/chat", &request).await?;
        Ok(ndjson_stream::<ChatLine>(response)
            .map(|line| line.and_then(ChatLine::into_delta))
            .boxed())
    }

    async fn generate(
        &self,
        prompt: &str,
        format: Option<&Value>,
    ) -> Result<GenerateStream, GatewayError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
            format,
            keep_alive: self.keep_alive.as_deref(),
        };
        tracing::debug!(model = %self.model, structured = format.is_some(), "opening completion");
        let response = self.post("/api/generate", &request).await?;
        Ok(ndjson_stream::<GenerateLine>(response)
            .map(|line| line.and_then(GenerateLine::into_chunk))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_line_with_tool_calls() {
        let line: ChatLine = serde_json::from_str(
            r#"{"model":"llama3.2","created_at":"2025-01-01T00:00:00Z",
                "message":{"role":"assistant","content":"",
                "tool_calls":[{"function":{"name":"write_todos","arguments":{"requirements":["a"]}}}]},
                "done":false}"#,
        )
        .unwrap();
        let delta = line.into_delta().unwrap();
        assert!(!delta.done);
        assert_eq!(delta.tool_calls.len(), 1);
        assert_eq!(delta.tool_calls[0].name(), "write_todos");
    }

    #[test]
    fn test_error_line_becomes_backend_error() {
        let line: ChatLine = serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert!(matches!(line.into_delta(), Err(GatewayError::Backend(msg)) if msg == "model not found"));
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![Message::user("hi")];
        let tools = vec![ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: json!({"type": "object"}),
        }];
        let request = ChatRequest {
            model: "llama3.2",
            messages: &messages,
            tools: tools
                .iter()
                .map(|function| WireTool {
                    kind: "function",
                    function,
                })
                .collect(),
            stream: true,
            keep_alive: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "read_file");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("keep_alive").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2");
        assert_eq!(client.url("/api/chat"), "http://localhost:11434/api/chat");
    }
}
