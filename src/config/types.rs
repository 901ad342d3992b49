//! Struct definitions and serde defaults for revue configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IGNORE_NAMES, DEFAULT_REVIEW_FILE};

/// Root configuration for revue, deserialized from `config.toml`.
///
/// Fields use serde defaults so revue can run with sensible defaults
/// when no config file exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default model identifier (e.g. `"llama3.2:latest"`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Ollama connection settings.
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Instructions that open every session. Falls back to the built-in reviewer prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Control-loop limits.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Built-in tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Returns the default model identifier.
///
/// Used by serde's `#[serde(default)]` attribute during deserialization.
pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    /// Server URL. `OLLAMA_HOST` takes precedence when set.
    pub base_url: Option<String>,
    /// How long the server keeps the model loaded after a request (e.g. `"10m"`).
    pub keep_alive: Option<String>,
    /// Evict the model from memory when a chat session ends.
    pub unload_on_exit: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Failed attempts per operation before control returns to the human.
    pub max_retries: Option<u32>,
    /// Confidence a request must exceed to be acted on.
    pub relevance_threshold: Option<f64>,
    /// Consecutive agent turns allowed before the REPL takes control back.
    pub max_agent_turns: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ToolsConfig {
    /// Regexes of entry names `explore_structure` always skips.
    pub ignore_names: Option<Vec<String>>,
    /// File `write_review` writes to when the model does not name one.
    pub review_file: Option<String>,
}

impl ToolsConfig {
    pub fn ignore_names(&self) -> Vec<String> {
        self.ignore_names
            .clone()
            .unwrap_or_else(|| DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect())
    }

    pub fn review_file(&self) -> String {
        self.review_file
            .clone()
            .unwrap_or_else(|| DEFAULT_REVIEW_FILE.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama: OllamaConfig::default(),
            system_prompt: None,
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}
