//! Environment variable substitution and effective-value accessors.

use super::types::Config;

use crate::constants::{
    DEFAULT_INSTRUCTIONS, DEFAULT_MAX_AGENT_TURNS, DEFAULT_MAX_RETRIES, DEFAULT_RELEVANCE_THRESHOLD,
    OLLAMA_DEFAULT_BASE_URL, OLLAMA_HOST_ENV,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.model = Self::resolve_str(&self.model);
        if let Some(ref mut sp) = self.system_prompt {
            *sp = Self::resolve_str(sp);
        }
        if let Some(ref mut url) = self.ollama.base_url {
            *url = Self::resolve_str(url);
        }
        if let Some(ref mut keep_alive) = self.ollama.keep_alive {
            *keep_alive = Self::resolve_str(keep_alive);
        }
        if let Some(ref mut file) = self.tools.review_file {
            *file = Self::resolve_str(file);
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Get the model name from config.
    /// Returns None if the model is the compile-time default (meaning user hasn't configured it).
    pub fn model_name(&self) -> Option<String> {
        if self.model.is_empty() || self.model == crate::constants::DEFAULT_MODEL {
            return None;
        }
        Some(self.model.clone())
    }

    /// Ollama server URL: `OLLAMA_HOST`, then config, then the local default.
    pub fn ollama_base_url(&self) -> String {
        std::env::var(OLLAMA_HOST_ENV)
            .ok()
            .filter(|host| !host.trim().is_empty())
            .map(|host| normalize_host(&host))
            .or_else(|| self.ollama.base_url.clone().filter(|url| !url.is_empty()))
            .unwrap_or_else(|| OLLAMA_DEFAULT_BASE_URL.to_string())
    }

    pub fn unload_on_exit(&self) -> bool {
        self.ollama.unload_on_exit.unwrap_or(false)
    }

    /// Instructions that open every session.
    pub fn instructions(&self) -> String {
        self.system_prompt
            .clone()
            .filter(|sp| !sp.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string())
    }

    pub fn max_retries(&self) -> u32 {
        self.agent.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Relevance threshold, clamped to [0, 1].
    pub fn relevance_threshold(&self) -> f64 {
        self.agent
            .relevance_threshold
            .unwrap_or(DEFAULT_RELEVANCE_THRESHOLD)
            .clamp(0.0, 1.0)
    }

    pub fn max_agent_turns(&self) -> usize {
        self.agent.max_agent_turns.unwrap_or(DEFAULT_MAX_AGENT_TURNS).max(1)
    }
}

/// `OLLAMA_HOST` is often given without a scheme (`0.0.0.0:11434`).
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
