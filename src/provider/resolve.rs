//! Model resolution logic for revue.
//!
//! Resolves which model to use based on the CLI flag, the config file, and
//! the hardcoded default.

use crate::config::Config;
use crate::constants::DEFAULT_MODEL;

/// The resolved model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: String,
}

/// Resolve which model to use.
/// Priority: CLI flag > config.toml > default.
///
/// An `ollama/` prefix is accepted and stripped, so `--model ollama/llama3.2`
/// and `--model llama3.2` select the same model.
pub fn resolve_model(cli_model: Option<&str>, config: &Config) -> ModelSelection {
    let model = cli_model
        .map(String::from)
        .or_else(|| config.model_name())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let model = match model.split_once('/') {
        Some(("ollama", name)) => name.to_string(),
        _ => model,
    };

    ModelSelection { model }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flag_wins() {
        let mut config = Config::default();
        config.model = "qwen2.5-coder".into();
        assert_eq!(resolve_model(Some("mistral"), &config).model, "mistral");
    }

    #[test]
    fn test_config_then_default() {
        let mut config = Config::default();
        assert_eq!(resolve_model(None, &config).model, DEFAULT_MODEL);
        config.model = "qwen2.5-coder".into();
        assert_eq!(resolve_model(None, &config).model, "qwen2.5-coder");
    }

    #[test]
    fn test_provider_prefix_is_stripped() {
        let config = Config::default();
        assert_eq!(resolve_model(Some("ollama/llama3.2"), &config).model, "llama3.2");
        assert_eq!(
            resolve_model(Some("hf.co/org/model"), &config).model,
            "hf.co/org/model"
        );
    }
}
