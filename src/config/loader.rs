//! File loading and merging for revue configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{default_model, AgentConfig, Config, OllamaConfig, ToolsConfig};

/// Written on first run so the available keys are discoverable.
pub(super) fn default_toml() -> String {
    format!(
        r#"model = "{}"

[ollama]
base_url = "{}"
# keep_alive = "10m"
unload_on_exit = false

[agent]
max_retries = {}
relevance_threshold = {}
max_agent_turns = {}

[tools]
review_file = "{}"
"#,
        default_model(),
        crate::constants::OLLAMA_DEFAULT_BASE_URL,
        crate::constants::DEFAULT_MAX_RETRIES,
        crate::constants::DEFAULT_RELEVANCE_THRESHOLD,
        crate::constants::DEFAULT_MAX_AGENT_TURNS,
        crate::constants::DEFAULT_REVIEW_FILE,
    )
}

impl Config {
    /// Loads the global config from `~/.config/revue/config.toml`.
    ///
    /// If no config file exists, creates one with defaults and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config =
                toml::from_str(&default_toml).context("Failed to parse default config")?;
            return Ok(config);
        }
        Self::load_file(&path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Look for revue.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "project config found");
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            ollama: OllamaConfig {
                base_url: project.ollama.base_url.or(global.ollama.base_url),
                keep_alive: project.ollama.keep_alive.or(global.ollama.keep_alive),
                unload_on_exit: project.ollama.unload_on_exit.or(global.ollama.unload_on_exit),
            },
            system_prompt: project.system_prompt.or(global.system_prompt),
            agent: AgentConfig {
                max_retries: project.agent.max_retries.or(global.agent.max_retries),
                relevance_threshold: project
                    .agent
                    .relevance_threshold
                    .or(global.agent.relevance_threshold),
                max_agent_turns: project.agent.max_agent_turns.or(global.agent.max_agent_turns),
            },
            tools: ToolsConfig {
                ignore_names: project.tools.ignore_names.or(global.tools.ignore_names),
                review_file: project.tools.review_file.or(global.tools.review_file),
            },
        }
    }
}
