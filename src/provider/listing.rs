//! Model listing and discovery.
//!
//! Queries the Ollama backend for installed models and marks the one that
//! would be selected. Isolates display concerns from the gateway itself.

use anyhow::Result;
use colored::Colorize;

use super::client::OllamaClient;
use super::resolve::resolve_model;
use crate::config::Config;

/// List the models installed on the configured backend.
pub async fn list_models(config: &Config) -> Result<()> {
    let selection = resolve_model(None, config);
    let client = OllamaClient::from_config(config, &selection);

    println!("Models at {}:\n", client.base_url().dimmed());

    match client.local_models().await {
        Ok(models) if models.is_empty() => {
            println!("  (no models found -- run `ollama pull {}`)", selection.model);
        }
        Ok(models) => {
            for model in &models {
                let marker = if *model == selection.model { " (selected)" } else { "" };
                println!("  {model}{marker}");
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "model listing failed");
            println!("  (ollama not reachable)");
        }
    }

    Ok(())
}
