//! Command-line interface definition and dispatch for revue.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; session operations live in the [`session`] submodule.

mod session;

use crate::agent::{Agent, AgentSettings};
use crate::output::{Renderer, StdoutRenderer};
use crate::session::SessionStore;
use crate::tools::ToolRegistry;
use crate::{chat, config, provider};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;

/// Top-level CLI structure for revue.
#[derive(Parser)]
#[command(name = "revue", about = "A code-review agent for local models", version)]
pub struct Cli {
    /// Log control-loop decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the revue CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Run one review request to completion
    Run {
        /// The request, e.g. "review the src directory"
        prompt: Vec<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Start an interactive chat session
    Chat {
        /// Resume a specific session (supports partial IDs)
        #[arg(short, long)]
        session: Option<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List models installed on the Ollama server
    Models,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config
    Show,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// List all sessions
    List,
    /// Resume a session by ID (supports partial IDs)
    Resume {
        id: String,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Delete a session by ID (supports partial IDs)
    Delete { id: String },
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { prompt, model } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: revue run \"review this repo\"");
            }
            let config = config::Config::load()?;
            let selection = provider::resolve_model(model.as_deref(), &config);
            run_once(&config, &selection, &prompt).await
        }
        Commands::Chat { session, model } => {
            let config = config::Config::load()?;
            let selection = provider::resolve_model(model.as_deref(), &config);
            let session = match session {
                Some(partial) => Some(SessionStore::open_default()?.resolve_id(&partial)?),
                None => None,
            };
            chat::run_chat(config, session, &selection).await
        }
        Commands::Models => {
            let config = config::Config::load()?;
            provider::list_models(&config).await
        }
        Commands::Config { action } => {
            let config = config::Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = config::Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!("{} {}", "Ollama:".bold(), config.ollama_base_url());
                    println!();
                    let toml_str = toml::to_string_pretty(&config)?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
        Commands::Session { action } => session::handle_session(action).await,
    }
}

/// `revue run`: one request, driven until the agent hands control back.
async fn run_once(
    config: &config::Config,
    selection: &provider::ModelSelection,
    prompt: &str,
) -> Result<()> {
    println!("{} [model: {}]", "revue".bold().cyan(), selection.model.yellow());
    println!();
    println!("{} {}", ">".green().bold(), prompt);
    println!();

    let client = Arc::new(provider::OllamaClient::from_config(config, selection));
    let registry = ToolRegistry::with_builtins(std::env::current_dir()?, &config.tools);
    let mut agent = Agent::new(client.clone(), registry, AgentSettings::from_config(config));
    let mut session = SessionStore::open_default()?.create(client.model())?;

    agent.add_user_message(prompt);
    let mut renderer = StdoutRenderer::new();
    let outcome = chat::drive(&mut agent, Some(&mut session), config.max_agent_turns(), &mut renderer).await;

    if config.unload_on_exit() {
        if let Err(e) = client.unload_model().await {
            tracing::warn!(error = %e, "could not unload model");
        }
    }
    if let Err(e) = outcome {
        renderer.render_error(&format!("{e:#}"));
        return Err(e);
    }

    if !agent.todos().is_empty() {
        println!("{}", "Plan:".bold());
        println!("{}", crate::format::format_todos(agent.todos()));
    }
    println!();
    println!(
        "{} Resume with: {}",
        "session saved.".dimmed(),
        format!("revue session resume {}", crate::session::short_id(&session.id)).cyan()
    );
    Ok(())
}
