//! Interactive chat REPL for revue.
//!
//! Each line the human enters is appended to the agent's ledger, then the
//! control loop is re-invoked until it hands control back. Uses
//! [`rustyline`] for line editing and persistent history.

mod commands;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use crate::agent::{Agent, AgentSettings, ControlState};
use crate::config::Config;
use crate::format;
use crate::message::Role;
use crate::output::{Renderer, StdoutRenderer};
use crate::provider::{ModelSelection, OllamaClient};
use crate::session::{short_id, Session, SessionStore};
use crate::tools::ToolRegistry;

/// Runs the control loop until it returns [`ControlState::UserControl`] or
/// `max_turns` consecutive agent turns have run.
///
/// The session, when given, is synced after every turn so a crash loses at
/// most the turn in flight.
pub(crate) async fn drive(
    agent: &mut Agent,
    mut session: Option<&mut Session>,
    max_turns: usize,
    renderer: &mut dyn Renderer,
) -> Result<ControlState> {
    if let Some(session) = session.as_deref_mut() {
        session.sync(agent.messages(), agent.todos(), agent.plan_created())?;
    }

    let mut turns = 0;
    loop {
        let state = agent.step(renderer).await;
        if let Some(session) = session.as_deref_mut() {
            session.sync(agent.messages(), agent.todos(), agent.plan_created())?;
        }
        let state = state?;
        turns += 1;

        if state == ControlState::UserControl {
            return Ok(state);
        }
        if turns >= max_turns {
            tracing::warn!(turns, "agent turn limit reached");
            renderer.render_notice(&format!(
                "Paused after {turns} agent turns; send a message to continue."
            ));
            return Ok(ControlState::UserControl);
        }
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit")
}

/// Runs the interactive chat REPL.
///
/// # Readline behavior
///
/// - **Ctrl+C**: cancels current input, stays in REPL
/// - **Ctrl+D** or `exit`: leaves the REPL
/// - Readline history is persisted to `~/.cache/revue/chat_history.txt`
pub async fn run_chat(
    config: Config,
    session_id: Option<String>,
    selection: &ModelSelection,
) -> Result<()> {
    let client = Arc::new(OllamaClient::from_config(&config, selection));
    let project_root = std::env::current_dir()?;
    let store = SessionStore::open_default()?;
    let settings = AgentSettings::from_config(&config);
    let registry = ToolRegistry::with_builtins(project_root, &config.tools);

    // Create or resume session
    let (mut session, mut agent) = if let Some(ref id) = session_id {
        let s = store.load(id)?;
        println!(
            "{} [session: {}] [model: {}]",
            "resuming".bold().cyan(),
            short_id(&s.id).yellow(),
            s.model.yellow(),
        );
        println!();
        for msg in s.messages.iter().filter(|m| m.role != Role::System) {
            println!("{}", format::format_message(msg));
            println!();
        }
        let agent = Agent::resume(
            client.clone(),
            registry,
            settings,
            s.messages.clone(),
            s.state.todos.clone(),
            s.state.plan_created,
        );
        (s, agent)
    } else {
        let s = store.create(client.model())?;
        println!(
            "{} [session: {}] [model: {}] (exit or Ctrl+D to quit)",
            "revue chat".bold().cyan(),
            short_id(&s.id).yellow(),
            client.model().yellow(),
        );
        println!();
        (s, Agent::new(client.clone(), registry, settings))
    };

    if let Err(e) = client.load_model().await {
        tracing::warn!(error = %e, "could not pre-load model");
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }

    // Set up readline with persistent history
    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    let mut renderer = StdoutRenderer::new();
    loop {
        let readline = rl.readline(&format!("{} ", ">".green().bold()));

        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if is_exit(&line) {
                    println!("{}", "goodbye.".dimmed());
                    break;
                }

                if line.starts_with('/') {
                    match commands::handle_slash_command(&line, &agent) {
                        commands::CommandAction::Continue => continue,
                        commands::CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                            continue;
                        }
                    }
                }

                let _ = rl.add_history_entry(&line);
                agent.add_user_message(line);
                println!();

                if let Err(e) = drive(
                    &mut agent,
                    Some(&mut session),
                    config.max_agent_turns(),
                    &mut renderer,
                )
                .await
                {
                    renderer.render_error(&format!("{e:#}"));
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    // Save readline history
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    if config.unload_on_exit() {
        if let Err(e) = client.unload_model().await {
            tracing::warn!(error = %e, "could not unload model");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingRenderer;
    use crate::provider::mock::{call, ScriptedGateway};
    use serde_json::json;

    fn agent(gateway: &Arc<ScriptedGateway>) -> Agent {
        Agent::new(gateway.clone(), ToolRegistry::new(), AgentSettings::default())
    }

    #[tokio::test]
    async fn test_drive_runs_until_user_control() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway
            .push_decision(true, 0.9)
            .push_calls(vec![call("write_todos", json!({"requirements": ["a"]}))])
            .push_calls(vec![call("update_todo", json!({"todo_id": 0, "new_status": true}))]);
        let mut agent = agent(&gateway);
        agent.add_user_message("review this repo");

        let mut renderer = RecordingRenderer::default();
        let state = drive(&mut agent, None, 50, &mut renderer).await.unwrap();
        assert_eq!(state, ControlState::UserControl);
        assert!(agent.todos().is_complete());
        assert_eq!(gateway.chat_count(), 2);
    }

    #[tokio::test]
    async fn test_drive_stops_at_turn_limit() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway
            .push_decision(true, 0.9)
            .push_calls(vec![call("read_file", json!({}))])
            .push_calls(vec![call("read_file", json!({}))]);
        let mut agent = agent(&gateway);
        agent.add_user_message("review this repo");

        let mut renderer = RecordingRenderer::default();
        let state = drive(&mut agent, None, 2, &mut renderer).await.unwrap();
        assert_eq!(state, ControlState::UserControl);
        assert_eq!(gateway.chat_count(), 2);
        assert!(renderer.notices.last().unwrap().starts_with("Paused after 2"));
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("quit"));
        assert!(!is_exit("exit please"));
    }
}
