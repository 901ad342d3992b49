//! Slash command handlers for the chat REPL.
//!
//! Dispatches `/todos`, `/history` and `/help`. Commands only read agent
//! state; the plan changes only through the model's tool calls.

use colored::Colorize;

use crate::agent::Agent;
use crate::format;
use crate::message::Role;

/// Action returned by slash command handling.
pub(crate) enum CommandAction {
    /// Command was handled successfully; continue the REPL loop.
    Continue,
    /// Unknown command was entered.
    Unknown(String),
}

pub(crate) fn handle_slash_command(command: &str, agent: &Agent) -> CommandAction {
    match command {
        "/todos" => {
            println!("{}", "Plan:".bold());
            println!("{}", format::format_todos(agent.todos()));
            CommandAction::Continue
        }
        "/history" => {
            for msg in agent.messages().iter().filter(|m| m.role != Role::System) {
                println!("{}", format::format_message(msg));
                println!();
            }
            CommandAction::Continue
        }
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - show the current plan", "/todos".cyan());
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - exit", "exit or Ctrl+D".cyan());
            CommandAction::Continue
        }
        _ => CommandAction::Unknown(command.to_string()),
    }
}
