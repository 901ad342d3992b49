//! Session management CLI operations for revue.
//!
//! Handles listing, resuming, and deleting sessions through the
//! `revue session` subcommand family, with table-formatted output and
//! partial session ID matching.

use anyhow::Result;
use colored::Colorize;

use super::SessionAction;
use crate::session::{short_id, SessionMeta, SessionStore};
use crate::{chat, config, provider};

/// Dispatches a session subcommand to its handler.
pub(crate) async fn handle_session(action: SessionAction) -> Result<()> {
    let store = SessionStore::open_default()?;
    match action {
        SessionAction::List => session_list(&store),
        SessionAction::Resume { id, model } => {
            let config = config::Config::load()?;
            let selection = provider::resolve_model(model.as_deref(), &config);
            let full_id = store.resolve_id(&id)?;
            chat::run_chat(config, Some(full_id), &selection).await
        }
        SessionAction::Delete { id } => {
            let full_id = store.resolve_id(&id)?;
            session_delete(&store, &full_id)
        }
    }
}

/// "YYYY-MM-DD HH:MM" from an RFC 3339 timestamp.
fn format_updated(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.chars().take(16).collect())
}

fn fit(title: &str, width: usize) -> String {
    if title.chars().count() > width {
        let truncated: String = title.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        title.to_string()
    }
}

/// Lists all saved sessions in a table sized to the terminal.
pub(crate) fn session_list(store: &SessionStore) -> Result<()> {
    let mut sessions: Vec<SessionMeta> = store.list()?;
    if sessions.is_empty() {
        println!("{}", "No sessions found.".dimmed());
        println!("Start one with: {}", "revue chat".cyan());
        return Ok(());
    }
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);
    // ID=10, MSGS=6, UPDATED=18, MODEL~20
    let fixed_cols = 10 + 6 + 18 + 20;
    let title_width = term_width.saturating_sub(fixed_cols).clamp(10, 50);

    // Pad first, then colorize to avoid ANSI escape code width issues
    println!(
        "{} {} {} {} {}",
        format!("{:<10}", "ID").bold(),
        format!("{:<tw$}", "TITLE", tw = title_width).bold(),
        format!("{:<6}", "MSGS").bold(),
        format!("{:<18}", "UPDATED").bold(),
        "MODEL".bold(),
    );
    println!("{}", "-".repeat(term_width.min(fixed_cols + title_width + 4)));

    for s in &sessions {
        let title = fit(s.title.as_deref().unwrap_or("(untitled)"), title_width);
        println!(
            "{} {} {} {} {}",
            format!("{:<10}", short_id(&s.id)).cyan(),
            format!("{:<tw$}", title, tw = title_width),
            format!("{:<6}", s.message_count).yellow(),
            format!("{:<18}", format_updated(&s.updated_at)).dimmed(),
            s.model.dimmed(),
        );
    }
    println!();
    println!(
        "{} {} sessions. Resume with: {}",
        "total:".dimmed(),
        sessions.len(),
        "revue session resume <id>".cyan()
    );
    Ok(())
}

/// Deletes a session by its full ID.
pub(crate) fn session_delete(store: &SessionStore, id: &str) -> Result<()> {
    let sessions = store.list()?;
    let meta = sessions
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| anyhow::anyhow!("Session not found: {}", id))?;
    let title = meta.title.as_deref().unwrap_or("(untitled)");
    println!("Deleting session {} (\"{}\")", short_id(id).cyan(), title);
    store.delete(id)?;
    println!("{}", "Deleted.".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_updated() {
        assert_eq!(format_updated("2025-03-01T09:15:00+00:00"), "2025-03-01 09:15");
        assert_eq!(format_updated("not a date at all, clearly"), "not a date at all");
    }

    #[test]
    fn test_fit_truncates_long_titles() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a very long session title", 10), "a very ...");
    }
}
