//! Terminal formatting for ledger entries, tool outcomes and the plan.

use colored::Colorize;
use serde_json::Value;

use crate::constants::TOOL_RESULT_PREVIEW_CHARS;
use crate::message::{Message, Role, ToolCall};
use crate::todo::TodoLedger;
use crate::tools::ToolResult;

/// Format a message for terminal display with role label and colors.
pub fn format_message(msg: &Message) -> String {
    let label = format_role_label(msg.role);
    let mut body = match msg.role {
        Role::User => msg.text().to_string(),
        Role::Assistant => render_code_blocks(msg.text()),
        Role::System | Role::Tool => preview(msg.text()).dimmed().to_string(),
    };
    for call in &msg.tool_calls {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&format!("  {} {}", "→".yellow(), describe_call(call)));
    }
    match (&msg.tool_name, msg.role) {
        (Some(tool), Role::Tool) => format!("{} {}\n{}", label, tool.yellow(), body),
        _ => format!("{}\n{}", label, body),
    }
}

fn format_role_label(role: Role) -> String {
    let label = format!("{role}:");
    match role {
        Role::User => label.green().bold().to_string(),
        Role::Assistant => label.cyan().bold().to_string(),
        Role::System => label.dimmed().to_string(),
        Role::Tool => label.yellow().to_string(),
    }
}

/// Dims fenced code blocks so prose and code are easy to tell apart.
pub fn render_code_blocks(text: &str) -> String {
    let mut in_code_block = false;
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            let lang = line.trim_start().trim_start_matches('`');
            if in_code_block && !lang.is_empty() {
                lines.push(format!("  {}", lang.dimmed()));
            }
            continue;
        }
        if in_code_block {
            lines.push(format!("  {}", line.dimmed()));
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// `name(arg=value, ...)`, with long values shortened.
pub fn describe_call(call: &ToolCall) -> String {
    let args: Vec<String> = call
        .function
        .arguments
        .iter()
        .map(|(key, value)| {
            let shown = match value {
                Value::String(s) => format!("{:?}", truncate(s, 40)),
                other => truncate(&other.to_string(), 40),
            };
            format!("{key}={shown}")
        })
        .collect();
    format!("{}({})", call.name().bold(), args.join(", "))
}

/// One line per dispatched call, plus a dimmed preview of what it returned.
pub fn format_tool_outcome(call: &ToolCall, result: &ToolResult) -> String {
    let shown = preview(result.text());
    let (mark, body) = if result.is_ok() {
        ("✓".green().to_string(), shown.dimmed().to_string())
    } else {
        ("✗".red().to_string(), shown.red().to_string())
    };
    let indented: Vec<String> = body.lines().map(|l| format!("    {l}")).collect();
    format!("  {} {}\n{}", mark, describe_call(call), indented.join("\n"))
}

/// The plan as a colored checklist.
pub fn format_todos(todos: &TodoLedger) -> String {
    if todos.is_empty() {
        return "(no plan yet)".dimmed().to_string();
    }
    let mut lines: Vec<String> = todos
        .all()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if item.is_complete {
                format!("  {} {}", format!("{i}. [x]").green(), item.requirement.dimmed())
            } else {
                format!("  {} {}", format!("{i}. [ ]").yellow(), item.requirement)
            }
        })
        .collect();
    let open = todos.incomplete().len();
    lines.push(format!("  {open} of {} open", todos.len()).dimmed().to_string());
    lines.join("\n")
}

fn preview(text: &str) -> String {
    let shown = truncate(text, TOOL_RESULT_PREVIEW_CHARS);
    if shown.len() < text.len() {
        format!("{shown}\n[{} more bytes]", text.len() - shown.len())
    } else {
        shown
    }
}

/// Shortens `text` to at most `max` characters, on a char boundary.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
