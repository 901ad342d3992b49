//! Tool dispatch: resolves a requested tool name to a handler and runs it.
//!
//! The dispatch table is built once. To-do operations are bound to the
//! dispatcher's own [`TodoLedger`] and take precedence over external tools
//! of the same name. Every outcome, including unknown names, argument
//! errors and panics inside a tool, comes back as a [`ToolResult`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::Value;

use super::todo_tools::TodoOp;
use super::{Tool, ToolDefinition, ToolRegistry, ToolResult};
use crate::message::ToolCall;
use crate::todo::TodoLedger;

enum Handler {
    Todo(TodoOp),
    External(Arc<dyn Tool>),
}

/// One attempted call and what came of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub tool_name: String,
    pub result: ToolResult,
}

pub struct ToolDispatcher {
    table: HashMap<String, Handler>,
    definitions: Vec<ToolDefinition>,
    todos: TodoLedger,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, todos: TodoLedger) -> Self {
        let mut table = HashMap::new();
        let mut definitions = Vec::new();

        for op in TodoOp::ALL {
            table.insert(op.name().to_string(), Handler::Todo(op));
            definitions.push(op.definition());
        }
        for tool in registry.iter() {
            if table.contains_key(tool.name()) {
                tracing::warn!(tool = tool.name(), "external tool shadowed by a built-in, ignoring it");
                continue;
            }
            table.insert(tool.name().to_string(), Handler::External(Arc::clone(tool)));
            definitions.push(tool.definition());
        }

        Self {
            table,
            definitions,
            todos,
        }
    }

    pub fn todos(&self) -> &TodoLedger {
        &self.todos
    }

    /// Every tool the model may call.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Only the plan-creation tool, offered while no plan exists.
    pub fn planning_definitions(&self) -> Vec<ToolDefinition> {
        vec![TodoOp::Write.definition()]
    }

    /// Resolves and runs a single call.
    pub async fn dispatch(&mut self, call: &ToolCall) -> ToolResult {
        let name = call.name();
        let started = Instant::now();

        let result = match self.table.get(name) {
            None => ToolResult::Err(format!("tool does not exist: {name}")),
            Some(Handler::Todo(op)) => match op.apply(&mut self.todos, &call.function.arguments) {
                Ok(text) => ToolResult::Ok(text),
                Err(e) => ToolResult::Err(format!("{e:#}")),
            },
            Some(Handler::External(tool)) => {
                let tool = Arc::clone(tool);
                let input = Value::Object(call.function.arguments.clone());
                match AssertUnwindSafe(tool.execute(input)).catch_unwind().await {
                    Ok(Ok(value)) => ToolResult::Ok(normalize(value)),
                    Ok(Err(e)) => ToolResult::Err(format!("{e:#}")),
                    Err(panic) => ToolResult::Err(format!("tool {name} panicked: {}", panic_message(&*panic))),
                }
            }
        };

        tracing::info!(
            tool = name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "tool dispatched"
        );
        result
    }

    /// Runs `calls` strictly in order, stopping after the first failure.
    ///
    /// Calls after a failure are not attempted and produce no entry.
    pub async fn dispatch_batch(&mut self, calls: &[ToolCall]) -> Vec<Dispatched> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.dispatch(call).await;
            let failed = result.is_err();
            outcomes.push(Dispatched {
                tool_name: call.name().to_string(),
                result,
            });
            if failed {
                if outcomes.len() < calls.len() {
                    tracing::debug!(skipped = calls.len() - outcomes.len(), "batch stopped at first failure");
                }
                break;
            }
        }
        outcomes
    }
}

/// Text form of a tool's return value.
fn normalize(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        structured => serde_json::to_string_pretty(&structured).unwrap_or_else(|_| structured.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
