//! Planning tools bound to the session's to-do ledger.
//!
//! These are not [`Tool`](super::Tool) implementations: they mutate state
//! owned by the dispatcher, so they are resolved through [`TodoOp`] instead.

use anyhow::Result;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{input_schema, ToolDefinition};
use crate::todo::TodoLedger;

pub const WRITE_TODOS: &str = "write_todos";
pub const UPDATE_TODO: &str = "update_todo";
pub const REMOVE_TODO: &str = "remove_todo";

/// One of the to-do operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoOp {
    Write,
    Update,
    Remove,
}

#[derive(Deserialize, JsonSchema)]
struct WriteTodosInput {
    /// Requirements to add to the plan, one per to-do item, in the order they should be done
    requirements: Vec<String>,
}

#[derive(Deserialize, JsonSchema)]
struct UpdateTodoInput {
    /// Position of the to-do item in the list, starting at 0
    todo_id: usize,
    /// true marks the item complete, false marks it incomplete
    new_status: bool,
}

#[derive(Deserialize, JsonSchema)]
struct RemoveTodoInput {
    /// Position of the to-do item in the list, starting at 0. Later items shift down by one.
    todo_id: usize,
}

impl TodoOp {
    pub const ALL: [TodoOp; 3] = [TodoOp::Write, TodoOp::Update, TodoOp::Remove];

    pub fn name(self) -> &'static str {
        match self {
            TodoOp::Write => WRITE_TODOS,
            TodoOp::Update => UPDATE_TODO,
            TodoOp::Remove => REMOVE_TODO,
        }
    }

    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            TodoOp::Write => (
                "Create the review plan: add one or more requirements to the to-do list. \
                 This must be called before any other tool.",
                input_schema::<WriteTodosInput>(),
            ),
            TodoOp::Update => (
                "Mark a to-do item complete or incomplete by its position.",
                input_schema::<UpdateTodoInput>(),
            ),
            TodoOp::Remove => (
                "Remove a to-do item by its position.",
                input_schema::<RemoveTodoInput>(),
            ),
        };
        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Applies the operation to `todos` and describes the new plan.
    pub fn apply(self, todos: &mut TodoLedger, arguments: &Map<String, Value>) -> Result<String> {
        match self {
            TodoOp::Write => {
                let input: WriteTodosInput = parse_arguments(self, arguments)?;
                let added = todos.append(input.requirements)?;
                Ok(format!("Added {added} to-do items.\n{}", todos.render()))
            }
            TodoOp::Update => {
                let input: UpdateTodoInput = parse_arguments(self, arguments)?;
                let item = todos.set_status(input.todo_id, input.new_status)?;
                let state = if item.is_complete { "complete" } else { "incomplete" };
                let line = format!("Marked item {} as {state}: {}", input.todo_id, item.requirement);
                Ok(format!("{line}\n{}", todos.render()))
            }
            TodoOp::Remove => {
                let input: RemoveTodoInput = parse_arguments(self, arguments)?;
                let removed = todos.remove(input.todo_id)?;
                Ok(format!(
                    "Removed item {}: {}\n{}",
                    input.todo_id,
                    removed.requirement,
                    todos.render()
                ))
            }
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(op: TodoOp, arguments: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| anyhow::anyhow!("Invalid arguments for {}: {}", op.name(), e))
}
