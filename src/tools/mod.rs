pub mod dispatch;
pub mod explore_structure;
pub mod read_file;
pub mod todo_tools;
pub mod write_review;

use anyhow::Result;
use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ToolsConfig;
use explore_structure::ExploreStructureTool;
use read_file::ReadFileTool;
use write_review::WriteReviewTool;

pub use dispatch::ToolDispatcher;

/// The outcome of one dispatch. Exactly one of success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    Ok(String),
    Err(String),
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolResult::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        matches!(self, ToolResult::Err(_))
    }

    /// The text recorded in the ledger for this outcome.
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Ok(text) | ToolResult::Err(text) => text,
        }
    }

    /// Ledger form: failures are prefixed so the model can tell them apart.
    pub fn to_message_content(&self) -> String {
        match self {
            ToolResult::Ok(text) => text.clone(),
            ToolResult::Err(text) => format!("Error: {text}"),
        }
    }
}

/// Definition sent to the model so it knows what tools are available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema
}

/// Every external tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn schema(&self) -> Value;

    /// Execute the tool with the given JSON arguments.
    async fn execute(&self, input: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}

/// Parameter schema for an input struct, in the shape tool definitions use.
pub fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schema_for!(T))
        .unwrap_or_else(|_| json!({ "type": "object", "properties": {} }));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

/// Holds the external tools. Passed into the dispatcher at construction.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Called during startup.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(Arc::from(tool));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }
}

impl ToolRegistry {
    /// Create a registry with all built-in review tools.
    pub fn with_builtins(project_root: PathBuf, settings: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ReadFileTool::new(project_root.clone())));
        registry.register(Box::new(ExploreStructureTool::new(
            project_root.clone(),
            settings.ignore_names(),
        )));
        registry.register(Box::new(WriteReviewTool::new(
            project_root,
            settings.review_file(),
        )));
        registry
    }
}
