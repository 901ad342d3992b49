use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{input_schema, Tool};
use crate::constants::{BINARY_DETECTION_BYTES, READ_FILE_MAX_SIZE};

pub struct ReadFileTool {
    /// Project root directory. Paths are resolved relative to this.
    project_root: PathBuf,
}

impl ReadFileTool {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }
}

/// Resolve an existing path and check that it stays within the project root.
pub(super) fn resolve_existing(project_root: &Path, path: &str) -> Result<PathBuf> {
    let resolved = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        project_root.join(path)
    };
    let canonical = resolved
        .canonicalize()
        .with_context(|| format!("No such file or directory: {path}"))?;
    let root_canonical = project_root.canonicalize()?;
    if !canonical.starts_with(&root_canonical) {
        anyhow::bail!("Path escapes project directory: {}", path);
    }
    Ok(canonical)
}

#[derive(Deserialize, JsonSchema)]
struct ReadFileInput {
    /// File path relative to the project root
    file_path: String,
}

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str { "read_file" }

    fn description(&self) -> &str {
        "Read the contents of a file. The path is relative to the project root."
    }

    fn schema(&self) -> Value {
        input_schema::<ReadFileInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ReadFileInput = serde_json::from_value(input)?;
        let path = resolve_existing(&self.project_root, &input.file_path)?;

        let metadata = std::fs::metadata(&path)?;
        if metadata.is_dir() {
            anyhow::bail!("{} is a directory, use explore_structure", input.file_path);
        }
        if metadata.len() > READ_FILE_MAX_SIZE {
            anyhow::bail!(
                "File too large: {} bytes (max {})",
                metadata.len(),
                READ_FILE_MAX_SIZE
            );
        }

        let content = std::fs::read(&path)?;
        let check_len = content.len().min(BINARY_DETECTION_BYTES);
        if content[..check_len].contains(&0) {
            anyhow::bail!("Binary file detected. Cannot display binary content.");
        }

        let text = String::from_utf8(content)
            .map_err(|_| anyhow::anyhow!("File is not valid UTF-8"))?;
        Ok(Value::String(text))
    }
}
