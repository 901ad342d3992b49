//! Write-review tool: saves the finished review, creating parent directories as needed.

use anyhow::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::{input_schema, Tool};

/// Tool that writes the review text to a file within the project root.
///
/// Path traversal outside the project root is rejected.
pub struct WriteReviewTool {
    project_root: PathBuf,
    /// Used when the model does not name a file.
    default_file: String,
}

impl WriteReviewTool {
    pub fn new(project_root: PathBuf, default_file: String) -> Self {
        Self {
            project_root,
            default_file,
        }
    }

    /// Resolve and validate that the path stays within the project root.
    ///
    /// The target file may not exist yet, so the *parent* directory is
    /// canonicalized instead of the file itself.
    fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let requested = Path::new(path);
        let root_canonical = self.project_root.canonicalize()?;
        // checked before any directory is created
        let escapes = requested.components().any(|c| c == Component::ParentDir)
            || (requested.is_absolute()
                && !requested.starts_with(&root_canonical)
                && !requested.starts_with(&self.project_root));
        if escapes {
            anyhow::bail!("Path escapes project directory: {}", path);
        }
        let resolved = self.project_root.join(requested);

        let parent = resolved
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Path has no parent directory: {}", path))?;
        fs::create_dir_all(parent)?;

        let parent_canonical = parent.canonicalize()?;
        if !parent_canonical.starts_with(&root_canonical) {
            anyhow::bail!("Path escapes project directory: {}", path);
        }

        let filename = resolved
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Path has no filename: {}", path))?;

        Ok(parent_canonical.join(filename))
    }
}

#[derive(Deserialize, JsonSchema)]
struct WriteReviewInput {
    /// The full review, in markdown
    review: String,
    /// File to write, relative to the project root
    #[serde(default)]
    file_to_write: Option<String>,
}

#[async_trait::async_trait]
impl Tool for WriteReviewTool {
    fn name(&self) -> &str {
        "write_review"
    }

    fn description(&self) -> &str {
        "Write the finished code review to a file. Call this once every to-do item is covered."
    }

    fn schema(&self) -> Value {
        input_schema::<WriteReviewInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: WriteReviewInput = serde_json::from_value(input)?;
        if input.review.trim().is_empty() {
            anyhow::bail!("Refusing to write an empty review");
        }
        let target = input
            .file_to_write
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| self.default_file.clone());
        let path = self.resolve_path(&target)?;

        fs::write(&path, &input.review)?;

        Ok(Value::String(format!(
            "Wrote {} bytes of review to {}",
            input.review.len(),
            target
        )))
    }
}
