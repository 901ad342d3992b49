//! Explore-structure tool: a depth-limited, name-sorted directory tree.

use anyhow::Result;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::read_file::resolve_existing;
use super::{input_schema, Tool};
use crate::constants::EXPLORE_DEFAULT_DEPTH;

/// A file entry in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub file_path: String,
    /// Extension including the leading dot, empty when there is none.
    pub extension: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}

/// A directory and everything found beneath it, down to the requested depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub root_file_path: String,
    pub files: Vec<File>,
    pub children: Vec<Directory>,
}

pub struct ExploreStructureTool {
    project_root: PathBuf,
    /// Patterns always ignored, on top of the ones the model passes.
    default_ignores: Vec<String>,
}

impl ExploreStructureTool {
    pub fn new(project_root: PathBuf, default_ignores: Vec<String>) -> Self {
        Self {
            project_root,
            default_ignores,
        }
    }
}

fn default_depth() -> usize {
    EXPLORE_DEFAULT_DEPTH
}

#[derive(Deserialize, JsonSchema)]
struct ExploreStructureInput {
    /// Directory to explore, relative to the project root
    root_dir_path: String,
    /// How many levels of subdirectories to descend into (0 lists only the root's files)
    #[serde(default = "default_depth")]
    depth: usize,
    /// Regular expressions; entries whose name matches any of them are skipped
    #[serde(default)]
    ignore_names: Vec<String>,
}

/// Walks `dir`, reporting paths as `display` joined with each entry name.
///
/// Entries that cannot be read are skipped rather than failing the walk.
pub fn explore(dir: &Path, display: &Path, depth: usize, ignore: &[Regex]) -> Directory {
    let mut directory = Directory {
        root_file_path: display.to_string_lossy().into_owned(),
        files: Vec::new(),
        children: Vec::new(),
    };

    let Ok(read_dir) = fs::read_dir(dir) else {
        return directory;
    };
    let mut entries: Vec<fs::DirEntry> = read_dir.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore.iter().any(|re| re.is_match(&name)) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let shown = display.join(&name);
        if metadata.is_file() {
            let extension = Path::new(&name)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            directory.files.push(File {
                file_path: shown.to_string_lossy().into_owned(),
                extension,
                file_name: name,
                file_size_bytes: metadata.len(),
            });
        } else if metadata.is_dir() && depth > 0 {
            directory
                .children
                .push(explore(&entry.path(), &shown, depth - 1, ignore));
        }
    }

    directory
}

#[async_trait::async_trait]
impl Tool for ExploreStructureTool {
    fn name(&self) -> &str {
        "explore_structure"
    }

    fn description(&self) -> &str {
        "List the files and subdirectories of a directory as a tree, with file sizes. \
         Use depth to control how far down to look."
    }

    fn schema(&self) -> Value {
        input_schema::<ExploreStructureInput>()
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: ExploreStructureInput = serde_json::from_value(input)?;
        let path = resolve_existing(&self.project_root, &input.root_dir_path)?;
        if !path.is_dir() {
            anyhow::bail!("Path is not a directory: {}", input.root_dir_path);
        }

        let ignore = self
            .default_ignores
            .iter()
            .chain(input.ignore_names.iter())
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| anyhow::anyhow!("Invalid ignore pattern '{}': {}", pattern, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let tree = explore(&path, Path::new(&input.root_dir_path), input.depth, &ignore);
        Ok(serde_json::to_value(tree)?)
    }
}
