//! Centralized constants for revue.
//!
//! All magic numbers, default strings, and prompt text live here so they can
//! be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "revue";

/// Default Ollama model identifier.
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Default base URL for the local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Environment variable that overrides the Ollama base URL.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "revue.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "REVUE_LOG";

// --- Agent ---

/// Instructions given to the model at the start of every session.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a code reviewer. Inspect the repository you are pointed at and report \
bad practices, bugs and refactoring opportunities, suggesting cleaner implementations.

Rules:
1) Never read or reveal secrets. Never open or print the contents of any .env file.
2) When scanning, always ignore .git, __pycache__, target and any .env file.
3) Before doing anything else, call write_todos with the list of steps you will take.
4) Mark each step done with update_todo as soon as it is finished.
5) Tool-call arguments must be valid JSON matching the tool schema exactly \
(integers as numbers, arrays as JSON arrays).
6) Treat the output of explore_structure as the project file tree; do not ask the user what to do with it.
7) When the review is complete, save it with write_review.";

/// Maximum failed attempts per operation before control returns to the human.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Minimum relevance confidence for the agent to take on a request.
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.5;

/// Maximum consecutive agent turns before the REPL hands control back.
pub const DEFAULT_MAX_AGENT_TURNS: usize = 50;

/// Retry-tracker key for tool dispatch in the main loop.
pub const RETRY_KEY_TOOLS: &str = "tool_execution";

/// Prompt used for the structured relevance decision.
pub const RELEVANCE_PROMPT: &str = "\
You are an agent with the following instructions:\n\n{instructions}\n\n\
Decide whether the request below is something you should act on under those \
instructions, and how confident you are. Answer only with JSON matching the \
requested schema.\n\nRequest:\n{request}";

/// Appended when the model tries to act before writing a plan.
pub const PLAN_REQUIRED_CORRECTION: &str = "\
You must create a plan before doing anything else. Call write_todos with the \
list of steps you will take to complete the request. No other tool is \
available until the plan exists.";

// --- Tool limits ---

/// Maximum file size (bytes) the read_file tool will read.
pub const READ_FILE_MAX_SIZE: u64 = 100 * 1024;

/// Byte threshold for binary file detection (check first N bytes for null).
pub const BINARY_DETECTION_BYTES: usize = 8192;

/// Default recursion depth for explore_structure.
pub const EXPLORE_DEFAULT_DEPTH: usize = 1;

/// Names skipped by explore_structure unless the model overrides them.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &[r"^\.git$", r"^__pycache__$", r"^\.env$", r"^\.env\..*$", r"^target$"];

/// Default file the review is written to.
pub const DEFAULT_REVIEW_FILE: &str = "review.md";

/// Characters of a tool result shown in the terminal.
pub const TOOL_RESULT_PREVIEW_CHARS: usize = 400;
