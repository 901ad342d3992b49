//! Session persistence for revue.
//!
//! Each session is stored under `~/.local/share/revue/sessions/` as:
//! - `<id>.jsonl`: the message ledger, one JSON message per line, appended
//!   and flushed as the conversation grows;
//! - `<id>.state.json`: the plan (to-do items and whether it was created);
//! - a shared `index.json` with metadata for every session.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::message::{Message, Role};
use crate::todo::TodoLedger;

/// Metadata for a single session, stored in the session index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub title: Option<String>,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: usize,
}

/// Index of all sessions, persisted as `index.json`.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SessionIndex {
    pub sessions: Vec<SessionMeta>,
}

/// Plan state snapshot, persisted as `<id>.state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    pub todos: TodoLedger,
    pub plan_created: bool,
}

/// The directory holding every session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// The store at `~/.local/share/revue/sessions/`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Config::data_dir()?.join("sessions")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a new session with a UUID v4 identifier.
    pub fn create(&self, model: &str) -> Result<Session> {
        fs::create_dir_all(&self.dir).context("Failed to create sessions directory")?;
        let id = Uuid::new_v4().to_string();
        Ok(Session {
            store: self.clone(),
            id,
            model: model.to_string(),
            messages: Vec::new(),
            state: PlanState::default(),
        })
    }

    /// Loads an existing session's ledger and plan.
    pub fn load(&self, id: &str) -> Result<Session> {
        let file_path = self.messages_path(id);
        anyhow::ensure!(file_path.exists(), "Session {} not found", short_id(id));

        let model = self
            .load_index()?
            .sessions
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.model)
            .unwrap_or_default();

        let file = fs::File::open(&file_path)
            .with_context(|| format!("Failed to open session file {:?}", file_path))?;
        let mut messages = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let msg: Message = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse message on line {} of {:?}", n + 1, file_path))?;
            messages.push(msg);
        }

        let state_path = self.state_path(id);
        let state = if state_path.exists() {
            let contents = fs::read_to_string(&state_path)
                .with_context(|| format!("Failed to read plan state {:?}", state_path))?;
            serde_json::from_str(&contents).context("Failed to parse plan state")?
        } else {
            PlanState::default()
        };

        Ok(Session {
            store: self.clone(),
            id: id.to_string(),
            model,
            messages,
            state,
        })
    }

    /// Returns metadata for all sessions.
    pub fn list(&self) -> Result<Vec<SessionMeta>> {
        Ok(self.load_index()?.sessions)
    }

    /// Resolves a partial session ID to a full ID (git-style short IDs).
    ///
    /// Fails if zero or several sessions match.
    pub fn resolve_id(&self, partial: &str) -> Result<String> {
        let sessions = self.list()?;
        let matches: Vec<&SessionMeta> = sessions.iter().filter(|s| s.id.starts_with(partial)).collect();
        match matches.as_slice() {
            [] => anyhow::bail!("No session found matching '{}'", partial),
            [only] => Ok(only.id.clone()),
            several => {
                let candidates: Vec<&str> = several.iter().map(|s| short_id(&s.id)).collect();
                anyhow::bail!(
                    "'{}' matches {} sessions ({}); provide more characters",
                    partial,
                    several.len(),
                    candidates.join(", ")
                )
            }
        }
    }

    /// Deletes a session's files and removes it from the index.
    pub fn delete(&self, id: &str) -> Result<()> {
        for path in [self.messages_path(id), self.state_path(id)] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete session file {:?}", path))?;
            }
        }

        if self.dir.exists() {
            let mut index = self.load_index()?;
            index.sessions.retain(|s| s.id != id);
            self.save_index(&index)?;
        }
        Ok(())
    }

    fn load_index(&self) -> Result<SessionIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(SessionIndex::default());
        }
        let contents = fs::read_to_string(&path).context("Failed to read session index")?;
        serde_json::from_str(&contents).context("Failed to parse session index")
    }

    fn save_index(&self, index: &SessionIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), json).context("Failed to write session index")
    }

    fn messages_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }

    fn state_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.state.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }
}

/// An active conversation session.
///
/// `messages` mirrors what is on disk; [`Session::sync`] appends whatever
/// the agent's ledger gained since the last sync.
pub struct Session {
    store: SessionStore,
    pub id: String,
    pub model: String,
    pub messages: Vec<Message>,
    pub state: PlanState,
}

impl Session {
    /// Persists new ledger entries, the plan snapshot and the index entry.
    pub fn sync(&mut self, ledger: &[Message], todos: &TodoLedger, plan_created: bool) -> Result<()> {
        let fresh = ledger.get(self.messages.len()..).unwrap_or_default();
        if !fresh.is_empty() {
            append_lines(&self.store.messages_path(&self.id), fresh)?;
            self.messages.extend_from_slice(fresh);
        }

        let state = PlanState {
            todos: todos.clone(),
            plan_created,
        };
        if state != self.state {
            let json = serde_json::to_string_pretty(&state)?;
            fs::write(self.store.state_path(&self.id), json).context("Failed to write plan state")?;
            self.state = state;
        }

        if !fresh.is_empty() {
            self.update_index()?;
        }
        Ok(())
    }

    /// Returns the session title derived from the first user message.
    ///
    /// Truncates to 50 characters. Returns `None` if no user message exists.
    pub fn title(&self) -> Option<String> {
        self.messages.iter().find(|m| m.role == Role::User).map(|m| {
            let text = m.text();
            if text.chars().count() > 50 {
                let truncated: String = text.chars().take(50).collect();
                format!("{}...", truncated)
            } else {
                text.to_string()
            }
        })
    }

    /// Updates (or creates) this session's entry in the index file.
    fn update_index(&self) -> Result<()> {
        let mut index = self.store.load_index()?;
        let now = Utc::now().to_rfc3339();

        if let Some(entry) = index.sessions.iter_mut().find(|s| s.id == self.id) {
            entry.title = self.title();
            entry.updated_at = now;
            entry.message_count = self.messages.len();
        } else {
            index.sessions.push(SessionMeta {
                id: self.id.clone(),
                title: self.title(),
                model: self.model.clone(),
                created_at: now.clone(),
                updated_at: now,
                message_count: self.messages.len(),
            });
        }
        self.store.save_index(&index)
    }
}

/// Writes each message as one JSON line, flushing once at the end.
fn append_lines(path: &Path, messages: &[Message]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open session file {:?}", path))?;
    for msg in messages {
        writeln!(file, "{}", serde_json::to_string(msg)?)?;
    }
    file.flush()?;
    Ok(())
}

/// First 8 characters of a session ID.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
