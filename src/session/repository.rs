//! Storage seam for the chat session.
//!
//! The store talks to [`SessionRepository`] only. Production injects
//! [`FileSessionRepository`]; tests and ephemeral sessions use
//! [`MemorySessionRepository`].

use super::types::PersistedSession;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait SessionRepository: Send + Sync {
    /// Load whatever was persisted, with per-key defaults where a key has
    /// never been written. Corrupt data is an error, not a fresh session.
    fn load(&self) -> Result<PersistedSession>;

    /// Persist the full state. Called after every mutation.
    fn save(&self, state: &PersistedSession) -> Result<()>;

    /// Drop all persisted state. The next load sees a fresh session.
    fn clear(&self) -> Result<()>;
}

/// File-backed repository: one JSON document per storage key under the
/// state directory (`messages.json`, `include_context.json`).
pub struct FileSessionRepository {
    state_dir: PathBuf,
}

impl FileSessionRepository {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    fn messages_path(&self) -> PathBuf {
        self.state_dir.join("messages.json")
    }

    fn include_context_path(&self) -> PathBuf {
        self.state_dir.join("include_context.json")
    }

    /// Atomic write: temp file then rename, so a crash mid-write never
    /// leaves a half-written document.
    fn write_atomic(&self, path: &Path, data: &str) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("state.json");
        let tmp_path = self
            .state_dir
            .join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, data)
            .with_context(|| format!("writing temp file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {} to {}", tmp_path.display(), path.display()))?;
        Ok(())
    }
}

impl SessionRepository for FileSessionRepository {
    fn load(&self) -> Result<PersistedSession> {
        let mut state = PersistedSession::default();

        let messages_path = self.messages_path();
        if messages_path.exists() {
            let data = fs::read_to_string(&messages_path)
                .with_context(|| format!("reading {}", messages_path.display()))?;
            state.messages = serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", messages_path.display()))?;
        }

        let flag_path = self.include_context_path();
        if flag_path.exists() {
            let data = fs::read_to_string(&flag_path)
                .with_context(|| format!("reading {}", flag_path.display()))?;
            state.include_context = serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", flag_path.display()))?;
        }

        Ok(state)
    }

    fn save(&self, state: &PersistedSession) -> Result<()> {
        fs::create_dir_all(&self.state_dir)
            .with_context(|| format!("creating directory {}", self.state_dir.display()))?;

        let messages =
            serde_json::to_string_pretty(&state.messages).context("serializing transcript")?;
        self.write_atomic(&self.messages_path(), &messages)?;

        let flag =
            serde_json::to_string(&state.include_context).context("serializing context flag")?;
        self.write_atomic(&self.include_context_path(), &flag)?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        for path in [self.messages_path(), self.include_context_path()] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
        }
        Ok(())
    }
}

/// In-memory repository. Same contract, no filesystem.
#[derive(Default)]
pub struct MemorySessionRepository {
    state: Mutex<Option<PersistedSession>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start pre-loaded, as if a previous run had saved `state`.
    pub fn seeded(state: PersistedSession) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl SessionRepository for MemorySessionRepository {
    fn load(&self) -> Result<PersistedSession> {
        let guard = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("session repository lock poisoned: {e}"))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, state: &PersistedSession) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("session repository lock poisoned: {e}"))?;
        *guard = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| anyhow::anyhow!("session repository lock poisoned: {e}"))?;
        *guard = None;
        Ok(())
    }
}
