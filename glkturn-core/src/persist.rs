//! Session persistence between invocations.
//!
//! A [`Snapshot`] is the on-disk form of a [`SessionContext`]: the engine's
//! opaque state verbatim, plus turn, generation and display metrics.
//! Stores are atomic per invocation: a reader sees either the previous
//! snapshot or the new one, never a partial write.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::context::{DisplayMetrics, SessionContext};
use crate::story::StoryState;

/// File name of the autosave inside the save directory.
pub const AUTOSAVE_FILE: &str = "autosave.json";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to resume a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Engine state, stored verbatim.
    #[serde(rename = "ink")]
    pub story: StoryState,

    pub turn: u64,

    pub gen: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DisplayMetrics>,
}

impl Snapshot {
    /// Capture a context together with the engine state it belongs to.
    pub fn new(context: &SessionContext, story: StoryState) -> Self {
        Self {
            story,
            turn: context.turn,
            gen: context.generation,
            metrics: context.display_metrics,
        }
    }

    /// Snapshot of a context that has recorded its engine state.
    ///
    /// `None` until a turn has run (or the context was restored).
    pub fn from_context(context: &SessionContext) -> Option<Self> {
        let story = context.story_state.clone()?;
        Some(Self::new(context, story))
    }

    /// Rebuild the context this snapshot was taken from.
    pub fn into_context(self) -> SessionContext {
        SessionContext {
            generation: self.gen,
            turn: self.turn,
            display_metrics: self.metrics,
            pending_choice_label: None,
            story_state: Some(self.story),
        }
    }
}

/// Where snapshots live between invocations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The saved snapshot, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<Snapshot>, PersistError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError>;
}

/// Snapshot stored as `autosave.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(AUTOSAVE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no autosave to restore");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %self.path.display(),
            turn = snapshot.turn,
            gen = snapshot.gen,
            "restored autosave"
        );
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let mut content = serde_json::to_string(snapshot)?;
        content.push('\n');

        // Write beside the target, then swap it in.
        let temp = self.temp_path();
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), gen = snapshot.gen, "autosaved");
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    /// The currently stored snapshot.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistError> {
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}
