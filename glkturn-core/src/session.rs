//! Session - a story engine paired with its context, and the
//! one-turn-per-invocation driver built on it.
//!
//! An invocation runs strictly in order: load the story, restore the
//! autosave (when enabled), read one input stanza, process the turn, save,
//! then write the update. Any failure before the save returns early, so
//! the previous autosave stays valid and nothing reaches the output.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::context::SessionContext;
use crate::input::{read_stanza, InputError, InputEvent};
use crate::output::OutputUpdate;
use crate::persist::{FileStore, PersistError, SessionStore, Snapshot};
use crate::protocol::{process_turn, ProtocolError};
use crate::story::{load_story, StoryEngine, StoryError};

/// Errors from running a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Story(#[from] StoryError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("autosave error: {0}")]
    Persist(#[from] PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration for one invocation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Story definition file.
    pub story_path: PathBuf,

    /// Resume from the autosave instead of starting fresh.
    pub autorestore: bool,

    /// Directory holding the autosave.
    pub autosave_dir: PathBuf,
}

impl SessionConfig {
    /// Create a config for a story file, starting fresh and saving to `.`.
    pub fn new(story_path: impl Into<PathBuf>) -> Self {
        Self {
            story_path: story_path.into(),
            autorestore: false,
            autosave_dir: PathBuf::from("."),
        }
    }

    /// Enable or disable restoring from the autosave.
    pub fn with_autorestore(mut self, autorestore: bool) -> Self {
        self.autorestore = autorestore;
        self
    }

    /// Set the autosave directory.
    pub fn with_autosave_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.autosave_dir = dir.as_ref().to_path_buf();
        self
    }

    /// The file store for this config's autosave directory.
    pub fn store(&self) -> FileStore {
        FileStore::new(&self.autosave_dir)
    }
}

/// A story engine and the context of the session it is playing.
pub struct Session {
    engine: Box<dyn StoryEngine>,
    context: SessionContext,
}

impl Session {
    /// Start a session with no saved state.
    pub fn new(engine: Box<dyn StoryEngine>) -> Self {
        Self {
            engine,
            context: SessionContext::new(),
        }
    }

    /// Resume from a snapshot. Fails if the story rejects the saved state.
    pub fn resume(
        mut engine: Box<dyn StoryEngine>,
        snapshot: Snapshot,
    ) -> Result<Self, SessionError> {
        engine.import_state(&snapshot.story)?;
        Ok(Self {
            engine,
            context: snapshot.into_context(),
        })
    }

    /// Load the configured story and, if enabled, restore from `store`.
    pub async fn open(
        config: &SessionConfig,
        store: &dyn SessionStore,
    ) -> Result<Self, SessionError> {
        let engine = load_story(&config.story_path).await?;

        if config.autorestore {
            if let Some(snapshot) = store.load().await? {
                return Self::resume(engine, snapshot);
            }
        }

        Ok(Self::new(engine))
    }

    /// Play one turn. The context only changes if the turn succeeds.
    pub fn turn(&mut self, input: &InputEvent) -> Result<OutputUpdate, SessionError> {
        let (context, output) = process_turn(&self.context, input, self.engine.as_mut())?;
        self.context = context;
        Ok(output)
    }

    /// Snapshot of the current state for persistence, taken from the
    /// engine state the last turn recorded. `None` before the first turn
    /// of a fresh session.
    pub fn snapshot(&self) -> Option<Snapshot> {
        Snapshot::from_context(&self.context)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

/// Run one full invocation: a single input stanza in, a single update out.
pub async fn run_invocation<R, W>(
    config: &SessionConfig,
    store: &dyn SessionStore,
    reader: R,
    writer: &mut W,
) -> Result<OutputUpdate, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::open(config, store).await?;

    let raw = read_stanza(reader).await?;
    let event = InputEvent::classify(&raw);
    let output = session.turn(&event)?;

    // A successful turn always records the engine state.
    if let Some(snapshot) = session.snapshot() {
        store.save(&snapshot).await?;
    }

    let mut line = serde_json::to_string(&output)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use crate::story::parse_story;
    use serde_json::json;

    fn engine() -> Box<dyn StoryEngine> {
        let doc = json!({
            "storyVersion": 2,
            "start": "door",
            "passages": {
                "door": {
                    "text": ["A door."],
                    "choices": [{ "text": "Knock", "goto": "inside" }]
                },
                "inside": { "text": ["Someone answers."] }
            }
        });
        parse_story(&doc.to_string()).unwrap()
    }

    fn metrics() -> InputEvent {
        InputEvent::classify(&json!({ "metrics": { "width": 800, "height": 480 } }))
    }

    #[test]
    fn test_session_config() {
        let config = SessionConfig::new("story.json")
            .with_autorestore(true)
            .with_autosave_dir("/tmp/saves");

        assert_eq!(config.story_path, PathBuf::from("story.json"));
        assert!(config.autorestore);
        assert_eq!(config.store().path(), Path::new("/tmp/saves/autosave.json"));
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("story.json");
        assert!(!config.autorestore);
        assert_eq!(config.autosave_dir, PathBuf::from("."));
    }

    #[test]
    fn test_failed_turn_keeps_context() {
        let mut session = Session::new(engine());
        let err = session.turn(&InputEvent::Unrecognized);
        assert!(matches!(
            err,
            Err(SessionError::Protocol(ProtocolError::MissingMetrics))
        ));
        assert_eq!(session.context(), &SessionContext::new());
    }

    #[test]
    fn test_snapshot_resume_continues() {
        let mut session = Session::new(engine());
        session.turn(&metrics()).unwrap();
        let snapshot = session.snapshot().unwrap();

        let mut resumed = Session::resume(engine(), snapshot).unwrap();
        assert_eq!(resumed.context().turn, 1);
        let click = InputEvent::classify(&json!({
            "type": "hyperlink",
            "window": 1,
            "value": "1:0"
        }));
        let output = resumed.turn(&click).unwrap();
        assert!(output.is_exit());
        assert_eq!(output.gen, 2);
    }

    #[test]
    fn test_snapshot_tracks_last_turn() {
        let mut session = Session::new(engine());
        assert!(session.snapshot().is_none());

        session.turn(&metrics()).unwrap();
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.gen, 1);
        assert_eq!(Some(&snapshot.story), session.context().story_state.as_ref());
    }

    #[test]
    fn test_resume_rejects_foreign_state() {
        let snapshot = Snapshot {
            story: crate::story::StoryState(json!({ "passage": "attic", "cursor": 0 })),
            turn: 1,
            gen: 1,
            metrics: None,
        };
        assert!(matches!(
            Session::resume(engine(), snapshot),
            Err(SessionError::Story(StoryError::IncompatibleState(_)))
        ));
    }

    #[tokio::test]
    async fn test_open_missing_story_file() {
        let config = SessionConfig::new("/definitely/not/here.json");
        let store = MemoryStore::new();
        assert!(matches!(
            Session::open(&config, &store).await,
            Err(SessionError::Story(StoryError::Io(_)))
        ));
    }
}
