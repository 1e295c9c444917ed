//! Turn-per-invocation adapter between choice-based stories and
//! GlkOte-style text UIs.
//!
//! This crate provides:
//! - The turn protocol engine ([`process_turn`]) that decides, from one
//!   input event and the saved context, whether the story moves and what
//!   the UI should show
//! - A [`StoryEngine`] trait with an engine for compiled ink stories
//!   (`.ink.json`) and passage-graph engines for plain JSON story files
//! - Snapshot persistence so that each process invocation can resume the
//!   previous one
//!
//! # Quick Start
//!
//! ```ignore
//! use glkturn_core::{run_invocation, SessionConfig};
//! use tokio::io::{self, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("lighthouse.ink.json")
//!         .with_autorestore(true)
//!         .with_autosave_dir("saves");
//!     let store = config.store();
//!
//!     let stdin = BufReader::new(io::stdin());
//!     let mut stdout = io::stdout();
//!     run_invocation(&config, &store, stdin, &mut stdout).await?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod input;
pub mod output;
pub mod persist;
pub mod protocol;
pub mod session;
pub mod story;
pub mod testing;

// Primary public API
pub use context::{DisplayMetrics, SessionContext};
pub use input::{read_stanza, ChoiceToken, InputError, InputEvent};
pub use output::{Line, OutputUpdate, Style};
pub use persist::{FileStore, MemoryStore, PersistError, SessionStore, Snapshot};
pub use protocol::{process_turn, ProtocolError};
pub use session::{run_invocation, Session, SessionConfig, SessionError};
pub use story::{
    load_story, parse_story, Choice, InkStory, StoryEngine, StoryError, StoryState,
};
pub use testing::{Beat, ScriptedStory, TestHarness};
