//! Story engines and story-file loading.
//!
//! The turn engine talks to narrative engines only through [`StoryEngine`].
//! [`parse_story`] picks the engine variant from the document's version
//! field:
//!
//! | field          | version | engine           | saved state                      |
//! |----------------|---------|------------------|----------------------------------|
//! | `inkVersion`   | `>= 18` | [`InkStory`]     | runtime state JSON, as a string  |
//! | `inkVersion`   | `< 18`  | [`InkStory`]     | runtime state JSON, as an object |
//! | `storyVersion` | `>= 2`  | [`PassageStory`] | `{"passage": .., "cursor": ..}`  |
//! | `storyVersion` | `1`     | [`LegacyStory`]  | `"<passage>@<cursor>"`           |

mod graph;
pub mod ink;
pub mod legacy;
pub mod passage;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;

pub use ink::{InkStory, SaveStyle};
pub use legacy::LegacyStory;
pub use passage::PassageStory;

/// Errors from loading or driving a story.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("does not appear to be a story file")]
    NotAStory,

    #[error("story version is not a number: {0}")]
    BadVersion(String),

    #[error("unsupported story version {0}")]
    UnsupportedVersion(i64),

    #[error("invalid story: {0}")]
    InvalidStory(String),

    #[error("ink runtime error: {0}")]
    Runtime(String),

    #[error("saved state does not fit this story: {0}")]
    IncompatibleState(String),

    #[error("choice {index} out of range ({available} available)")]
    ChoiceOutOfRange { index: usize, available: usize },
}

/// Engine-owned serialized state. Never interpreted outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryState(pub Value);

/// A choice offered at the current decision point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub text: String,
}

/// A narrative engine that produces text and blocks on choices.
///
/// Callers drain [`advance`](Self::advance) while
/// [`has_more`](Self::has_more) holds, then read
/// [`current_choices`](Self::current_choices). A [`select`](Self::select)
/// happens before any `advance` of the turn it starts.
pub trait StoryEngine {
    /// Whether more text can be produced before the next choice.
    fn has_more(&self) -> bool;

    /// Produce the next chunk of text.
    fn advance(&mut self) -> Result<String, StoryError>;

    /// Choices at the current point; empty while text remains or at the end.
    fn current_choices(&self) -> Vec<Choice>;

    /// Take the choice at `index` in `current_choices` order.
    fn select(&mut self, index: usize) -> Result<(), StoryError>;

    fn export_state(&self) -> Result<StoryState, StoryError>;

    fn import_state(&mut self, state: &StoryState) -> Result<(), StoryError>;
}

/// Read a version field, accepting numbers and numeric strings.
fn read_version(doc: &Value, field: &str) -> Result<i64, StoryError> {
    let raw = match doc.get(field) {
        None | Some(Value::Null) => return Err(StoryError::NotAStory),
        Some(raw) => raw,
    };

    match raw {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| StoryError::BadVersion(n.to_string())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| StoryError::BadVersion(s.clone())),
        other => Err(StoryError::BadVersion(other.to_string())),
    }
}

/// Parse a story document and build the engine for its version.
pub fn parse_story(content: &str) -> Result<Box<dyn StoryEngine>, StoryError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let doc: Value = serde_json::from_str(content)?;
    if !doc.is_object() {
        return Err(StoryError::NotAStory);
    }

    if doc.get("inkVersion").is_some() {
        let version = read_version(&doc, "inkVersion")?;
        let save_style = SaveStyle::for_version(version);
        tracing::debug!(version, ?save_style, "loading ink story");
        return Ok(Box::new(InkStory::from_json(content, version)?));
    }

    let version = read_version(&doc, "storyVersion")?;
    tracing::debug!(version, "loading story");

    match version {
        v if v >= 2 => Ok(Box::new(PassageStory::from_value(doc)?)),
        1 => Ok(Box::new(LegacyStory::from_value(doc)?)),
        v => Err(StoryError::UnsupportedVersion(v)),
    }
}

/// Load a story file from disk.
pub async fn load_story(
    path: impl AsRef<Path>,
) -> Result<Box<dyn StoryEngine>, StoryError> {
    let content = fs::read_to_string(path).await?;
    parse_story(&content)
}
