//! Output updates sent to the UI.
//!
//! Wire shapes follow the GlkOte update protocol, restricted to the single
//! buffer window this adapter uses.

use serde::{Deserialize, Serialize};

use crate::context::DisplayMetrics;
use crate::input::ChoiceToken;

/// The one window every session draws into.
pub const STORY_WINDOW: i64 = 1;

/// Text style of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Normal,
    Input,
    Note,
}

/// A styled span of text within a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub style: Style,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
}

/// One line of buffer-window output. A blank line serializes as `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Line {
    Text { content: Vec<TextRun> },
    Blank {},
}

impl Line {
    pub fn blank() -> Self {
        Self::Blank {}
    }

    pub fn styled(style: Style, text: impl Into<String>) -> Self {
        Self::Text {
            content: vec![TextRun {
                style,
                text: text.into(),
                hyperlink: None,
            }],
        }
    }

    pub fn choice(text: impl Into<String>, token: ChoiceToken) -> Self {
        Self::Text {
            content: vec![TextRun {
                style: Style::Note,
                text: text.into(),
                hyperlink: Some(token.to_string()),
            }],
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank {})
    }

    /// The first run of the line, if any.
    pub fn run(&self) -> Option<&TextRun> {
        match self {
            Self::Text { content } => content.first(),
            Self::Blank {} => None,
        }
    }
}

/// Window layout entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub rock: u32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl WindowDescriptor {
    /// The story buffer window, filling the display.
    pub fn story(metrics: DisplayMetrics) -> Self {
        Self {
            id: STORY_WINDOW,
            kind: "buffer".to_string(),
            rock: 0,
            left: 0,
            top: 0,
            width: metrics.width,
            height: metrics.height,
        }
    }
}

/// New lines for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub id: i64,
    pub text: Vec<Line>,
}

/// An input request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    pub id: i64,
    pub gen: u64,
    pub hyperlink: bool,
}

impl InputRequest {
    pub fn hyperlink(window: i64) -> Self {
        Self {
            id: window,
            gen: 0,
            hyperlink: true,
        }
    }
}

/// One update message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    pub gen: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<WindowDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentUpdate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<InputRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<bool>,
}

impl OutputUpdate {
    /// An update carrying nothing but its generation.
    pub fn heartbeat(gen: u64) -> Self {
        Self {
            kind: "update".to_string(),
            gen,
            windows: None,
            content: None,
            input: None,
            exit: None,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        self.content.is_none() && self.input.is_none() && self.exit.is_none()
    }

    pub fn is_exit(&self) -> bool {
        self.exit == Some(true)
    }

    /// All lines sent to the story window, in order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.content
            .iter()
            .flatten()
            .filter(|c| c.id == STORY_WINDOW)
            .flat_map(|c| c.text.iter())
    }

    /// Hyperlink tokens of the choice lines, in order.
    pub fn choice_tokens(&self) -> Vec<&str> {
        self.lines()
            .filter_map(Line::run)
            .filter_map(|run| run.hyperlink.as_deref())
            .collect()
    }
}
