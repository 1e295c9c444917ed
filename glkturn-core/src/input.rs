//! Input events from the UI.
//!
//! One invocation reads exactly one JSON object. [`read_stanza`] pulls
//! lines until the accumulated text parses, so an object may be spread
//! over any number of lines. [`InputEvent::classify`] then sorts it into
//! one of the shapes the turn engine understands.

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::context::DisplayMetrics;

/// Errors from reading the input stream.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream did not begin with an open brace")]
    NotAnObject,

    #[error("stream ended without valid JSON")]
    Incomplete,
}

/// Read one JSON stanza.
///
/// The stanza is expected to end at a line break, but may contain line
/// breaks of its own.
pub async fn read_stanza<R>(reader: R) -> Result<Value, InputError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut buf = String::new();

    while let Some(line) = lines.next_line().await? {
        buf.push_str(&line);
        buf.push('\n');

        let trimmed = buf.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with('{') {
            return Err(InputError::NotAnObject);
        }

        if let Ok(value) = serde_json::from_str::<Value>(&buf) {
            return Ok(value);
        }
    }

    Err(InputError::Incomplete)
}

/// A hyperlink value of the form `"<turn>:<index>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceToken {
    pub turn: u64,
    pub index: usize,
}

impl ChoiceToken {
    pub fn new(turn: u64, index: usize) -> Self {
        Self { turn, index }
    }

    /// Parse a token. Both halves must be bare ASCII digits: no sign,
    /// no whitespace, nothing else.
    pub fn parse(value: &str) -> Option<Self> {
        let (turn, index) = value.split_once(':')?;
        Some(Self {
            turn: parse_digits(turn)?,
            index: parse_digits(index)?,
        })
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl std::fmt::Display for ChoiceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.turn, self.index)
    }
}

/// An input event, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The UI reports its display size (sent on init and on arrange).
    Capability { metrics: DisplayMetrics },

    /// The player clicked a hyperlink. `value` is the raw link string.
    Selection { window: i64, value: String },

    /// Anything else.
    Unrecognized,
}

impl InputEvent {
    /// Classify a raw JSON event.
    pub fn classify(value: &Value) -> Self {
        if let Some(metrics) = value.get("metrics").and_then(parse_metrics) {
            return Self::Capability { metrics };
        }

        if value.get("type").and_then(Value::as_str) == Some("hyperlink") {
            let window = value.get("window").and_then(Value::as_i64);
            let link = value.get("value").and_then(Value::as_str);
            if let (Some(window), Some(link)) = (window, link) {
                return Self::Selection {
                    window,
                    value: link.to_string(),
                };
            }
        }

        Self::Unrecognized
    }

    pub fn metrics(&self) -> Option<DisplayMetrics> {
        match self {
            Self::Capability { metrics } => Some(*metrics),
            _ => None,
        }
    }
}

fn parse_metrics(value: &Value) -> Option<DisplayMetrics> {
    let dimension = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round().min(u32::MAX as f64) as u32)
    };
    Some(DisplayMetrics::new(dimension("width")?, dimension("height")?))
}
