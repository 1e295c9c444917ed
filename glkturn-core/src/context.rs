//! Per-session context threaded through every turn.
//!
//! A `SessionContext` is the only state that survives between process
//! invocations (via a [`Snapshot`](crate::persist::Snapshot)). The turn
//! engine takes one by reference and hands back a new one, so a failed
//! turn never leaves a half-updated context behind.

use serde::{Deserialize, Serialize};

use crate::story::StoryState;

/// Size of the display area reported by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
}

impl DisplayMetrics {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Resumable state of one story session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    /// UI generation number. Bumped once per invocation that produces output.
    pub generation: u64,

    /// Current decision point. Hyperlink tokens carry this value.
    pub turn: u64,

    /// Set from the first event that reports metrics, then left alone.
    pub display_metrics: Option<DisplayMetrics>,

    /// Label of the choice just taken, echoed before the next narrative.
    pub pending_choice_label: Option<String>,

    /// Opaque engine state; `None` until the first turn has run.
    pub story_state: Option<StoryState>,
}

impl SessionContext {
    /// Context for a session with no saved state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the UI handshake has happened.
    pub fn has_metrics(&self) -> bool {
        self.display_metrics.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context() {
        let context = SessionContext::new();
        assert_eq!(context.generation, 0);
        assert_eq!(context.turn, 0);
        assert!(!context.has_metrics());
        assert!(context.pending_choice_label.is_none());
        assert!(context.story_state.is_none());
    }

    #[test]
    fn test_metrics_serialize_as_plain_numbers() {
        let json = serde_json::to_value(DisplayMetrics::new(800, 480)).unwrap();
        assert_eq!(json, serde_json::json!({ "width": 800, "height": 480 }));
    }
}
