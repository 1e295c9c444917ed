//! Testing utilities for turn-level scenarios.
//!
//! This module provides:
//! - `ScriptedStory`, a deterministic engine that walks a list of beats
//! - `TestHarness` for feeding raw JSON events through the turn engine
//! - Assertion helpers for checking output updates

use serde::Deserialize;
use serde_json::Value;

use crate::context::SessionContext;
use crate::input::InputEvent;
use crate::output::OutputUpdate;
use crate::persist::Snapshot;
use crate::protocol::{process_turn, ProtocolError};
use crate::story::{Choice, StoryEngine, StoryError, StoryState};

/// One scripted stop: some text, then a set of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beat {
    pub text: Vec<String>,
    pub choices: Vec<String>,
}

impl Beat {
    pub fn new(text: &[&str], choices: &[&str]) -> Self {
        Self {
            text: text.iter().map(|s| s.to_string()).collect(),
            choices: choices.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScriptPosition {
    beat: usize,
    chunk: usize,
}

/// A story engine that plays beats in order.
///
/// Taking any choice moves to the next beat; the index taken is recorded.
/// A beat with no choices (or running off the end) finishes the story.
#[derive(Debug, Clone)]
pub struct ScriptedStory {
    beats: Vec<Beat>,
    beat: usize,
    chunk: usize,
    selections: Vec<usize>,
    advances: usize,
}

impl ScriptedStory {
    pub fn new(beats: Vec<Beat>) -> Self {
        Self {
            beats,
            beat: 0,
            chunk: 0,
            selections: Vec::new(),
            advances: 0,
        }
    }

    /// Choice indices taken so far, in order.
    pub fn selections(&self) -> &[usize] {
        &self.selections
    }

    /// Number of `advance()` calls so far.
    pub fn advance_count(&self) -> usize {
        self.advances
    }

    fn current(&self) -> Option<&Beat> {
        self.beats.get(self.beat)
    }
}

impl StoryEngine for ScriptedStory {
    fn has_more(&self) -> bool {
        self.current()
            .map(|b| self.chunk < b.text.len())
            .unwrap_or(false)
    }

    fn advance(&mut self) -> Result<String, StoryError> {
        let Some(text) = self.current().and_then(|b| b.text.get(self.chunk)).cloned() else {
            return Ok(String::new());
        };
        self.chunk += 1;
        self.advances += 1;
        Ok(text)
    }

    fn current_choices(&self) -> Vec<Choice> {
        if self.has_more() {
            return Vec::new();
        }
        self.current()
            .map(|b| {
                b.choices
                    .iter()
                    .map(|text| Choice { text: text.clone() })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn select(&mut self, index: usize) -> Result<(), StoryError> {
        let available = self.current_choices().len();
        if index >= available {
            return Err(StoryError::ChoiceOutOfRange { index, available });
        }
        self.selections.push(index);
        self.beat += 1;
        self.chunk = 0;
        Ok(())
    }

    fn export_state(&self) -> Result<StoryState, StoryError> {
        Ok(StoryState(serde_json::json!({ "beat": self.beat, "chunk": self.chunk })))
    }

    fn import_state(&mut self, state: &StoryState) -> Result<(), StoryError> {
        let position: ScriptPosition = serde_json::from_value(state.0.clone())
            .map_err(|e| StoryError::IncompatibleState(e.to_string()))?;
        if position.beat > self.beats.len() {
            return Err(StoryError::IncompatibleState(format!(
                "beat {} of {}",
                position.beat,
                self.beats.len()
            )));
        }
        self.beat = position.beat;
        self.chunk = position.chunk;
        Ok(())
    }
}

/// Harness that drives a `ScriptedStory` through raw JSON events.
pub struct TestHarness {
    /// The scripted engine.
    pub story: ScriptedStory,
    /// Context after the last successful turn.
    pub context: SessionContext,
    /// Every update produced so far.
    pub outputs: Vec<OutputUpdate>,
    beats: Vec<Beat>,
}

impl TestHarness {
    pub fn new(beats: Vec<Beat>) -> Self {
        Self {
            story: ScriptedStory::new(beats.clone()),
            context: SessionContext::new(),
            outputs: Vec::new(),
            beats,
        }
    }

    /// Send one raw event. The context is only replaced on success.
    pub fn send(&mut self, event: Value) -> Result<&OutputUpdate, ProtocolError> {
        let event = InputEvent::classify(&event);
        let (context, output) = process_turn(&self.context, &event, &mut self.story)?;
        self.context = context;
        self.outputs.push(output);
        Ok(&self.outputs[self.outputs.len() - 1])
    }

    /// Send the UI's init event with the given display size.
    pub fn init(&mut self, width: u32, height: u32) -> Result<&OutputUpdate, ProtocolError> {
        self.send(serde_json::json!({
            "type": "init",
            "gen": 0,
            "metrics": { "width": width, "height": height }
        }))
    }

    /// Send a hyperlink click carrying `value`.
    pub fn click(&mut self, value: &str) -> Result<&OutputUpdate, ProtocolError> {
        let gen = self.context.generation;
        self.send(serde_json::json!({
            "type": "hyperlink",
            "gen": gen,
            "window": 1,
            "value": value
        }))
    }

    /// Simulate a process restart: snapshot, then rebuild a fresh engine
    /// from the same script and restore into it.
    pub fn restart(&mut self) -> Result<(), StoryError> {
        let snapshot = match Snapshot::from_context(&self.context) {
            Some(snapshot) => snapshot,
            None => Snapshot::new(&self.context, self.story.export_state()?),
        };
        let mut story = ScriptedStory::new(self.beats.clone());
        story.import_state(&snapshot.story)?;
        self.story = story;
        self.context = snapshot.into_context();
        Ok(())
    }

    pub fn last_output(&self) -> Option<&OutputUpdate> {
        self.outputs.last()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the update carries only its generation (and maybe windows).
#[track_caller]
pub fn assert_heartbeat(output: &OutputUpdate) {
    assert!(
        output.is_heartbeat(),
        "Expected heartbeat update, got {output:?}"
    );
}

/// Assert the update ends the story.
#[track_caller]
pub fn assert_exit(output: &OutputUpdate) {
    assert!(output.is_exit(), "Expected exit flag, got {output:?}");
    assert!(
        output.input.is_none(),
        "Expected no input request at story end, got {:?}",
        output.input
    );
}

/// Assert the update requests hyperlink input.
#[track_caller]
pub fn assert_awaiting_input(output: &OutputUpdate) {
    let awaiting = output
        .input
        .as_ref()
        .is_some_and(|requests| requests.iter().any(|r| r.hyperlink));
    assert!(awaiting, "Expected hyperlink input request, got {output:?}");
}

/// Assert the choice lines carry exactly these tokens.
#[track_caller]
pub fn assert_choice_tokens(output: &OutputUpdate, expected: &[&str]) {
    assert_eq!(
        output.choice_tokens(),
        expected,
        "Unexpected choice tokens"
    );
}
