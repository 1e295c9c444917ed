//! Version 1 story format.
//!
//! Each passage carries its text as a single string, emitted by one
//! `advance()`. Saved state is a bare string token, `"<passage>@<cursor>"`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::graph::{ChoiceDef, Passage, Runner, StoryGraph};
use super::{Choice, StoryEngine, StoryError, StoryState};

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    title: Option<String>,
    start: String,
    passages: BTreeMap<String, DocumentPassage>,
}

#[derive(Debug, Deserialize)]
struct DocumentPassage {
    #[serde(default)]
    text: String,
    #[serde(default)]
    choices: Vec<ChoiceDef>,
    #[serde(default)]
    divert: Option<String>,
}

/// Engine for version 1 story files.
#[derive(Debug, Clone)]
pub struct LegacyStory {
    runner: Runner,
}

impl LegacyStory {
    pub fn from_value(doc: Value) -> Result<Self, StoryError> {
        let doc: Document = serde_json::from_value(doc)?;
        let passages = doc
            .passages
            .into_iter()
            .map(|(name, p)| {
                let text = if p.text.is_empty() {
                    Vec::new()
                } else {
                    vec![p.text]
                };
                let passage = Passage {
                    text,
                    choices: p.choices,
                    divert: p.divert,
                };
                (name, passage)
            })
            .collect();

        let graph = StoryGraph::new(doc.title, doc.start, passages)?;
        Ok(Self {
            runner: Runner::new(graph),
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.runner.graph().title.as_deref()
    }
}

impl StoryEngine for LegacyStory {
    fn has_more(&self) -> bool {
        self.runner.has_more()
    }

    fn advance(&mut self) -> Result<String, StoryError> {
        Ok(self.runner.advance())
    }

    fn current_choices(&self) -> Vec<Choice> {
        self.runner.choices()
    }

    fn select(&mut self, index: usize) -> Result<(), StoryError> {
        self.runner.select(index)
    }

    fn export_state(&self) -> Result<StoryState, StoryError> {
        let cursor = self.runner.cursor();
        Ok(StoryState(Value::String(format!(
            "{}@{}",
            cursor.passage, cursor.position
        ))))
    }

    fn import_state(&mut self, state: &StoryState) -> Result<(), StoryError> {
        let token = state.0.as_str().ok_or_else(|| {
            StoryError::IncompatibleState("expected a string token".to_string())
        })?;
        let (passage, position) = token
            .rsplit_once('@')
            .and_then(|(p, pos)| pos.parse::<usize>().ok().map(|pos| (p, pos)))
            .ok_or_else(|| StoryError::IncompatibleState(format!("malformed token '{token}'")))?;
        self.runner.seek(passage, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story() -> LegacyStory {
        LegacyStory::from_value(json!({
            "storyVersion": 1,
            "start": "gate",
            "passages": {
                "gate": {
                    "text": "A rusted gate.\nIt creaks.",
                    "choices": [{ "text": "Push it", "goto": "yard" }]
                },
                "yard": { "text": "Weeds everywhere." }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_whole_passage_is_one_chunk() {
        let mut story = story();
        assert_eq!(story.advance().unwrap(), "A rusted gate.\nIt creaks.\n");
        assert!(!story.has_more());
        assert_eq!(story.current_choices().len(), 1);
    }

    #[test]
    fn test_token_round_trip() {
        let mut story = story();
        story.advance().unwrap();
        story.select(0).unwrap();
        let token = story.export_state().unwrap();
        assert_eq!(token, StoryState(json!("yard@0")));

        let mut resumed = self::story();
        resumed.import_state(&token).unwrap();
        assert_eq!(resumed.advance().unwrap(), "Weeds everywhere.\n");
    }

    #[test]
    fn test_import_rejects_malformed_token() {
        let mut story = story();
        assert!(story.import_state(&StoryState(json!("gate"))).is_err());
        assert!(story
            .import_state(&StoryState(json!({ "passage": "gate", "cursor": 0 })))
            .is_err());
    }
}
