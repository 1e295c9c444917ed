//! Current story format (version 2 and later).
//!
//! Passage text is a list of chunks, one per `advance()`. State is saved
//! as a structured JSON object.

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
    text: Vec<String>,
    #[serde(default)]
    choices: Vec<ChoiceDef>,
    #[serde(default)]
    divert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedCursor {
    passage: String,
    cursor: usize,
}

/// Engine for version 2+ story files.
#[derive(Debug, Clone)]
pub struct PassageStory {
    runner: Runner,
}

impl PassageStory {
    pub fn from_value(doc: Value) -> Result<Self, StoryError> {
        let doc: Document = serde_json::from_value(doc)?;
        let passages = doc
            .passages
            .into_iter()
            .map(|(name, p)| {
                let passage = Passage {
                    text: p.text,
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

impl StoryEngine for PassageStory {
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
        Ok(StoryState(serde_json::json!({
            "passage": cursor.passage,
            "cursor": cursor.position,
        })))
    }

    fn import_state(&mut self, state: &StoryState) -> Result<(), StoryError> {
        let saved: SavedCursor = serde_json::from_value(state.0.clone())
            .map_err(|e| StoryError::IncompatibleState(e.to_string()))?;
        self.runner.seek(&saved.passage, saved.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story() -> PassageStory {
        PassageStory::from_value(json!({
            "storyVersion": 2,
            "title": "Cellar",
            "start": "top",
            "passages": {
                "top": {
                    "text": ["Stairs lead down."],
                    "choices": [
                        { "text": "Descend", "goto": "bottom" },
                        { "text": "Stay", "goto": "top" }
                    ]
                },
                "bottom": { "text": ["Darkness.", "Silence."] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_title() {
        assert_eq!(story().title(), Some("Cellar"));
    }

    #[test]
    fn test_exports_structured_state() {
        let mut story = story();
        story.advance().unwrap();
        assert_eq!(
            story.export_state().unwrap(),
            StoryState(json!({ "passage": "top", "cursor": 1 }))
        );
    }

    #[test]
    fn test_import_resumes_mid_passage() {
        let mut story = story();
        story
            .import_state(&StoryState(json!({ "passage": "bottom", "cursor": 1 })))
            .unwrap();
        assert_eq!(story.advance().unwrap(), "Silence.\n");
        assert!(!story.has_more());
    }

    #[test]
    fn test_import_rejects_legacy_token() {
        let mut story = story();
        let err = story
            .import_state(&StoryState(json!("top@1")))
            .unwrap_err();
        assert!(matches!(err, StoryError::IncompatibleState(_)));
    }
}
