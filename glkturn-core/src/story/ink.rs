//! Compiled ink stories (`.ink.json`), played with the `bladeink` runtime.
//!
//! The story's `inkVersion` decides how runtime state goes into the
//! snapshot. From version 18 on it is the runtime's state JSON kept as a
//! string; older stories store the same state as a JSON object token.

use bladeink::story::Story;
use serde_json::Value;

use super::{Choice, StoryEngine, StoryError, StoryState};

/// First `inkVersion` whose saves are stored as serialized state text.
pub const SERIALIZED_SAVE_VERSION: i64 = 18;

/// How the runtime state is written into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStyle {
    /// State JSON as a string.
    Serialized,
    /// State JSON embedded as an object.
    Token,
}

impl SaveStyle {
    pub fn for_version(version: i64) -> Self {
        if version >= SERIALIZED_SAVE_VERSION {
            Self::Serialized
        } else {
            Self::Token
        }
    }
}

fn runtime_error(e: bladeink::story_error::StoryError) -> StoryError {
    StoryError::Runtime(e.to_string())
}

/// Engine for compiled ink JSON.
pub struct InkStory {
    story: Story,
    version: i64,
    save_style: SaveStyle,
}

impl InkStory {
    /// Build from the compiled story text. `version` is its `inkVersion`.
    pub fn from_json(content: &str, version: i64) -> Result<Self, StoryError> {
        let story = Story::new(content).map_err(runtime_error)?;
        Ok(Self {
            story,
            version,
            save_style: SaveStyle::for_version(version),
        })
    }

    pub fn ink_version(&self) -> i64 {
        self.version
    }

    pub fn save_style(&self) -> SaveStyle {
        self.save_style
    }
}

impl StoryEngine for InkStory {
    fn has_more(&self) -> bool {
        self.story.can_continue()
    }

    fn advance(&mut self) -> Result<String, StoryError> {
        self.story.cont().map_err(runtime_error)
    }

    fn current_choices(&self) -> Vec<Choice> {
        self.story
            .get_current_choices()
            .iter()
            .map(|choice| Choice {
                text: choice.text.clone(),
            })
            .collect()
    }

    fn select(&mut self, index: usize) -> Result<(), StoryError> {
        let available = self.story.get_current_choices().len();
        if index >= available {
            return Err(StoryError::ChoiceOutOfRange { index, available });
        }
        self.story.choose_choice_index(index).map_err(runtime_error)
    }

    fn export_state(&self) -> Result<StoryState, StoryError> {
        let json = self.story.save_state().map_err(runtime_error)?;
        let state = match self.save_style {
            SaveStyle::Serialized => Value::String(json),
            SaveStyle::Token => serde_json::from_str(&json)?,
        };
        Ok(StoryState(state))
    }

    fn import_state(&mut self, state: &StoryState) -> Result<(), StoryError> {
        let json = match (self.save_style, &state.0) {
            (SaveStyle::Serialized, Value::String(json)) => json.clone(),
            (SaveStyle::Token, token @ Value::Object(_)) => token.to_string(),
            (SaveStyle::Serialized, _) => {
                return Err(StoryError::IncompatibleState(
                    "expected serialized ink state".to_string(),
                ))
            }
            (SaveStyle::Token, _) => {
                return Err(StoryError::IncompatibleState(
                    "expected an ink state object".to_string(),
                ))
            }
        };

        self.story
            .load_state(&json)
            .map_err(|e| StoryError::IncompatibleState(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GALLERY: &str = include_str!("../../tests/fixtures/gallery.ink.json");

    fn story() -> InkStory {
        InkStory::from_json(GALLERY, 21).unwrap()
    }

    fn drain(story: &mut InkStory) -> String {
        let mut text = String::new();
        while story.has_more() {
            text.push_str(&story.advance().unwrap());
        }
        text
    }

    #[test]
    fn test_save_style_by_version() {
        assert_eq!(SaveStyle::for_version(21), SaveStyle::Serialized);
        assert_eq!(SaveStyle::for_version(18), SaveStyle::Serialized);
        assert_eq!(SaveStyle::for_version(17), SaveStyle::Token);
        assert_eq!(SaveStyle::for_version(15), SaveStyle::Token);
        assert_eq!(SaveStyle::for_version(12), SaveStyle::Token);
    }

    #[test]
    fn test_plays_to_first_choice() {
        let mut story = story();
        assert_eq!(story.ink_version(), 21);
        assert!(story.has_more());

        let text = drain(&mut story);
        assert!(text.contains("The keeper waves from the gallery."));

        let choices: Vec<_> = story.current_choices().into_iter().map(|c| c.text).collect();
        assert_eq!(choices, vec!["Wave back", "Look away"]);
    }

    #[test]
    fn test_select_continues_through_gather() {
        let mut story = story();
        drain(&mut story);
        story.select(0).unwrap();

        let text = drain(&mut story);
        assert!(text.contains("You wave back."));
        assert!(text.contains("The lamp flickers on."));
        assert_eq!(story.current_choices().len(), 2);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut story = story();
        drain(&mut story);
        assert!(matches!(
            story.select(5),
            Err(StoryError::ChoiceOutOfRange {
                index: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn test_serialized_state_round_trip() {
        let mut story = story();
        drain(&mut story);
        story.select(1).unwrap();
        drain(&mut story);

        let state = story.export_state().unwrap();
        assert!(state.0.is_string());

        let mut resumed = self::story();
        resumed.import_state(&state).unwrap();
        let choices: Vec<_> = resumed.current_choices().into_iter().map(|c| c.text).collect();
        assert_eq!(choices, vec!["Climb up", "Go home"]);

        resumed.select(1).unwrap();
        assert!(drain(&mut resumed).contains("You walk home in the dark."));
        assert!(resumed.current_choices().is_empty());
    }

    #[test]
    fn test_token_state_round_trip() {
        let mut story = InkStory {
            save_style: SaveStyle::Token,
            ..self::story()
        };
        drain(&mut story);

        let state = story.export_state().unwrap();
        assert!(state.0.is_object());

        let mut resumed = InkStory {
            save_style: SaveStyle::Token,
            ..self::story()
        };
        resumed.import_state(&state).unwrap();
        assert_eq!(resumed.current_choices().len(), 2);
    }

    #[test]
    fn test_import_rejects_wrong_save_style() {
        let mut story = story();
        let err = story
            .import_state(&StoryState(json!({ "passage": "top", "cursor": 0 })))
            .unwrap_err();
        assert!(matches!(err, StoryError::IncompatibleState(_)));
    }

    #[test]
    fn test_import_rejects_garbage_state() {
        let mut story = story();
        let err = story
            .import_state(&StoryState(json!("not a saved state")))
            .unwrap_err();
        assert!(matches!(err, StoryError::IncompatibleState(_)));
    }

    #[test]
    fn test_rejects_malformed_story() {
        let err = InkStory::from_json(r#"{"inkVersion": 21}"#, 21).err().unwrap();
        assert!(matches!(err, StoryError::Runtime(_)));
    }
}
