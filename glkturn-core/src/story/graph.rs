//! Passage graph shared by every story format version.
//!
//! Both file formats parse into a [`StoryGraph`]; a [`Runner`] walks it.
//! The runner's cursor always rests either on a chunk of text still to be
//! emitted or on a passage that is waiting for a choice (or has ended the
//! story). Diverts are followed eagerly so callers never observe a cursor
//! sitting at the end of a passage that continues elsewhere.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::{Choice, StoryError};

/// A choice as written in a story file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoiceDef {
    pub text: String,
    pub goto: String,
}

/// One named node of a story.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Passage {
    /// Chunks emitted one per `advance()`.
    pub text: Vec<String>,
    pub choices: Vec<ChoiceDef>,
    /// Passage to continue into once the text is exhausted.
    pub divert: Option<String>,
}

/// A validated story: every name referenced exists and divert chains end.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    pub title: Option<String>,
    pub start: String,
    pub passages: BTreeMap<String, Passage>,
}

impl StoryGraph {
    /// Build a graph, rejecting dangling references and divert cycles.
    pub fn new(
        title: Option<String>,
        start: String,
        passages: BTreeMap<String, Passage>,
    ) -> Result<Self, StoryError> {
        let graph = Self {
            title,
            start,
            passages,
        };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), StoryError> {
        if !self.passages.contains_key(&self.start) {
            return Err(StoryError::InvalidStory(format!(
                "start passage '{}' does not exist",
                self.start
            )));
        }

        for (name, passage) in &self.passages {
            for choice in &passage.choices {
                if !self.passages.contains_key(&choice.goto) {
                    return Err(StoryError::InvalidStory(format!(
                        "choice '{}' in '{name}' leads to unknown passage '{}'",
                        choice.text, choice.goto
                    )));
                }
            }
            if let Some(divert) = &passage.divert {
                if !self.passages.contains_key(divert) {
                    return Err(StoryError::InvalidStory(format!(
                        "'{name}' diverts to unknown passage '{divert}'"
                    )));
                }
            }
        }

        // A divert cycle would make the text stream endless.
        for name in self.passages.keys() {
            let mut seen = BTreeSet::new();
            let mut current = name;
            while let Some(next) = self.passages[current].divert.as_ref() {
                if !seen.insert(current) {
                    return Err(StoryError::InvalidStory(format!(
                        "divert cycle through '{current}'"
                    )));
                }
                current = next;
            }
        }

        Ok(())
    }

    pub fn passage(&self, name: &str) -> Option<&Passage> {
        self.passages.get(name)
    }
}

/// Position of the runner within the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub passage: String,
    pub position: usize,
}

/// Walks a [`StoryGraph`].
#[derive(Debug, Clone)]
pub struct Runner {
    graph: StoryGraph,
    cursor: Cursor,
}

impl Runner {
    pub fn new(graph: StoryGraph) -> Self {
        let cursor = Cursor {
            passage: graph.start.clone(),
            position: 0,
        };
        let mut runner = Self { graph, cursor };
        runner.settle();
        runner
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    fn current(&self) -> &Passage {
        // The cursor only ever names validated passages.
        &self.graph.passages[&self.cursor.passage]
    }

    fn settle(&mut self) {
        loop {
            let passage = self.current();
            if self.cursor.position < passage.text.len() {
                return;
            }
            match passage.divert.clone() {
                Some(next) => {
                    self.cursor = Cursor {
                        passage: next,
                        position: 0,
                    };
                }
                None => return,
            }
        }
    }

    pub fn has_more(&self) -> bool {
        self.cursor.position < self.current().text.len()
    }

    /// Emit the next chunk, newline-terminated. Empty once blocked.
    pub fn advance(&mut self) -> String {
        let Some(chunk) = self.current().text.get(self.cursor.position) else {
            return String::new();
        };
        let mut chunk = chunk.clone();
        if !chunk.ends_with('\n') {
            chunk.push('\n');
        }
        self.cursor.position += 1;
        self.settle();
        chunk
    }

    pub fn choices(&self) -> Vec<Choice> {
        if self.has_more() {
            return Vec::new();
        }
        self.current()
            .choices
            .iter()
            .map(|c| Choice {
                text: c.text.clone(),
            })
            .collect()
    }

    pub fn select(&mut self, index: usize) -> Result<(), StoryError> {
        let available = if self.has_more() {
            0
        } else {
            self.current().choices.len()
        };
        if index >= available {
            return Err(StoryError::ChoiceOutOfRange { index, available });
        }

        let goto = self.current().choices[index].goto.clone();
        self.cursor = Cursor {
            passage: goto,
            position: 0,
        };
        self.settle();
        Ok(())
    }

    /// Move to a saved position, checking it against this story.
    pub fn seek(&mut self, passage: &str, position: usize) -> Result<(), StoryError> {
        let Some(target) = self.graph.passage(passage) else {
            return Err(StoryError::IncompatibleState(format!(
                "unknown passage '{passage}'"
            )));
        };
        if position > target.text.len() {
            return Err(StoryError::IncompatibleState(format!(
                "position {position} is past the end of '{passage}'"
            )));
        }

        self.cursor = Cursor {
            passage: passage.to_string(),
            position,
        };
        self.settle();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &[&str], choices: &[(&str, &str)], divert: Option<&str>) -> Passage {
        Passage {
            text: text.iter().map(|s| s.to_string()).collect(),
            choices: choices
                .iter()
                .map(|(text, goto)| ChoiceDef {
                    text: text.to_string(),
                    goto: goto.to_string(),
                })
                .collect(),
            divert: divert.map(str::to_string),
        }
    }

    fn sample_graph() -> StoryGraph {
        let mut passages = BTreeMap::new();
        passages.insert(
            "start".to_string(),
            passage(&["You wake.", "It is dark."], &[], Some("hall")),
        );
        passages.insert(
            "hall".to_string(),
            passage(&["A hall."], &[("Go north", "end"), ("Wait", "hall")], None),
        );
        passages.insert("end".to_string(), passage(&["The end."], &[], None));
        StoryGraph::new(None, "start".to_string(), passages).unwrap()
    }

    #[test]
    fn test_runner_follows_divert_as_one_stream() {
        let mut runner = Runner::new(sample_graph());
        let mut text = String::new();
        while runner.has_more() {
            text.push_str(&runner.advance());
        }
        assert_eq!(text, "You wake.\nIt is dark.\nA hall.\n");
        assert_eq!(runner.choices().len(), 2);
        assert_eq!(runner.cursor().passage, "hall");
    }

    #[test]
    fn test_no_choices_while_text_remains() {
        let runner = Runner::new(sample_graph());
        assert!(runner.has_more());
        assert!(runner.choices().is_empty());
    }

    #[test]
    fn test_select_moves_to_target() {
        let mut runner = Runner::new(sample_graph());
        while runner.has_more() {
            runner.advance();
        }
        runner.select(0).unwrap();
        assert_eq!(runner.advance(), "The end.\n");
        assert!(!runner.has_more());
        assert!(runner.choices().is_empty());
    }

    #[test]
    fn test_select_out_of_range() {
        let mut runner = Runner::new(sample_graph());
        while runner.has_more() {
            runner.advance();
        }
        let err = runner.select(5).unwrap_err();
        assert!(matches!(
            err,
            StoryError::ChoiceOutOfRange {
                index: 5,
                available: 2
            }
        ));
    }

    #[test]
    fn test_seek_rejects_unknown_passage() {
        let mut runner = Runner::new(sample_graph());
        assert!(matches!(
            runner.seek("cellar", 0),
            Err(StoryError::IncompatibleState(_))
        ));
        assert!(matches!(
            runner.seek("end", 4),
            Err(StoryError::IncompatibleState(_))
        ));
    }

    #[test]
    fn test_seek_to_end_of_divert_passage_settles() {
        let mut runner = Runner::new(sample_graph());
        runner.seek("start", 2).unwrap();
        assert_eq!(runner.cursor().passage, "hall");
        assert_eq!(runner.cursor().position, 0);
    }

    #[test]
    fn test_rejects_dangling_goto() {
        let mut passages = BTreeMap::new();
        passages.insert("start".to_string(), passage(&["Hi."], &[("Leave", "nowhere")], None));
        let err = StoryGraph::new(None, "start".to_string(), passages).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_rejects_divert_cycle() {
        let mut passages = BTreeMap::new();
        passages.insert("a".to_string(), passage(&["A."], &[], Some("b")));
        passages.insert("b".to_string(), passage(&["B."], &[], Some("a")));
        let err = StoryGraph::new(None, "a".to_string(), passages).unwrap_err();
        assert!(matches!(err, StoryError::InvalidStory(_)));
    }

    #[test]
    fn test_rejects_missing_start() {
        let err = StoryGraph::new(None, "start".to_string(), BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("start"));
    }
}
