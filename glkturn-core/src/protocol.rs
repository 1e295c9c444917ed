//! The turn protocol engine.
//!
//! [`process_turn`] takes the previous [`SessionContext`], one classified
//! [`InputEvent`] and the story engine, and returns the next context plus
//! the update to send to the UI. It is the only place that decides whether
//! the story moves.
//!
//! Two flags drive each turn:
//! - `new_input`: this event closes the outstanding input request;
//! - `new_turn`: the engine is advanced and a fresh render is produced.
//!
//! Events that fail validation (wrong window, stale or malformed token,
//! choice index out of range) are dropped and answered with a heartbeat.
//! Only a first event without metrics is an error.

use thiserror::Error;

use crate::context::SessionContext;
use crate::input::{ChoiceToken, InputEvent};
use crate::output::{
    ContentUpdate, InputRequest, Line, OutputUpdate, Style, WindowDescriptor, STORY_WINDOW,
};
use crate::story::{StoryEngine, StoryError};

/// Errors that abort a turn. Nothing is emitted or saved after one.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("first input had no metrics")]
    MissingMetrics,

    #[error("story engine error: {0}")]
    Engine(#[from] StoryError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TurnFlags {
    new_input: bool,
    new_turn: bool,
}

/// Run one turn.
pub fn process_turn(
    prior: &SessionContext,
    input: &InputEvent,
    engine: &mut dyn StoryEngine,
) -> Result<(SessionContext, OutputUpdate), ProtocolError> {
    let mut context = prior.clone();
    let flags = handle_input(&mut context, input, engine)?;

    context.generation += 1;
    if flags.new_turn {
        context.turn += 1;
    }

    let output = generate_output(&mut context, flags, engine)?;
    context.story_state = Some(engine.export_state()?);

    tracing::debug!(
        gen = context.generation,
        turn = context.turn,
        new_turn = flags.new_turn,
        "turn processed"
    );

    Ok((context, output))
}

fn handle_input(
    context: &mut SessionContext,
    input: &InputEvent,
    engine: &mut dyn StoryEngine,
) -> Result<TurnFlags, ProtocolError> {
    if context.display_metrics.is_none() {
        let metrics = input.metrics().ok_or(ProtocolError::MissingMetrics)?;
        context.display_metrics = Some(metrics);
        return Ok(TurnFlags {
            new_input: true,
            new_turn: true,
        });
    }

    let InputEvent::Selection { window, value } = input else {
        tracing::debug!(?input, "ignoring event");
        return Ok(TurnFlags::default());
    };
    if *window != STORY_WINDOW {
        tracing::debug!(window = *window, "ignoring hyperlink for unknown window");
        return Ok(TurnFlags::default());
    }

    let Some(token) = ChoiceToken::parse(value) else {
        tracing::debug!(value = %value, "ignoring malformed hyperlink");
        return Ok(TurnFlags::default());
    };
    if token.turn != context.turn {
        tracing::debug!(
            token_turn = token.turn,
            turn = context.turn,
            "ignoring stale hyperlink"
        );
        return Ok(TurnFlags::default());
    }

    let choices = engine.current_choices();
    let Some(choice) = choices.get(token.index) else {
        tracing::debug!(
            index = token.index,
            available = choices.len(),
            "ignoring out-of-range choice"
        );
        return Ok(TurnFlags::default());
    };

    context.pending_choice_label = Some(choice.text.clone());
    engine.select(token.index)?;

    Ok(TurnFlags {
        new_input: true,
        new_turn: true,
    })
}

fn generate_output(
    context: &mut SessionContext,
    flags: TurnFlags,
    engine: &mut dyn StoryEngine,
) -> Result<OutputUpdate, StoryError> {
    let mut output = OutputUpdate::heartbeat(context.generation);

    if context.generation <= 1 {
        if let Some(metrics) = context.display_metrics {
            output.windows = Some(vec![WindowDescriptor::story(metrics)]);
        }
    }

    if !flags.new_turn {
        return Ok(output);
    }

    let mut lines = Vec::new();

    if let Some(label) = context.pending_choice_label.take() {
        lines.push(Line::styled(Style::Input, label));
        lines.push(Line::blank());
    }

    while engine.has_more() {
        let text = engine.advance()?;
        for piece in text.split('\n') {
            if piece.is_empty() {
                lines.push(Line::blank());
            } else {
                lines.push(Line::styled(Style::Normal, piece));
            }
        }
    }

    let choices = engine.current_choices();
    if choices.is_empty() {
        output.exit = Some(true);
    } else {
        for (index, choice) in choices.iter().enumerate() {
            let token = ChoiceToken::new(context.turn, index);
            lines.push(Line::choice(choice.text.clone(), token));
        }
        if flags.new_input {
            output.input = Some(vec![InputRequest::hyperlink(STORY_WINDOW)]);
        }
    }

    if !lines.is_empty() {
        output.content = Some(vec![ContentUpdate {
            id: STORY_WINDOW,
            text: lines,
        }]);
    }

    Ok(output)
}
