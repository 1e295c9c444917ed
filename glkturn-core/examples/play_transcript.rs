//! Play a story through a sequence of simulated invocations and print each
//! update, the way a GlkOte front end would receive them.
//!
//! ```bash
//! cargo run -p glkturn-core --example play_transcript -- story.ink.json 0 1 0
//! ```
//!
//! Each number after the story path picks a choice on the following turn.

use glkturn_core::{parse_story, InputEvent, MemoryStore, Session, SessionStore};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: play_transcript <story.json> [choice...]")?;
    let picks: Vec<usize> = args.map(|a| a.parse()).collect::<Result<_, _>>()?;

    let content = tokio::fs::read_to_string(&path).await?;
    let store = MemoryStore::new();

    let mut events = vec![json!({
        "type": "init",
        "gen": 0,
        "metrics": { "width": 800, "height": 480 }
    })];
    events.extend(picks.iter().enumerate().map(|(i, pick)| {
        json!({ "type": "hyperlink", "window": 1, "value": format!("{}:{pick}", i + 1) })
    }));

    for (n, event) in events.iter().enumerate() {
        // Every invocation starts from a freshly loaded story.
        let engine = parse_story(&content)?;
        let mut session = match store.load().await? {
            Some(snapshot) => Session::resume(engine, snapshot)?,
            None => Session::new(engine),
        };

        let output = session.turn(&InputEvent::classify(event))?;
        if let Some(snapshot) = session.snapshot() {
            store.save(&snapshot).await?;
        }

        println!("--- invocation {} ---", n + 1);
        println!("> {event}");
        println!("{}", serde_json::to_string_pretty(&output)?);

        if output.is_exit() {
            println!("\n=== Story finished ===");
            break;
        }
    }

    Ok(())
}
