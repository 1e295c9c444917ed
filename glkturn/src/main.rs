//! glkturn - run one turn of a choice-based story per process.
//!
//! Reads one GlkOte input event (JSON) from stdin, plays it against the
//! story, writes one update (JSON) to stdout and autosaves the session.
//!
//! ```bash
//! echo '{"type":"init","gen":0,"metrics":{"width":800,"height":480}}' \
//!     | glkturn --autorestore --autodir saves story.ink.json
//! ```
//!
//! Diagnostics go to stderr; stdout carries nothing but the update.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use glkturn_core::{run_invocation, SessionConfig};
use tokio::io::{self, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glkturn", version, about = "Play one turn of a story file")]
struct Cli {
    /// Story file: compiled ink (`.ink.json`) or a JSON passage story.
    #[arg(value_name = "STORY")]
    story: PathBuf,

    /// Resume from the autosave instead of starting over.
    #[arg(long)]
    autorestore: bool,

    /// Directory for autosave.json.
    #[arg(long, value_name = "DIR", env = "GLKTURN_AUTODIR", default_value = ".")]
    autodir: PathBuf,

    /// Log more to stderr (repeat for more).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SessionConfig::new(cli.story)
        .with_autorestore(cli.autorestore)
        .with_autosave_dir(cli.autodir);
    let store = config.store();

    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    let output = run_invocation(&config, &store, stdin, &mut stdout).await?;

    tracing::info!(gen = output.gen, exit = output.is_exit(), "turn complete");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
