//! Terminal front-end: argument parsing and a line-oriented chat loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::chat::{DropReason, Orchestrator, SubmitOutcome};
use crate::config::AniConfig;
use crate::error::Result;
use crate::types::Turn;

/// Ani voice companion
#[derive(Parser, Debug)]
#[command(name = "ani", version, about = "Chat with Ani from the terminal")]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start with voice replies enabled
    #[arg(long)]
    pub voice: bool,

    /// Override the Gemini model
    #[arg(short, long)]
    pub model: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration for this invocation.
    pub fn load_config(&self) -> Result<AniConfig> {
        let mut config = match &self.config {
            Some(path) => AniConfig::load(path)?,
            None => AniConfig::load_default()?,
        };
        if self.voice {
            config.chat.voice_enabled = true;
        }
        if let Some(model) = &self.model {
            config.generation.model = model.clone();
        }
        Ok(config)
    }
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleVoice,
    History,
    Stop,
    Quit,
    Help,
    Unknown(String),
    Say(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(name) = trimmed.strip_prefix('/') else {
            return Command::Say(line.to_string());
        };
        match name {
            "voice" => Command::ToggleVoice,
            "history" => Command::History,
            "stop" => Command::Stop,
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub fn format_turn(turn: &Turn) -> String {
    format!("[{}] {}: {}", turn.display_time, turn.sender, turn.text)
}

const HELP: &str = "/voice toggle spoken replies, /history show the conversation, /stop silence playback, /quit exit";

/// Read lines from stdin until EOF or `/quit`.
pub async fn run_repl(chat: Arc<Orchestrator>) -> Result<()> {
    run_repl_with(chat, BufReader::new(tokio::io::stdin())).await
}

/// Chat loop over any line source.
///
/// Messages are submitted on their own task so commands keep working while
/// a reply is pending. A message typed during that time is dropped as busy.
pub async fn run_repl_with<R>(chat: Arc<Orchestrator>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    for turn in chat.turns() {
        println!("{}", format_turn(&turn));
    }
    println!("(voice {}; /help for commands)", on_off(chat.voice_enabled()));

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::ToggleVoice => println!("(voice {})", on_off(chat.toggle_voice())),
            Command::Stop => chat.stop_playback(),
            Command::History => {
                for turn in chat.conversation().newest_first() {
                    println!("{}", format_turn(turn));
                }
            }
            Command::Unknown(name) => eprintln!("unknown command /{name}; try /help"),
            Command::Say(text) => {
                tokio::spawn(say(Arc::clone(&chat), text));
            }
        }
    }

    chat.stop_playback();
    Ok(())
}

async fn say(chat: Arc<Orchestrator>, text: String) {
    let seen = chat.turns().len();
    match chat.submit(&text).await {
        Ok(SubmitOutcome::Dropped(DropReason::EmptyInput)) => {}
        Ok(SubmitOutcome::Dropped(DropReason::Busy)) => {
            eprintln!("(still answering, message dropped)");
        }
        Ok(_) => {
            for turn in chat.turns().iter().skip(seen + 1) {
                println!("{}", format_turn(turn));
            }
        }
        Err(err) => {
            eprintln!("error: {err} ({:?})", err.recovery_suggestion());
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
