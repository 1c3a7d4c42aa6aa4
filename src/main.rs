//! Ani terminal binary.

use std::sync::Arc;

use ani::audio::AudioOutput;
use ani::chat::Orchestrator;
use ani::cli::{run_repl, Cli};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("ANI_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| "ani=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ani::error::Result<()> {
    let config = cli.load_config()?;
    info!(model = %config.generation.model, voice = config.chat.voice_enabled, "Starting Ani");

    let chat = Arc::new(Orchestrator::from_config(config, audio_output()));
    run_repl(chat).await
}

#[cfg(feature = "playback")]
fn audio_output() -> Arc<dyn AudioOutput> {
    Arc::new(ani::audio::RodioOutput)
}

#[cfg(not(feature = "playback"))]
fn audio_output() -> Arc<dyn AudioOutput> {
    tracing::warn!("Built without the `playback` feature; voice replies are not audible");
    Arc::new(ani::audio::NullOutput)
}
