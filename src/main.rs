//! fluency - Shadowing practice with synced transcripts
//!
//! Entry point for the fluency CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fluency::cli::{Cli, Commands};
use fluency::config::Settings;

fn init_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            fluency::cli::completions::print(shell);
        }
        command => {
            // Load configuration only for runtime commands.
            let settings = Settings::load()?;

            // Log lines would draw over the TUI
            let default_level = match (&command, cli.verbose) {
                (_, true) => "debug",
                (Commands::Tui, false) => "off",
                _ => settings.general.log_level.as_str(),
            };
            init_logging(default_level);

            match command {
                Commands::Lessons { category, search } => {
                    fluency::cli::commands::list_lessons(&settings, category, search).await?;
                }
                Commands::Add { url, category } => {
                    fluency::cli::commands::add_lesson(&settings, &url, category).await?;
                }
                Commands::Start {
                    category,
                    id,
                    follow,
                } => {
                    fluency::cli::commands::start_lesson(&settings, &category, &id, follow).await?;
                }
                Commands::Watch { category, id } => {
                    fluency::cli::commands::watch_lesson(&settings, &category, &id).await?;
                }
                Commands::Done { id, undo } => {
                    fluency::cli::commands::mark_done(&settings, &id, undo).await?;
                }
                Commands::Transcript {
                    category,
                    id,
                    translation,
                    guide,
                } => {
                    fluency::cli::commands::show_transcript(
                        &settings,
                        &category,
                        &id,
                        translation,
                        guide,
                    )
                    .await?;
                }
                Commands::Say { text } => {
                    fluency::cli::commands::say(&settings, &text).await?;
                }
                Commands::Tui => {
                    fluency::tui::run(&settings).await?;
                }
                Commands::Config(config_cmd) => {
                    fluency::cli::commands::config_command(&settings, config_cmd)?;
                }
                Commands::Completions { .. } => unreachable!(),
            }
        }
    }

    Ok(())
}
