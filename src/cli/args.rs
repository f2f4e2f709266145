//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// fluency - Shadowing practice with synced transcripts
#[derive(Parser, Debug)]
#[command(name = "fluency")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List lessons grouped by category
    Lessons {
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,

        /// Case-insensitive title filter
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Import a YouTube video as a new lesson
    Add {
        /// Video URL
        url: String,

        /// Category to file the lesson under (defaults to server.default_category)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Start downloading and processing a lesson
    Start {
        /// Lesson category
        category: String,

        /// Lesson ID
        id: String,

        /// Keep polling until processing finishes
        #[arg(short, long)]
        follow: bool,
    },

    /// Follow a lesson through the processing pipeline
    Watch {
        /// Lesson category
        category: String,

        /// Lesson ID
        id: String,
    },

    /// Mark a lesson as completed
    Done {
        /// Lesson ID
        id: String,

        /// Clear the completed flag instead
        #[arg(long)]
        undo: bool,
    },

    /// Print a lesson's transcript
    Transcript {
        /// Lesson category
        category: String,

        /// Lesson ID
        id: String,

        /// Include translations
        #[arg(short, long)]
        translation: bool,

        /// Include shadowing guides
        #[arg(short, long)]
        guide: bool,
    },

    /// Speak a sentence with the practice voice
    Say {
        /// Text to speak
        text: String,
    },

    /// Launch the interactive TUI
    Tui,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
