//! fluency - A terminal companion for shadowing practice
//!
//! Tracks lessons through the backend's download, transcription and AI
//! enrichment pipeline, and keeps a transcript in step with playback.

pub mod api;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod playback;
pub mod tui;

use thiserror::Error;

/// Main error type for fluency
#[derive(Error, Debug)]
pub enum FluencyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Speech error: {0}")]
    Speech(String),
}

pub type Result<T> = std::result::Result<T, FluencyError>;

/// Application name
pub const APP_NAME: &str = "fluency";
