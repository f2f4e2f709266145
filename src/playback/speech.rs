//! Text-to-speech through an external synthesizer
//!
//! There is one speech slot per process: starting an utterance kills the
//! synthesizer still running for the previous one.

use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::playback::capabilities::{SpeechChannel, Utterance};
use crate::{FluencyError, Result};

/// espeak-ng's default speaking rate in words per minute
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

static ACTIVE: Mutex<Option<Child>> = Mutex::new(None);

fn active() -> MutexGuard<'static, Option<Child>> {
    ACTIVE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Speech channel backed by an espeak-ng compatible command
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.practice.speech_command.trim())
    }

    /// Command-line arguments for an utterance
    pub fn args(utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(1.0) as u32;
        vec![
            "-v".to_string(),
            utterance.language.to_lowercase(),
            "-s".to_string(),
            words_per_minute.to_string(),
            "--".to_string(),
            utterance.text.clone(),
        ]
    }

    /// Block until the current utterance has finished
    pub fn wait(&self) -> Result<()> {
        let child = active().take();
        if let Some(mut child) = child {
            child.wait()?;
        }
        Ok(())
    }
}

impl SpeechChannel for CommandSpeech {
    fn speak(&self, utterance: &Utterance) -> Result<()> {
        let mut slot = active();
        if let Some(mut previous) = slot.take() {
            let _ = previous.kill();
            let _ = previous.wait();
        }

        if utterance.text.trim().is_empty() {
            return Ok(());
        }

        debug!("Speaking {} chars with {}", utterance.text.len(), self.program);
        let child = Command::new(&self.program)
            .args(Self::args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                warn!("Failed to launch {}: {}", self.program, e);
                FluencyError::Speech(format!("Failed to launch {}: {}", self.program, e))
            })?;

        *slot = Some(child);
        Ok(())
    }

    fn cancel(&self) {
        if let Some(mut child) = active().take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
