//! Playback-transcript synchronization

use std::sync::Arc;

use crate::api::TranscriptSegment;
use crate::config::Settings;
use crate::playback::capabilities::{MediaClock, ScrollTarget, SpeechChannel, Utterance};
use crate::Result;

/// Index of the first segment whose inclusive range contains `time`.
///
/// Segments are scanned in order, so a time on a shared boundary belongs
/// to the earlier segment.
pub fn locate(time: f64, segments: &[TranscriptSegment]) -> Option<usize> {
    segments.iter().position(|s| s.contains(time))
}

/// Tracks the active segment for a playback position.
///
/// Gaps and out-of-range times keep the previous index, and a tick only
/// reports an index when it differs from the last one reported.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    segments: Arc<[TranscriptSegment]>,
    active: Option<usize>,
}

impl SyncEngine {
    pub fn new(segments: Arc<[TranscriptSegment]>) -> Self {
        Self {
            segments,
            active: None,
        }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Feed a playback position; returns the new index only on change
    pub fn tick(&mut self, time: f64) -> Option<usize> {
        let index = locate(time, &self.segments)?;
        if self.active == Some(index) {
            return None;
        }
        self.active = Some(index);
        Some(index)
    }
}

/// Speech parameters applied to every utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub rate: f32,
    pub language: String,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            rate: 0.9,
            language: "en-US".to_string(),
        }
    }
}

impl Voice {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rate: settings.practice.speech_rate,
            language: settings.practice.speech_language.clone(),
        }
    }
}

/// The sync engine wired to a media clock and a speech channel
pub struct PlaybackSync<C, S> {
    engine: SyncEngine,
    clock: C,
    speech: S,
    voice: Voice,
}

impl<C: MediaClock, S: SpeechChannel> PlaybackSync<C, S> {
    pub fn new(segments: Arc<[TranscriptSegment]>, clock: C, speech: S, voice: Voice) -> Self {
        Self {
            engine: SyncEngine::new(segments),
            clock,
            speech,
            voice,
        }
    }

    pub fn active(&self) -> Option<usize> {
        self.engine.active()
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        self.engine.segments()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Read the clock and, if the active segment changed, scroll to it
    pub fn on_tick(&mut self, target: &mut impl ScrollTarget) -> Option<usize> {
        let changed = self.engine.tick(self.clock.time());
        if let Some(index) = changed {
            target.bring_into_view(index);
        }
        changed
    }

    /// Move the clock and resume playback; the next tick picks the segment
    pub fn seek(&mut self, secs: f64) {
        self.clock.set_time(secs.max(0.0));
        self.clock.play();
    }

    pub fn seek_to_segment(&mut self, index: usize) {
        if let Some(start) = self.engine.segments().get(index).map(|s| s.start) {
            self.seek(start);
        }
    }

    /// Jump back `secs` without changing play/pause state
    pub fn skip_back(&mut self, secs: f64) {
        let target = (self.clock.time() - secs).max(0.0);
        self.clock.set_time(target);
    }

    pub fn toggle_play(&mut self) {
        if self.clock.is_playing() {
            self.clock.pause();
        } else {
            self.clock.play();
        }
    }

    /// Say `text`, cutting off anything still being said
    pub fn speak(&self, text: &str) -> Result<()> {
        self.speech.cancel();
        self.speech.speak(&Utterance {
            text: text.to_string(),
            rate: self.voice.rate,
            language: self.voice.language.clone(),
        })
    }

    pub fn speak_segment(&self, index: usize) -> Result<()> {
        match self.engine.segments().get(index) {
            Some(segment) => self.speak(&segment.text),
            None => Ok(()),
        }
    }
}
