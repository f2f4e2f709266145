//! Host capabilities the sync engine drives

use crate::Result;

/// A media timeline that can be read, moved and resumed
pub trait MediaClock {
    /// Current playback position in seconds
    fn time(&self) -> f64;

    /// Jump to a position in seconds
    fn set_time(&mut self, secs: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;
}

/// Something to say and how to say it
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Relative to normal speed
    pub rate: f32,
    /// BCP 47 tag such as "en-US"
    pub language: String,
}

/// A speech output with a single slot: speaking replaces whatever was
/// being said.
pub trait SpeechChannel {
    fn speak(&self, utterance: &Utterance) -> Result<()>;

    fn cancel(&self);
}

/// A scrollable list of transcript items
pub trait ScrollTarget {
    /// Scroll so the item at `index` is visible and centered
    fn bring_into_view(&mut self, index: usize);
}
