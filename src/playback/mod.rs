//! Playback-transcript synchronization
//!
//! Maps a running playback clock onto the ordered transcript segments of a
//! lesson. Host interaction (clock, speech, scrolling) goes through the
//! capability traits so the engine itself stays testable.

pub mod capabilities;
pub mod clock;
pub mod speech;
pub mod sync;

pub use capabilities::{MediaClock, ScrollTarget, SpeechChannel, Utterance};
pub use clock::PlaybackClock;
pub use speech::CommandSpeech;
pub use sync::{locate, PlaybackSync, SyncEngine, Voice};
