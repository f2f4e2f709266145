//! Wall-clock driven media clock

use tokio::time::Instant;

use crate::playback::capabilities::MediaClock;

/// Playback position that advances in real time while playing.
///
/// Stands in for a video element's timeline: the terminal cannot show the
/// video, but the transcript still follows the lesson's running time.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Position when the clock was last anchored
    base: f64,
    /// Set while playing
    anchor: Option<Instant>,
    /// Upper bound in seconds, if known
    duration: Option<f64>,
}

impl PlaybackClock {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            base: 0.0,
            anchor: None,
            duration: duration.filter(|d| *d > 0.0),
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn clamp(&self, secs: f64) -> f64 {
        let secs = secs.max(0.0);
        match self.duration {
            Some(end) => secs.min(end),
            None => secs,
        }
    }

    fn raw_time(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.base + anchor.elapsed().as_secs_f64(),
            None => self.base,
        }
    }

    /// Whether playback has run past the end
    pub fn is_at_end(&self) -> bool {
        matches!(self.duration, Some(end) if self.raw_time() >= end)
    }
}

impl MediaClock for PlaybackClock {
    fn time(&self) -> f64 {
        self.clamp(self.raw_time())
    }

    fn set_time(&mut self, secs: f64) {
        self.base = self.clamp(secs);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    fn play(&mut self) {
        if self.is_at_end() {
            self.base = 0.0;
            self.anchor = None;
        }
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base = self.time();
        self.anchor = None;
    }

    fn is_playing(&self) -> bool {
        self.anchor.is_some() && !self.is_at_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_only_while_playing() {
        let mut clock = PlaybackClock::new(None);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(clock.time(), 0.0);

        clock.play();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!((clock.time() - 3.0).abs() < 1e-6);

        clock.pause();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!((clock.time() - 3.0).abs() < 1e-6);
        assert!(!clock.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn seek_while_playing_keeps_running() {
        let mut clock = PlaybackClock::new(Some(60.0));
        clock.play();
        clock.set_time(40.0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((clock.time() - 45.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_duration() {
        let mut clock = PlaybackClock::new(Some(10.0));
        clock.set_time(8.0);
        clock.play();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.time(), 10.0);
        assert!(!clock.is_playing());

        clock.play();
        assert_eq!(clock.time(), 0.0);
    }
}
