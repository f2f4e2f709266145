//! Short-lived local state layered over the authoritative snapshot

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Lessons with a start request in flight or recently settled.
///
/// An entry is added when the request is sent and expires a fixed delay
/// after the request settles, whatever the next poll says.
#[derive(Debug)]
pub struct StartingOverlay {
    linger: Duration,
    // None while the request is in flight, then the expiry instant.
    entries: Mutex<HashMap<String, Option<Instant>>>,
}

impl StartingOverlay {
    pub fn new(linger: Duration) -> Self {
        Self {
            linger,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Mark a lesson as starting, with no expiry yet
    pub fn begin(&self, lesson_id: &str) {
        self.lock().insert(lesson_id.to_string(), None);
    }

    /// The start request settled; expire the mark after the linger delay
    pub fn settle(&self, lesson_id: &str) {
        let deadline = Instant::now() + self.linger;
        self.lock().insert(lesson_id.to_string(), Some(deadline));
    }

    pub fn contains(&self, lesson_id: &str) -> bool {
        let mut entries = self.lock();
        match entries.get(lesson_id) {
            Some(None) => true,
            Some(Some(deadline)) if Instant::now() < *deadline => true,
            Some(Some(_)) => {
                entries.remove(lesson_id);
                false
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<Instant>>> {
        // A panic while holding this lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Completion flags the user has set but the snapshot has not confirmed
#[derive(Debug, Default)]
pub struct DoneOverlay {
    entries: Mutex<HashMap<String, bool>>,
}

impl DoneOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, lesson_id: &str, done: bool) {
        self.lock().insert(lesson_id.to_string(), done);
    }

    pub fn get(&self, lesson_id: &str) -> Option<bool> {
        self.lock().get(lesson_id).copied()
    }

    /// Drop the local value if it is still `done`; the snapshot is
    /// authoritative again. A newer value set meanwhile is kept.
    pub fn confirm(&self, lesson_id: &str, done: bool) {
        let mut entries = self.lock();
        if entries.get(lesson_id) == Some(&done) {
            entries.remove(lesson_id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
