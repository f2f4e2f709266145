//! Lifecycle tracker: derived per-lesson state and the commands that ask
//! the backend to move a lesson along

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::{
    AddLessonRequest, DoneRequest, Lesson, LessonApi, LessonSnapshot, LessonStatus,
    StartLessonRequest,
};
use crate::config::Settings;
use crate::lifecycle::detail::DetailStream;
use crate::lifecycle::overlay::{DoneOverlay, StartingOverlay};
use crate::lifecycle::snapshot::{LessonFilter, Progress, SnapshotStore, Subscription};
use crate::FluencyError;

/// Result of a user command, ready to show as a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Precondition not met; nothing was sent
    Skipped,
    /// The backend accepted the request
    Accepted { lesson_id: Option<String> },
    /// The request failed; the message is meant for the user
    Failed(String),
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// What the user can do with a lesson right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Ready: open the practice room
    Practice,
    /// Processing or a start request is pending
    Busy,
    /// Not started (or lost): offer to start processing
    Start,
}

/// A lesson merged with local overlays
#[derive(Debug, Clone, PartialEq)]
pub struct LessonCard {
    pub category: String,
    pub lesson: Lesson,
    pub starting: bool,
}

impl LessonCard {
    pub fn status(&self) -> LessonStatus {
        self.lesson.status
    }

    pub fn affordance(&self) -> Affordance {
        if self.lesson.is_ready() {
            Affordance::Practice
        } else if self.lesson.is_processing() || self.starting {
            Affordance::Busy
        } else {
            Affordance::Start
        }
    }
}

/// Mediates every state-changing command and merges local overlays into
/// the polled snapshot.
pub struct LifecycleTracker {
    api: Arc<dyn LessonApi>,
    store: SnapshotStore,
    starting: StartingOverlay,
    done: DoneOverlay,
    poll_interval: Duration,
}

impl LifecycleTracker {
    pub fn new(api: Arc<dyn LessonApi>, poll_interval: Duration, starting_linger: Duration) -> Self {
        Self {
            store: SnapshotStore::new(api.clone(), poll_interval),
            api,
            starting: StartingOverlay::new(starting_linger),
            done: DoneOverlay::new(),
            poll_interval,
        }
    }

    pub fn from_settings(api: Arc<dyn LessonApi>, settings: &Settings) -> Self {
        Self::new(api, settings.poll_interval(), settings.starting_indicator())
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Start (or join) the periodic lesson list poll
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// Poll the detail of one lesson while it is processing
    pub fn watch_lesson(&self, category: &str, lesson_id: &str) -> DetailStream {
        DetailStream::spawn(self.api.clone(), category, lesson_id, self.poll_interval)
    }

    /// Submit a new lesson for ingestion
    pub async fn request_add(&self, url: &str, category: &str) -> CommandOutcome {
        let url = url.trim();
        if url.is_empty() {
            return CommandOutcome::Skipped;
        }

        let request = AddLessonRequest {
            url: url.to_string(),
            category: category.to_string(),
        };

        match self.api.add_lesson(&request).await {
            Ok(response) => {
                info!("Lesson queued from {}", url);
                self.refresh().await;
                CommandOutcome::Accepted {
                    lesson_id: response.lesson_id,
                }
            }
            Err(FluencyError::Rejected { detail, .. }) => {
                warn!("Backend rejected {}: {}", url, detail);
                CommandOutcome::Failed(detail)
            }
            Err(e) => {
                error!("Failed to add lesson: {}", e);
                CommandOutcome::Failed("Failed to connect to server.".to_string())
            }
        }
    }

    /// Ask the backend to start processing a lesson.
    ///
    /// The lesson reads as starting from the moment this is called until
    /// the linger delay after the request settles.
    pub async fn request_start(&self, category: &str, lesson_id: &str) -> CommandOutcome {
        self.starting.begin(lesson_id);

        let request = StartLessonRequest {
            category: category.to_string(),
            lesson_id: lesson_id.to_string(),
        };

        let outcome = match self.api.start_lesson(&request).await {
            Ok(()) => {
                info!("Started processing {}/{}", category, lesson_id);
                self.refresh().await;
                CommandOutcome::Accepted {
                    lesson_id: Some(lesson_id.to_string()),
                }
            }
            Err(e) => {
                error!("Failed to start {}/{}: {}", category, lesson_id, e);
                CommandOutcome::Failed("Failed to start download.".to_string())
            }
        };

        self.starting.settle(lesson_id);
        outcome
    }

    /// Set the completion flag, optimistically.
    ///
    /// The local flag flips before the request is sent and is not rolled
    /// back if the request fails; it stays until a later toggle of the
    /// same lesson is saved and refreshed.
    pub async fn toggle_done(&self, lesson_id: &str, done: bool) -> CommandOutcome {
        if done {
            if let Some(snapshot) = self.store.current() {
                if let Some((_, lesson)) = snapshot.find(lesson_id) {
                    if !lesson.is_ready() {
                        return CommandOutcome::Failed(format!(
                            "Lesson {} is not ready yet.",
                            lesson_id
                        ));
                    }
                }
            }
        }

        self.done.set(lesson_id, done);

        let request = DoneRequest {
            lesson_id: lesson_id.to_string(),
            done,
        };

        let saved = match self.api.set_done(&request).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to mark {} done={}: {}", lesson_id, done, e);
                false
            }
        };

        if self.refresh().await.is_some() && saved {
            self.done.confirm(lesson_id, done);
        }

        if saved {
            CommandOutcome::Accepted {
                lesson_id: Some(lesson_id.to_string()),
            }
        } else {
            CommandOutcome::Failed("Failed to save progress.".to_string())
        }
    }

    /// Refetch the snapshot now, logging failures
    pub async fn refresh(&self) -> Option<Arc<LessonSnapshot>> {
        match self.store.refresh().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Failed to refresh lessons: {}", e);
                None
            }
        }
    }

    pub fn is_starting(&self, lesson_id: &str) -> bool {
        self.starting.contains(lesson_id)
    }

    /// Completion flag with any unconfirmed local change applied
    pub fn is_done(&self, lesson_id: &str) -> bool {
        if let Some(done) = self.done.get(lesson_id) {
            return done;
        }
        self.store
            .current()
            .and_then(|snapshot| snapshot.find(lesson_id).map(|(_, l)| l.done))
            .unwrap_or(false)
    }

    /// Status of a lesson in the latest snapshot
    pub fn status(&self, lesson_id: &str) -> Option<LessonStatus> {
        self.store
            .current()
            .and_then(|snapshot| snapshot.find(lesson_id).map(|(_, l)| l.status))
    }

    fn card(&self, category: &str, lesson: &Lesson) -> LessonCard {
        let mut lesson = lesson.clone();
        if let Some(done) = self.done.get(&lesson.id) {
            lesson.done = done;
        }
        LessonCard {
            category: category.to_string(),
            starting: self.starting.contains(&lesson.id),
            lesson,
        }
    }

    /// Filtered lesson cards grouped by category, overlays applied
    pub fn board(&self, snapshot: &LessonSnapshot, filter: &LessonFilter) -> Vec<(String, Vec<LessonCard>)> {
        filter
            .apply(snapshot)
            .into_iter()
            .map(|(category, lessons)| {
                let cards = lessons.iter().map(|l| self.card(category, l)).collect();
                (category.to_string(), cards)
            })
            .collect()
    }

    /// Progress with unconfirmed completion flags applied
    pub fn progress(&self, snapshot: &LessonSnapshot) -> Progress {
        snapshot.iter().fold(Progress::default(), |mut acc, (_, lesson)| {
            acc.total += 1;
            if self.done.get(&lesson.id).unwrap_or(lesson.done) {
                acc.done += 1;
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(status: LessonStatus) -> Lesson {
        Lesson {
            id: "x".to_string(),
            title: "X".to_string(),
            level: "A1".to_string(),
            duration: 0,
            source: String::new(),
            url: None,
            done: false,
            status,
        }
    }

    fn card(status: LessonStatus, starting: bool) -> LessonCard {
        LessonCard {
            category: "custom".to_string(),
            lesson: lesson(status),
            starting,
        }
    }

    #[test]
    fn affordance_gates_on_status() {
        assert_eq!(card(LessonStatus::Ready, false).affordance(), Affordance::Practice);
        assert_eq!(card(LessonStatus::Ready, true).affordance(), Affordance::Practice);
        assert_eq!(card(LessonStatus::Transcribing, false).affordance(), Affordance::Busy);
        assert_eq!(card(LessonStatus::NotStarted, true).affordance(), Affordance::Busy);
        assert_eq!(card(LessonStatus::NotStarted, false).affordance(), Affordance::Start);
        assert_eq!(card(LessonStatus::NotFound, false).affordance(), Affordance::Start);
    }
}
