//! Per-lesson detail polling for the practice room

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::models::validate_transcript;
use crate::api::{LessonApi, LessonDetail, LessonStatus, TranscriptSegment};
use crate::lifecycle::poller::{spawn_poller, PollControl, PollHandle};

/// What the practice room can show for a lesson
#[derive(Debug, Clone, PartialEq)]
pub enum PracticeState {
    /// No response yet
    Loading,
    /// The backend is still working through the pipeline
    Processing(LessonStatus),
    /// Not started, not found, or a payload without a transcript
    NotReady,
    /// Transcript and media are available
    Ready {
        video_url: Option<String>,
        transcript: Arc<[TranscriptSegment]>,
    },
}

impl PracticeState {
    pub fn from_detail(detail: &LessonDetail) -> Self {
        if detail.status.is_processing() {
            return Self::Processing(detail.status);
        }

        match (&detail.status, &detail.transcript) {
            (LessonStatus::Ready, Some(transcript)) => Self::Ready {
                video_url: detail.video_url.clone(),
                transcript: transcript.clone().into(),
            },
            _ => Self::NotReady,
        }
    }

    /// Whether another poll can change this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading | Self::Processing(_))
    }

    /// Headline and explanation for the waiting screen
    pub fn describe(&self) -> (&'static str, &'static str) {
        match self {
            Self::Loading => ("Loading", "Fetching lesson..."),
            Self::Processing(LessonStatus::Downloading) => {
                ("Downloading Video", "Fetching content from YouTube...")
            }
            Self::Processing(LessonStatus::Transcribing) => {
                ("Transcribing Audio", "Extracting text timestamps...")
            }
            Self::Processing(LessonStatus::GeneratingAi) => (
                "AI Processing",
                "Generating translations and shadowing guides...",
            ),
            Self::Processing(_) => ("Processing...", "Please wait."),
            Self::NotReady => (
                "Lesson Not Ready",
                "This lesson has not been generated yet.",
            ),
            Self::Ready { .. } => ("Ready", "Transcript loaded."),
        }
    }
}

/// Live detail of one lesson, polled while it is processing.
///
/// Dropping the stream stops polling; a response already in flight is
/// discarded when it lands.
pub struct DetailStream {
    category: String,
    lesson_id: String,
    rx: watch::Receiver<PracticeState>,
    handle: PollHandle,
}

impl DetailStream {
    /// Start polling `GET /api/lesson/{category}/{id}`.
    ///
    /// Polling continues while the lesson is processing and stops on the
    /// first terminal status. A failed fetch is logged and ends the stream.
    pub fn spawn(
        api: Arc<dyn LessonApi>,
        category: &str,
        lesson_id: &str,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(PracticeState::Loading);

        let fetch_category = category.to_string();
        let fetch_id = lesson_id.to_string();
        let label = format!("{}/{}", category, lesson_id);

        let handle = spawn_poller(
            interval,
            move || {
                let api = api.clone();
                let category = fetch_category.clone();
                let lesson_id = fetch_id.clone();
                async move { api.lesson_detail(&category, &lesson_id).await }
            },
            move |result| match result {
                Ok(detail) => {
                    if let Some(transcript) = &detail.transcript {
                        if let Err(i) = validate_transcript(transcript) {
                            warn!("Transcript of {} is out of order at segment {}", label, i);
                        }
                    }

                    let state = PracticeState::from_detail(&detail);
                    debug!("Lesson {} is {}", label, detail.status.as_str());
                    let keep_polling = detail.status.is_processing();
                    tx.send_replace(state);

                    if keep_polling {
                        PollControl::Continue
                    } else {
                        PollControl::Stop
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch lesson {}: {}", label, e);
                    tx.send_if_modified(|state| {
                        if *state == PracticeState::Loading {
                            *state = PracticeState::NotReady;
                            true
                        } else {
                            false
                        }
                    });
                    PollControl::Stop
                }
            },
        );

        Self {
            category: category.to_string(),
            lesson_id: lesson_id.to_string(),
            rx,
            handle,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn state(&self) -> PracticeState {
        self.rx.borrow().clone()
    }

    /// Whether a state arrived since the last `mark_seen`
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) -> PracticeState {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next state; `None` once polling has ended for good
    pub async fn changed(&mut self) -> Option<PracticeState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Whether a further fetch may still be scheduled
    pub fn is_polling(&self) -> bool {
        self.handle.is_alive() && !self.handle.is_finished()
    }

    /// Wait until polling has ended on its own
    pub async fn finished(self) -> PracticeState {
        let Self { rx, handle, .. } = self;
        handle.join().await;
        let state = rx.borrow().clone();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_without_transcript_is_not_ready() {
        let detail = LessonDetail::with_status(LessonStatus::Ready);
        assert_eq!(PracticeState::from_detail(&detail), PracticeState::NotReady);
    }

    #[test]
    fn processing_statuses_are_not_terminal() {
        for status in [
            LessonStatus::Downloading,
            LessonStatus::Transcribing,
            LessonStatus::GeneratingAi,
        ] {
            let state = PracticeState::from_detail(&LessonDetail::with_status(status));
            assert_eq!(state, PracticeState::Processing(status));
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn not_started_and_not_found_are_terminal() {
        for status in [LessonStatus::NotStarted, LessonStatus::NotFound] {
            let state = PracticeState::from_detail(&LessonDetail::with_status(status));
            assert_eq!(state, PracticeState::NotReady);
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn waiting_screen_text_follows_stage() {
        let state = PracticeState::Processing(LessonStatus::Transcribing);
        assert_eq!(state.describe().0, "Transcribing Audio");
    }
}
