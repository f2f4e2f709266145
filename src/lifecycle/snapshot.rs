//! Lesson snapshot store
//!
//! A single cache entry for the lesson list. Polling runs while at least
//! one subscription is alive; the cached value is replaced wholesale on
//! every successful fetch and cleared when the last subscriber leaves.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{Lesson, LessonApi, LessonSnapshot};
use crate::lifecycle::poller::{spawn_poller, PollControl, PollHandle};
use crate::Result;

/// Query identity of the lesson list
pub const LESSONS_QUERY: &str = "/api/lessons";

/// Pseudo-category that selects every category
pub const ALL_CATEGORIES: &str = "All";

type Cell = watch::Sender<Option<Arc<LessonSnapshot>>>;

struct PollSlot {
    subscribers: usize,
    handle: Option<PollHandle>,
}

struct StoreInner {
    api: Arc<dyn LessonApi>,
    interval: Duration,
    cell: Arc<Cell>,
    slot: Mutex<PollSlot>,
}

/// Shared cache of the lesson list
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

impl SnapshotStore {
    pub fn new(api: Arc<dyn LessonApi>, interval: Duration) -> Self {
        let (cell, _) = watch::channel(None);
        Self {
            inner: Arc::new(StoreInner {
                api,
                interval,
                cell: Arc::new(cell),
                slot: Mutex::new(PollSlot {
                    subscribers: 0,
                    handle: None,
                }),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        LESSONS_QUERY
    }

    /// Latest snapshot, if one has been fetched
    pub fn current(&self) -> Option<Arc<LessonSnapshot>> {
        self.inner.cell.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock_slot().subscribers
    }

    /// Subscribe to the snapshot; the first subscriber starts polling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Subscription {
        let mut slot = self.inner.lock_slot();
        slot.subscribers += 1;

        if slot.handle.is_none() {
            debug!("Starting poll of {}", LESSONS_QUERY);
            let api = self.inner.api.clone();
            let cell = self.inner.cell.clone();
            slot.handle = Some(spawn_poller(
                self.inner.interval,
                move || {
                    let api = api.clone();
                    async move { api.list_lessons().await }
                },
                move |result| {
                    match result {
                        Ok(snapshot) => {
                            cell.send_replace(Some(Arc::new(snapshot)));
                        }
                        Err(e) => warn!("Failed to poll {}: {}", LESSONS_QUERY, e),
                    }
                    PollControl::Continue
                },
            ));
        }

        Subscription {
            rx: self.inner.cell.subscribe(),
            store: self.inner.clone(),
        }
    }

    /// Invalidate the cached value and fetch it again now
    pub async fn refresh(&self) -> Result<Arc<LessonSnapshot>> {
        let snapshot = Arc::new(self.inner.api.list_lessons().await?);
        self.inner.cell.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }
}

impl StoreInner {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, PollSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A live view of the snapshot store
pub struct Subscription {
    rx: watch::Receiver<Option<Arc<LessonSnapshot>>>,
    store: Arc<StoreInner>,
}

impl Subscription {
    pub fn current(&self) -> Option<Arc<LessonSnapshot>> {
        self.rx.borrow().clone()
    }

    /// Whether a new value arrived since the last `mark_seen`
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    pub fn mark_seen(&mut self) -> Option<Arc<LessonSnapshot>> {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next replacement of the snapshot
    pub async fn changed(&mut self) -> Option<Arc<LessonSnapshot>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut slot = self.store.lock_slot();
        slot.subscribers = slot.subscribers.saturating_sub(1);
        if slot.subscribers == 0 {
            debug!("Last subscriber gone, stopping poll of {}", LESSONS_QUERY);
            slot.handle = None;
            self.store.cell.send_replace(None);
        }
    }
}

/// Category tabs: `All` followed by the snapshot's categories
pub fn category_tabs(snapshot: &LessonSnapshot) -> Vec<String> {
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(snapshot.categories().map(str::to_string))
        .collect()
}

/// Heading for a category key: "daily_life" -> "DAILY LIFE"
pub fn category_label(category: &str) -> String {
    category.replacen('_', " ", 1).to_uppercase()
}

/// Progress over the whole snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub done: usize,
}

pub fn progress(snapshot: &LessonSnapshot) -> Progress {
    snapshot.iter().fold(Progress::default(), |mut acc, (_, lesson)| {
        acc.total += 1;
        if lesson.done {
            acc.done += 1;
        }
        acc
    })
}

/// Category and title filter over a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonFilter {
    /// `None` or `Some("All")` selects every category
    pub category: Option<String>,
    /// Case-insensitive title substring
    pub query: String,
}

impl LessonFilter {
    pub fn new(category: Option<String>, query: impl Into<String>) -> Self {
        Self {
            category,
            query: query.into(),
        }
    }

    fn wants_category(&self, category: &str) -> bool {
        match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(wanted) => wanted == category,
        }
    }

    /// Matching lessons grouped by category; empty categories are dropped
    pub fn apply<'a>(&self, snapshot: &'a LessonSnapshot) -> Vec<(&'a str, Vec<&'a Lesson>)> {
        let query = self.query.to_lowercase();

        snapshot
            .groups()
            .filter(|(category, _)| self.wants_category(category))
            .filter_map(|(category, lessons)| {
                let matches: Vec<&Lesson> = lessons
                    .iter()
                    .filter(|l| l.title.to_lowercase().contains(&query))
                    .collect();
                (!matches.is_empty()).then_some((category, matches))
            })
            .collect()
    }
}
