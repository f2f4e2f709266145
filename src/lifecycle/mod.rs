//! Lesson lifecycle tracking
//!
//! The backend owns each lesson's status and moves it through
//! `not_started -> downloading -> transcribing -> generating_ai -> ready`.
//! The client only observes that by polling and requests transitions.

pub mod detail;
pub mod overlay;
pub mod poller;
pub mod snapshot;
pub mod tracker;

pub use detail::{DetailStream, PracticeState};
pub use poller::{spawn_poller, Liveness, PollControl, PollHandle};
pub use snapshot::{
    category_label, category_tabs, LessonFilter, Progress, SnapshotStore, Subscription,
    ALL_CATEGORIES,
};
pub use tracker::{Affordance, CommandOutcome, LessonCard, LifecycleTracker};
