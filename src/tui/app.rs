//! Main TUI application state and logic

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::prelude::*;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::api::build_api;
use crate::config::Settings;
use crate::lifecycle::{CommandOutcome, LifecycleTracker, Subscription};
use crate::tui::screens::{DashboardAction, DashboardScreen, PracticeAction, PracticeScreen};
use crate::tui::widgets::HelpPopup;

const MESSAGE_TTL: Duration = Duration::from_secs(4);

/// Current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Dashboard,
    Practice,
}

/// Main application state
pub struct App {
    settings: Settings,
    current_screen: AppScreen,
    show_help: bool,

    tracker: Arc<LifecycleTracker>,
    subscription: Subscription,

    // Screen states
    dashboard: DashboardScreen,
    practice: Option<PracticeScreen>,

    // Outcomes of commands running in the background
    outcomes_tx: mpsc::UnboundedSender<String>,
    outcomes_rx: mpsc::UnboundedReceiver<String>,
    message: Option<(String, Instant)>,
}

impl App {
    /// Create a new app instance and start polling lessons
    pub fn new(settings: Settings) -> Result<Self> {
        let api = build_api(&settings)?;
        let tracker = Arc::new(LifecycleTracker::from_settings(api, &settings));
        let subscription = tracker.subscribe();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Ok(Self {
            settings,
            current_screen: AppScreen::Dashboard,
            show_help: false,
            tracker,
            subscription,
            dashboard: DashboardScreen::new(),
            practice: None,
            outcomes_tx,
            outcomes_rx,
            message: None,
        })
    }

    fn message(&self) -> Option<&str> {
        self.message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < MESSAGE_TTL)
            .map(|(text, _)| text.as_str())
    }

    fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), Instant::now()));
    }

    /// Draw the current screen
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let message = self.message().map(str::to_string);

        match (self.current_screen, self.practice.as_mut()) {
            (AppScreen::Practice, Some(practice)) => {
                let done = self.tracker.is_done(practice.lesson_id());
                practice.draw(frame, area, done, message.as_deref());
            }
            _ => self.dashboard.draw(frame, area, message.as_deref()),
        }

        if self.show_help {
            HelpPopup::draw(frame, area, self.current_screen);
        }
    }

    /// Whether keys are going into a text field
    pub fn is_editing(&self) -> bool {
        self.current_screen == AppScreen::Dashboard && self.dashboard.is_editing()
    }

    /// Handle key input
    pub async fn handle_key(&mut self, key: KeyCode) -> Result<()> {
        if self.show_help {
            self.show_help = false;
            return Ok(());
        }

        match self.current_screen {
            AppScreen::Dashboard => {
                if let Some(action) = self.dashboard.handle_key(key) {
                    self.handle_dashboard_action(action);
                }
            }
            AppScreen::Practice => {
                let action = self.practice.as_mut().and_then(|p| p.handle_key(key));
                if let Some(PracticeAction::ToggleDone { lesson_id }) = action {
                    let done = !self.tracker.is_done(&lesson_id);
                    let tracker = self.tracker.clone();
                    let accepted = if done { "Marked as completed." } else { "Marked as not completed." };
                    self.spawn_command(accepted, async move {
                        tracker.toggle_done(&lesson_id, done).await
                    });
                }
            }
        }

        Ok(())
    }

    fn handle_dashboard_action(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::Rebuild => self.rebuild_dashboard(),
            DashboardAction::Refresh => {
                self.rebuild_dashboard();
                let tracker = self.tracker.clone();
                tokio::spawn(async move {
                    tracker.refresh().await;
                });
            }
            DashboardAction::Add { url } => {
                let category = self.settings.server.default_category.clone();
                let tracker = self.tracker.clone();
                self.set_message("Importing...");
                self.spawn_command("Lesson added! Processing started.", async move {
                    tracker.request_add(&url, &category).await
                });
            }
            DashboardAction::Start { category, lesson_id } => {
                let tracker = self.tracker.clone();
                self.spawn_command("Download started.", async move {
                    tracker.request_start(&category, &lesson_id).await
                });
                self.rebuild_dashboard();
            }
            DashboardAction::Open {
                category,
                lesson_id,
                title,
            } => {
                let duration = self
                    .subscription
                    .current()
                    .and_then(|s| s.find(&lesson_id).map(|(_, l)| l.duration as f64))
                    .filter(|d| *d > 0.0);
                let stream = self.tracker.watch_lesson(&category, &lesson_id);
                self.practice = Some(PracticeScreen::new(&self.settings, title, duration, stream));
                self.current_screen = AppScreen::Practice;
            }
        }
    }

    /// Run a command in the background and report its outcome as a message
    fn spawn_command<F>(&self, accepted: &'static str, command: F)
    where
        F: Future<Output = CommandOutcome> + Send + 'static,
    {
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let text = match command.await {
                CommandOutcome::Skipped => return,
                CommandOutcome::Accepted { .. } => accepted.to_string(),
                CommandOutcome::Failed(message) => message,
            };
            let _ = tx.send(text);
        });
    }

    fn rebuild_dashboard(&mut self) {
        if let Some(snapshot) = self.subscription.current() {
            self.dashboard.refresh(&snapshot, &self.tracker);
        }
    }

    /// Handle back navigation
    pub fn handle_back(&mut self) {
        if self.current_screen == AppScreen::Practice {
            // Dropping the practice screen stops its detail poll
            self.practice = None;
            self.current_screen = AppScreen::Dashboard;
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.current_screen == AppScreen::Dashboard && !self.show_help
    }

    /// Toggle help popup
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Update app state
    pub async fn update(&mut self) -> Result<()> {
        while let Ok(text) = self.outcomes_rx.try_recv() {
            self.set_message(text);
        }

        if self.subscription.has_changed() {
            self.subscription.mark_seen();
        }
        // Rebuilt every frame: starting indicators expire without a new snapshot
        self.rebuild_dashboard();

        if let Some(practice) = self.practice.as_mut() {
            practice.update();
        }

        Ok(())
    }
}
