//! Practice screen - transcript that follows playback, with shadowing

use crossterm::event::KeyCode;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use tracing::warn;

use crate::cli::commands::format_timestamp;
use crate::config::Settings;
use crate::lifecycle::{DetailStream, PracticeState};
use crate::playback::{
    CommandSpeech, MediaClock, PlaybackClock, PlaybackSync, ScrollTarget, Voice,
};

/// Request produced by practice input, carried out by the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeAction {
    ToggleDone { lesson_id: String },
}

/// Transcript list position; the sync engine scrolls it to the active line
#[derive(Debug, Default)]
pub struct TranscriptView {
    state: ListState,
    center_on: Option<usize>,
}

impl TranscriptView {
    pub fn cursor(&self) -> Option<usize> {
        self.state.selected()
    }

    fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let current = self.state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.state.select(Some(next));
    }

    /// Apply a pending centering request for a viewport of `height` rows
    fn settle_offset(&mut self, heights: &[usize], height: usize) {
        let Some(index) = self.center_on.take() else {
            return;
        };
        let mut offset = index.min(heights.len().saturating_sub(1));
        let mut used = heights.get(offset).copied().unwrap_or(1);
        while offset > 0 && used + heights[offset - 1] <= height / 2 + 1 {
            offset -= 1;
            used += heights[offset];
        }
        *self.state.offset_mut() = offset;
    }
}

impl ScrollTarget for TranscriptView {
    fn bring_into_view(&mut self, index: usize) {
        self.state.select(Some(index));
        self.center_on = Some(index);
    }
}

/// Practice screen state for one lesson
pub struct PracticeScreen {
    title: String,
    stream: DetailStream,
    state: PracticeState,
    sync: Option<PlaybackSync<PlaybackClock, CommandSpeech>>,
    view: TranscriptView,
    speech: CommandSpeech,
    voice: Voice,
    skip_back_secs: f64,
    duration: Option<f64>,
    show_translation: bool,
    show_guide: bool,
    show_timestamps: bool,
    message: Option<String>,
}

impl PracticeScreen {
    pub fn new(settings: &Settings, title: String, duration: Option<f64>, stream: DetailStream) -> Self {
        Self {
            title,
            state: stream.state(),
            stream,
            sync: None,
            view: TranscriptView::default(),
            speech: CommandSpeech::from_settings(settings),
            voice: Voice::from_settings(settings),
            skip_back_secs: settings.practice.skip_back_secs,
            duration,
            show_translation: settings.tui.show_translation,
            show_guide: settings.tui.show_guide,
            show_timestamps: settings.tui.show_timestamps,
            message: None,
        }
    }

    pub fn lesson_id(&self) -> &str {
        self.stream.lesson_id()
    }

    /// Pick up detail changes and advance the transcript with the clock
    pub fn update(&mut self) {
        if self.stream.has_changed() {
            self.state = self.stream.mark_seen();
        }

        if self.sync.is_none() {
            if let PracticeState::Ready { transcript, .. } = &self.state {
                self.sync = Some(PlaybackSync::new(
                    transcript.clone(),
                    PlaybackClock::new(self.duration),
                    self.speech.clone(),
                    self.voice.clone(),
                ));
            }
        }

        if let Some(sync) = self.sync.as_mut() {
            sync.on_tick(&mut self.view);
            if sync.clock().is_at_end() {
                sync.clock_mut().pause();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<PracticeAction> {
        match key {
            KeyCode::Char('d') => {
                return Some(PracticeAction::ToggleDone {
                    lesson_id: self.lesson_id().to_string(),
                });
            }
            KeyCode::Char('t') => self.show_translation = !self.show_translation,
            KeyCode::Char('g') => self.show_guide = !self.show_guide,
            _ => {}
        }

        let Some(sync) = self.sync.as_mut() else {
            return None;
        };
        let len = sync.segments().len();

        match key {
            KeyCode::Up | KeyCode::Char('k') => self.view.move_cursor(-1, len),
            KeyCode::Down | KeyCode::Char('j') => self.view.move_cursor(1, len),
            KeyCode::Enter => {
                if let Some(index) = self.view.cursor() {
                    sync.seek_to_segment(index);
                }
            }
            KeyCode::Char(' ') => sync.toggle_play(),
            KeyCode::Left | KeyCode::Char('b') => sync.skip_back(self.skip_back_secs),
            KeyCode::Char('s') => {
                let index = self.view.cursor().or(sync.active());
                if let Some(index) = index {
                    if let Err(e) = sync.speak_segment(index) {
                        warn!("Speech failed: {}", e);
                        self.message = Some("Text-to-speech is unavailable.".to_string());
                    }
                }
            }
            _ => {}
        }
        None
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, done: bool, message: Option<&str>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Header
                Constraint::Min(5),    // Transcript
                Constraint::Length(1), // Message
                Constraint::Length(1), // Help
            ])
            .split(area);

        self.draw_header(frame, chunks[0], done);

        if matches!(self.state, PracticeState::Ready { .. }) {
            self.draw_transcript(frame, chunks[1]);
        } else {
            let (headline, detail) = self.state.describe();
            let waiting = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    headline,
                    Style::default().fg(Color::Yellow).bold(),
                )),
                Line::from(""),
                Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(waiting, chunks[1]);
        }

        if let Some(message) = message.or(self.message.as_deref()) {
            let line = Paragraph::new(message.to_string())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            frame.render_widget(line, chunks[2]);
        }

        let help = Paragraph::new(Line::from(vec![
            Span::styled(" Space ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Play/Pause  "),
            Span::styled(" Enter ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Jump  "),
            Span::styled(" s ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Speak  "),
            Span::styled(" d ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Done  "),
            Span::styled(" Esc ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Back"),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(help, chunks[3]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect, done: bool) {
        let mut meta = Vec::new();
        if let Some(sync) = &self.sync {
            let clock = sync.clock();
            let position = match clock.duration() {
                Some(total) => format!(
                    "{} / {}",
                    format_timestamp(clock.time()),
                    format_timestamp(total)
                ),
                None => format_timestamp(clock.time()),
            };
            let (icon, color) = if clock.is_playing() {
                ("▶", Color::Green)
            } else {
                ("⏸", Color::Yellow)
            };
            meta.push(Span::styled(format!("{} {}", icon, position), Style::default().fg(color)));
            meta.push(Span::raw(" • "));
            meta.push(Span::styled(
                format!("{} segments", sync.segments().len()),
                Style::default().fg(Color::DarkGray),
            ));
            meta.push(Span::raw(" • "));
        }
        meta.push(if done {
            Span::styled("✓ COMPLETED", Style::default().fg(Color::Green).bold())
        } else {
            Span::styled("IN PROGRESS", Style::default().fg(Color::DarkGray))
        });

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                self.title.clone(),
                Style::default().fg(Color::White).bold(),
            )),
            Line::from(meta),
        ])
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, area);
    }

    fn draw_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let Some(sync) = &self.sync else {
            return;
        };
        let active = sync.active();

        let mut heights = Vec::with_capacity(sync.segments().len());
        let items: Vec<ListItem> = sync
            .segments()
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                let is_active = Some(i) == active;
                let text_style = if is_active {
                    Style::default().fg(Color::Cyan).bold()
                } else {
                    Style::default().fg(Color::White)
                };

                let mut spans = Vec::new();
                if self.show_timestamps {
                    spans.push(Span::styled(
                        format!("[{}] ", format_timestamp(segment.start)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                spans.push(Span::styled(segment.text.clone(), text_style));

                let mut lines = vec![Line::from(spans)];
                if self.show_translation && !segment.translation.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", segment.translation),
                        Style::default().fg(Color::Green),
                    )));
                }
                if self.show_guide {
                    if let Some(guide) = &segment.guide {
                        lines.push(Line::from(Span::styled(
                            format!("    ♪ {}", guide),
                            Style::default().fg(Color::Magenta).italic(),
                        )));
                    }
                }

                heights.push(lines.len());
                ListItem::new(lines)
            })
            .collect();

        self.view
            .settle_offset(&heights, area.height.saturating_sub(2) as usize);

        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Transcript ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            )
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut self.view.state);
    }
}
