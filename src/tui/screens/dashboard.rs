//! Dashboard screen - lessons by category with their processing status

use crossterm::event::KeyCode;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
};

use crate::api::{LessonSnapshot, LessonStatus, LevelBand};
use crate::lifecycle::{
    category_label, category_tabs, Affordance, LessonCard, LessonFilter, LifecycleTracker,
    Progress, ALL_CATEGORIES,
};

/// What typed characters go to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    AddUrl,
}

/// Request produced by dashboard input, carried out by the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    Open { category: String, lesson_id: String, title: String },
    Start { category: String, lesson_id: String },
    Add { url: String },
    /// Filter or tab changed; re-render from the cached snapshot
    Rebuild,
    /// Refetch the lesson list from the backend
    Refresh,
}

/// Dashboard screen state
pub struct DashboardScreen {
    tabs: Vec<String>,
    active_tab: usize,
    cards: Vec<LessonCard>,
    progress: Progress,
    state: ListState,
    mode: InputMode,
    search_query: String,
    add_url: String,
    loaded: bool,
}

impl Default for DashboardScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            tabs: vec![ALL_CATEGORIES.to_string()],
            active_tab: 0,
            cards: Vec::new(),
            progress: Progress::default(),
            state: ListState::default(),
            mode: InputMode::Normal,
            search_query: String::new(),
            add_url: String::new(),
            loaded: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.mode != InputMode::Normal
    }

    fn filter(&self) -> LessonFilter {
        LessonFilter::new(
            self.tabs.get(self.active_tab).cloned(),
            self.search_query.clone(),
        )
    }

    /// Rebuild cards from the latest snapshot and local overlays
    pub fn refresh(&mut self, snapshot: &LessonSnapshot, tracker: &LifecycleTracker) {
        let active = self.tabs.get(self.active_tab).cloned();
        self.tabs = category_tabs(snapshot);
        self.active_tab = active
            .and_then(|name| self.tabs.iter().position(|t| *t == name))
            .unwrap_or(0);

        let selected_id = self.selected().map(|c| c.lesson.id.clone());

        self.cards = tracker
            .board(snapshot, &self.filter())
            .into_iter()
            .flat_map(|(_, cards)| cards)
            .collect();
        self.progress = tracker.progress(snapshot);
        self.loaded = true;

        let index = selected_id
            .and_then(|id| self.cards.iter().position(|c| c.lesson.id == id))
            .or(if self.cards.is_empty() { None } else { Some(0) });
        self.state.select(index);
    }

    pub fn selected(&self) -> Option<&LessonCard> {
        self.state.selected().and_then(|i| self.cards.get(i))
    }

    /// Handle a key; returns an action for the app to carry out
    pub fn handle_key(&mut self, key: KeyCode) -> Option<DashboardAction> {
        match self.mode {
            InputMode::Search => {
                match key {
                    KeyCode::Char(c) => self.search_query.push(c),
                    KeyCode::Backspace => {
                        self.search_query.pop();
                    }
                    KeyCode::Enter | KeyCode::Esc => self.mode = InputMode::Normal,
                    _ => {}
                }
                Some(DashboardAction::Rebuild)
            }
            InputMode::AddUrl => match key {
                KeyCode::Char(c) => {
                    self.add_url.push(c);
                    None
                }
                KeyCode::Backspace => {
                    self.add_url.pop();
                    None
                }
                KeyCode::Esc => {
                    self.mode = InputMode::Normal;
                    self.add_url.clear();
                    None
                }
                KeyCode::Enter => {
                    self.mode = InputMode::Normal;
                    let url = std::mem::take(&mut self.add_url);
                    Some(DashboardAction::Add { url })
                }
                _ => None,
            },
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyCode) -> Option<DashboardAction> {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                self.previous();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.next();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.active_tab = self.active_tab.checked_sub(1).unwrap_or(self.tabs.len() - 1);
                Some(DashboardAction::Rebuild)
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                self.active_tab = (self.active_tab + 1) % self.tabs.len();
                Some(DashboardAction::Rebuild)
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                None
            }
            KeyCode::Char('a') => {
                self.mode = InputMode::AddUrl;
                None
            }
            KeyCode::Char('r') => Some(DashboardAction::Refresh),
            KeyCode::Enter => {
                let card = self.selected()?;
                (card.affordance() == Affordance::Practice).then(|| DashboardAction::Open {
                    category: card.category.clone(),
                    lesson_id: card.lesson.id.clone(),
                    title: card.lesson.title.clone(),
                })
            }
            KeyCode::Char('s') => {
                let card = self.selected()?;
                (card.affordance() == Affordance::Start).then(|| DashboardAction::Start {
                    category: card.category.clone(),
                    lesson_id: card.lesson.id.clone(),
                })
            }
            _ => None,
        }
    }

    fn next(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.cards.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.cards.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, message: Option<&str>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title + progress
                Constraint::Length(3), // Category tabs
                Constraint::Length(3), // Input
                Constraint::Min(5),    // Lessons
                Constraint::Length(1), // Message
                Constraint::Length(1), // Help
            ])
            .split(area);

        // Title
        let title = Paragraph::new(Line::from(vec![
            Span::styled("FLUENCY", Style::default().fg(Color::Cyan).bold()),
            Span::raw("   "),
            Span::styled(
                format!("{} / {} COMPLETED", self.progress.done, self.progress.total),
                Style::default().fg(Color::Yellow),
            ),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, chunks[0]);

        // Category tabs
        let tab_titles: Vec<String> = self
            .tabs
            .iter()
            .map(|t| {
                if t == ALL_CATEGORIES {
                    t.to_uppercase()
                } else {
                    category_label(t)
                }
            })
            .collect();
        let tabs = Tabs::new(tab_titles)
            .select(self.active_tab)
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan).bold())
            .block(Block::default().borders(Borders::ALL).title(" Categories "));
        frame.render_widget(tabs, chunks[1]);

        // Search / import input
        let (input_text, input_style, input_title) = match self.mode {
            InputMode::AddUrl => (
                format!("{}█", self.add_url),
                Style::default().fg(Color::Yellow),
                " Paste YouTube URL, Enter to import ",
            ),
            InputMode::Search => (
                format!("Search: {}█", self.search_query),
                Style::default().fg(Color::Yellow),
                " Search ",
            ),
            InputMode::Normal if self.search_query.is_empty() => (
                "Press [/] to search, [a] to import a video".to_string(),
                Style::default().fg(Color::DarkGray),
                " Search ",
            ),
            InputMode::Normal => (
                format!("Search: {}", self.search_query),
                Style::default().fg(Color::DarkGray),
                " Search ",
            ),
        };
        let input = Paragraph::new(input_text)
            .style(input_style)
            .block(Block::default().borders(Borders::ALL).title(input_title));
        frame.render_widget(input, chunks[2]);

        // Lessons
        let items: Vec<ListItem> = self.cards.iter().map(card_item).collect();
        let list_title = if self.loaded {
            format!(" Lessons ({}) ", self.cards.len())
        } else {
            " Loading lessons... ".to_string()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(list_title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[3], &mut self.state);

        // Message line
        if let Some(message) = message {
            let line = Paragraph::new(message.to_string())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            frame.render_widget(line, chunks[4]);
        }

        // Help bar
        let help = Paragraph::new(Line::from(vec![
            Span::styled(" Enter ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Practice  "),
            Span::styled(" s ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Download  "),
            Span::styled(" a ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Import  "),
            Span::styled(" ←/→ ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Category  "),
            Span::styled(" ? ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Help  "),
            Span::styled(" q ", Style::default().fg(Color::Black).bg(Color::Cyan)),
            Span::raw(" Quit"),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(help, chunks[5]);
    }
}

fn card_item(card: &LessonCard) -> ListItem<'static> {
    let lesson = &card.lesson;

    let level_color = match lesson.level_band() {
        LevelBand::Beginner => Color::Green,
        LevelBand::Intermediate => Color::Yellow,
        LevelBand::Unknown => Color::DarkGray,
        LevelBand::Advanced => Color::Red,
    };

    let (badge, badge_color) = if lesson.done {
        ("✓ COMPLETED".to_string(), Color::Green)
    } else if card.starting && !lesson.is_processing() && !lesson.is_ready() {
        ("… STARTING".to_string(), Color::Blue)
    } else {
        let color = match lesson.status {
            LessonStatus::Downloading => Color::Blue,
            LessonStatus::Transcribing => Color::Magenta,
            LessonStatus::GeneratingAi => Color::Yellow,
            LessonStatus::Ready => Color::Cyan,
            LessonStatus::NotStarted | LessonStatus::NotFound => Color::DarkGray,
        };
        (lesson.status.label().to_string(), color)
    };

    let action = match card.affordance() {
        Affordance::Practice => "▷",
        Affordance::Busy => "◐",
        Affordance::Start => "⇩",
    };

    let title_style = if lesson.done {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };

    ListItem::new(Line::from(vec![
        Span::raw(format!("{} ", action)),
        Span::styled(format!("{:<6}", lesson.level), Style::default().fg(level_color)),
        Span::styled(pad(&lesson.title, 40), title_style),
        Span::raw(" "),
        Span::styled(
            format!("{:>8}", lesson.duration_label()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("  "),
        Span::styled(pad(lesson.source_tag(), 12), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            pad(&category_label(&card.category), 14),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(badge, Style::default().fg(badge_color).bold()),
    ]))
}

fn pad(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        format!("{}{}", s, " ".repeat(width - count))
    } else {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
