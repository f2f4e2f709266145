//! Help popup widget

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::tui::AppScreen;

const DASHBOARD_KEYS: &[(&str, &str)] = &[
    ("↑/k ↓/j", "Select lesson"),
    ("←/h →/l", "Switch category"),
    ("Enter", "Open practice room (ready lessons)"),
    ("s", "Start downloading the lesson"),
    ("a", "Import a YouTube video"),
    ("/", "Search titles"),
    ("r", "Refresh now"),
    ("q", "Quit application"),
];

const PRACTICE_KEYS: &[(&str, &str)] = &[
    ("Space", "Play / pause"),
    ("↑/k ↓/j", "Move cursor"),
    ("Enter", "Jump to the sentence under the cursor"),
    ("←/b", "Skip back"),
    ("s", "Speak the sentence"),
    ("t", "Toggle translation"),
    ("g", "Toggle shadowing guide"),
    ("d", "Mark done / not done"),
    ("Esc", "Back to lessons"),
];

/// Help popup that shows keyboard shortcuts
pub struct HelpPopup;

impl HelpPopup {
    pub fn draw(frame: &mut Frame, area: Rect, screen: AppScreen) {
        // Centered, 60% width, 70% height
        let popup_width = (area.width as f32 * 0.6) as u16;
        let popup_height = (area.height as f32 * 0.7) as u16;
        let popup_area = Rect {
            x: (area.width - popup_width) / 2,
            y: (area.height - popup_height) / 2,
            width: popup_width,
            height: popup_height,
        };

        frame.render_widget(Clear, popup_area);

        let (title, keys) = match screen {
            AppScreen::Dashboard => ("Lesson Shortcuts", DASHBOARD_KEYS),
            AppScreen::Practice => ("Practice Shortcuts", PRACTICE_KEYS),
        };

        let mut text = vec![
            Line::from(Span::styled(title, Style::default().fg(Color::Cyan).bold())),
            Line::from(""),
        ];
        text.extend(keys.iter().map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{:<10}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        }));
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )));

        let help = Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .style(Style::default().bg(Color::Black)),
        );

        frame.render_widget(help, popup_area);
    }
}
