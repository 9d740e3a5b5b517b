use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, CurrentScreen};
use crate::ui::colors::{BRIGHT_GREEN, DARK_GREEN, MATRIX_GREEN};

pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(52), // Tabs
            Constraint::Min(0),     // Stats
        ])
        .split(area);

    let style_active = Style::default().bg(MATRIX_GREEN).fg(Color::Black).add_modifier(Modifier::BOLD);
    let style_idle = Style::default().fg(MATRIX_GREEN);
    let separator = Span::styled(" / ", Style::default().fg(Color::LightBlue));

    let mut spans = vec![Span::styled(
        " // LINEUP_MANAGER",
        Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD),
    )];
    for screen in [CurrentScreen::Channels, CurrentScreen::TargetLineup] {
        spans.push(separator.clone());
        spans.push(if screen == app.current_screen {
            Span::styled(format!(" [{}] ", screen.title()), style_active)
        } else {
            Span::styled(format!(" {} ", screen.title()), style_idle)
        });
    }

    let tabs = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(DARK_GREEN)),
    );
    f.render_widget(tabs, chunks[0]);

    let time = Local::now().format("%H:%M:%S");
    let in_flight = app.list.in_flight();
    let sync = if in_flight > 0 {
        format!("\u{27F3} {} pending", in_flight)
    } else {
        "synced".to_string()
    };
    let stats_text = format!("{} | {} | {} ", app.backend_label, sync, time);
    let stats = Paragraph::new(stats_text)
        .alignment(Alignment::Right)
        .style(Style::default().fg(BRIGHT_GREEN).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(DARK_GREEN)));
    f.render_widget(stats, chunks[1]);
}
