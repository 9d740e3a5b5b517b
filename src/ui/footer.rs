use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, CurrentScreen, InputMode};
use crate::lineup::drag::Modality;
use crate::ui::colors::{BRIGHT_GREEN, DARK_GREEN};

fn hint(spans: &mut Vec<Span<'static>>, key: &'static str, label: &'static str) {
    spans.push(Span::styled(
        format!(" {} ", key),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(format!("{}  ", label), Style::default().fg(Color::White)));
}

pub fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    // Live region: what a screen reader would speak
    let region = app.list.live_region();
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" \u{25B6} ", Style::default().fg(DARK_GREEN)),
        Span::styled(region.text.clone(), Style::default().fg(BRIGHT_GREEN)),
    ]));
    f.render_widget(status, chunks[0]);

    let mut spans = Vec::new();
    if app.input_mode == InputMode::Editing {
        hint(&mut spans, "Enter", "Apply");
        hint(&mut spans, "Esc", "Stop Editing");
    } else if app.list.drag_session().map(|s| s.modality) == Some(Modality::Keyboard) {
        hint(&mut spans, "\u{2191}\u{2193}", "Move");
        hint(&mut spans, "Space", "Drop");
        hint(&mut spans, "Esc", "Cancel");
    } else {
        hint(&mut spans, "q", "Quit");
        hint(&mut spans, "Tab", "Screen");
        hint(&mut spans, "\u{2191}\u{2193}", "Move");
        match app.current_screen {
            CurrentScreen::Channels => {
                hint(&mut spans, "Space", "Pick Up");
                hint(&mut spans, "Enter", "Matches");
                hint(&mut spans, "d", "Enable/Disable");
            }
            CurrentScreen::TargetLineup => {
                hint(&mut spans, "0-9", "Set Position");
                hint(&mut spans, "d", "Enable/Disable");
            }
        }
        hint(&mut spans, "?", "Help");
    }
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
}
