use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::api::Channel;
use crate::app::App;
use crate::ui::channels::{render_rows, row_style, sync_badge};
use crate::ui::colors::{ALERT_RED, DARK_GREEN, DRAG_YELLOW, MATRIX_GREEN, MUTED_GRAY};

fn lineup_lines(app: &App, index: usize, channel: &Channel) -> Vec<Line<'static>> {
    let editor = app.list.position_editor();
    let position = if editor.is_editing(channel.id) {
        Span::styled(
            format!(" [{:>4}_] ", editor.draft()),
            Style::default().fg(DRAG_YELLOW).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!("  {:>4}   ", index + 1), Style::default().fg(MUTED_GRAY))
    };

    let mut spans = vec![position, Span::styled(channel.name.clone(), row_style(app, channel))];
    if let Some(primary) = channel.primary_match() {
        spans.push(Span::styled(
            format!("  \u{2192} {}", primary.name),
            Style::default().fg(DARK_GREEN),
        ));
    }
    if !channel.enabled {
        spans.push(Span::styled(" [OFF]", Style::default().fg(ALERT_RED)));
    }
    spans.push(sync_badge(app.list.row_sync(channel.id)));
    vec![Line::from(spans)]
}

pub fn render_lineup_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" // TARGET_LINEUP [{} channels] ", app.list.displayed().len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD)))
        .border_style(Style::default().fg(DARK_GREEN));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let columns = Paragraph::new(Line::from(vec![
        Span::styled("   POS   ", Style::default().fg(DARK_GREEN).add_modifier(Modifier::BOLD)),
        Span::styled("CHANNEL", Style::default().fg(DARK_GREEN).add_modifier(Modifier::BOLD)),
    ]));
    f.render_widget(columns, chunks[0]);

    render_rows(f, app, chunks[1], lineup_lines);
}
