use std::time::Instant;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, EditTarget};
use crate::lineup::coordinator::Notice;
use crate::ui::colors::{ALERT_RED, BRIGHT_GREEN, DARK_GREEN, DRAG_YELLOW, MATRIX_GREEN};
use crate::ui::utils::{bottom_right_rect, centered_rect, truncate};

pub fn render_help_popup(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" // COMMAND_LEGEND ")
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(DARK_GREEN));

    let area = centered_rect(60, 70, area);
    f.render_widget(Clear, area);

    let shortcuts = [
        "Keyboard Shortcuts:",
        "",
        "  j / k, \u{2191}\u{2193}  - Move focus (or the picked-up row)",
        "  Space        - Pick up / drop the focused row",
        "  Esc          - Cancel the current drag",
        "  Enter        - Expand matches (Channels) / type position (Lineup)",
        "  [ / ]        - Select match in an expanded row",
        "  p            - Make selected match primary",
        "  Del / m      - Remove selected match",
        "  a            - Add a manual match by stream id",
        "  d            - Disable (with undo) / enable channel",
        "  u            - Undo last disable",
        "  h            - Show / hide disabled channels",
        "  r            - Retry failed change or refresh",
        "  Tab          - Switch screen",
        "  q            - Quit",
        "",
        "Mouse: drag a row by its \u{283F} grip.",
    ];
    let p = Paragraph::new(shortcuts.join("\n"))
        .style(Style::default().fg(Color::White))
        .block(block);
    f.render_widget(p, area);
}

pub fn render_notice_popup(f: &mut Frame, area: Rect, notice: &Notice) {
    let block = Block::default()
        .title(Span::styled(
            " // SYNC_FAILURE ",
            Style::default().fg(ALERT_RED).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(ALERT_RED));

    let area = centered_rect(60, 40, area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let message = Paragraph::new(notice.message.clone())
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);
    let detail = Paragraph::new(notice.detail.clone())
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });

    let actions = if notice.retry.is_some() {
        "[r] Retry   [Esc] Dismiss"
    } else {
        "[Esc] Dismiss"
    };
    let footer = Paragraph::new(format!("{}   ({})", actions, notice.raised_at.format("%H:%M:%S")))
        .style(Style::default().fg(DARK_GREEN))
        .alignment(Alignment::Center);

    f.render_widget(message, layout[0]);
    f.render_widget(detail, layout[1]);
    f.render_widget(footer, layout[2]);
}

pub fn render_error_popup(f: &mut Frame, area: Rect, error: &str) {
    let block = Block::default()
        .title(Span::styled(
            " // SYSTEM_ERROR ",
            Style::default().fg(ALERT_RED).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(ALERT_RED));

    let area = centered_rect(50, 25, area);
    f.render_widget(Clear, area);
    let p = Paragraph::new(vec![
        Line::from(error.to_string()),
        Line::from(""),
        Line::from(Span::styled("Press [Esc] to Acknowledge", Style::default().fg(DARK_GREEN))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(block);
    f.render_widget(p, area);
}

/// Countdown toast for the most recent pending disable
pub fn render_undo_toast(f: &mut Frame, app: &App, area: Rect) {
    let Some(entry) = app.list.latest_undo() else {
        return;
    };
    let remaining = entry.remaining(Instant::now()).as_secs_f32().ceil() as u64;
    let pending = app.list.undo_entries().len();

    let mut text = format!(
        "{} disabled. [u] Undo ({}s)",
        truncate(&entry.name, 24),
        remaining
    );
    if pending > 1 {
        text.push_str(&format!(" +{} more", pending - 1));
    }

    let toast_area = bottom_right_rect(text.chars().count() as u16 + 4, 3, area);
    f.render_widget(Clear, toast_area);
    let p = Paragraph::new(text)
        .style(Style::default().fg(DRAG_YELLOW).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(DRAG_YELLOW)),
        );
    f.render_widget(p, toast_area);
}

/// Stream id entry for a manual match
pub fn render_add_match_popup(f: &mut Frame, app: &App, area: Rect) {
    let Some(EditTarget::AddMatch(channel_id)) = app.edit_target else {
        return;
    };
    let name = app
        .list
        .channel(channel_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();

    let area = centered_rect(50, 20, area);
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(Span::styled(
            format!(" // ADD_STREAM \u{2192} {} ", truncate(&name, 30)),
            Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(MATRIX_GREEN));
    let p = Paragraph::new(vec![
        Line::from(Span::styled("Stream id:", Style::default().fg(DARK_GREEN))),
        Line::from(Span::styled(
            format!("{}_", app.stream_input.value()),
            Style::default().fg(BRIGHT_GREEN).add_modifier(Modifier::BOLD),
        )),
    ])
    .block(block);
    f.render_widget(p, area);
}
