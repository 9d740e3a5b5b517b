use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::api::{Channel, Match};
use crate::app::App;
use crate::lineup::coordinator::SyncState;
use crate::ui::colors::{
    ALERT_RED, BRIGHT_GREEN, DARK_GREEN, DRAG_YELLOW, FOCUS_BG, MATRIX_GREEN, MUTED_GRAY, TARGET_CYAN,
};

/// Columns at the left of each row that start a pointer drag
pub const GRIP_WIDTH: u16 = 3;
const GRIP: &str = " \u{283F} ";
const MATCH_INDENT: &str = "         ";

/// Paint the materialized rows of the list into `area`. Only virtual items
/// are built; rows straddling the viewport edges are clipped line by line.
pub fn render_rows<F>(f: &mut Frame, app: &mut App, area: Rect, build: F)
where
    F: Fn(&App, usize, &Channel) -> Vec<Line<'static>>,
{
    let rows_area = Rect {
        width: area.width.saturating_sub(1),
        ..area
    };
    app.area_rows = rows_area;
    app.list.set_viewport(u32::from(rows_area.height));

    let app = &*app;
    let scroll = i64::from(app.list.scroll_offset());
    let viewport = usize::from(rows_area.height);
    let mut lines: Vec<Line<'static>> = vec![Line::default(); viewport];

    for item in app.list.virtual_items() {
        let Some(channel) = app.list.displayed_channel(item.index) else {
            continue;
        };
        let row_lines = build(app, item.index, channel);
        for (offset, line) in row_lines.into_iter().take(item.size as usize).enumerate() {
            let y = i64::from(item.start) + offset as i64 - scroll;
            if y >= 0 && (y as usize) < viewport {
                lines[y as usize] = line;
            }
        }
    }
    f.render_widget(Paragraph::new(lines), rows_area);

    let mut state = ScrollbarState::new(app.list.total_extent() as usize)
        .viewport_content_length(viewport)
        .position(scroll as usize);
    f.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area,
        &mut state,
    );
}

pub fn sync_badge(state: SyncState) -> Span<'static> {
    match state {
        SyncState::Clean => Span::raw(""),
        SyncState::Optimistic(_) => Span::styled(" \u{27F3} saving", Style::default().fg(DRAG_YELLOW)),
        SyncState::Reconciling(_) => Span::styled(" \u{21BA} syncing", Style::default().fg(ALERT_RED)),
    }
}

/// Base style of a row from its focus and drag role
pub fn row_style(app: &App, channel: &Channel) -> Style {
    let list = &app.list;
    let session = list.drag_session();
    let dragged = session.is_some_and(|s| s.dragged == channel.id);
    let target = session.is_some_and(|s| s.target == Some(channel.id) && s.dragged != channel.id);

    let mut style = Style::default().fg(if channel.enabled { BRIGHT_GREEN } else { MUTED_GRAY });
    if list.focused() == Some(channel.id) {
        style = style.bg(FOCUS_BG).add_modifier(Modifier::BOLD);
    }
    if dragged {
        style = style.fg(DRAG_YELLOW).add_modifier(Modifier::BOLD);
    }
    if target {
        style = style.fg(TARGET_CYAN).add_modifier(Modifier::UNDERLINED);
    }
    style
}

fn channel_lines(app: &App, index: usize, channel: &Channel) -> Vec<Line<'static>> {
    let list = &app.list;
    let dragged = list.drag_session().is_some_and(|s| s.dragged == channel.id);
    let expanded = list.is_expanded(channel.id);
    let focused = list.focused() == Some(channel.id);
    let style = row_style(app, channel);
    let count = channel.match_count();

    let marker = if expanded {
        "\u{25BE}"
    } else if count > 0 {
        "\u{25B8}"
    } else {
        " "
    };

    let mut spans = vec![
        Span::styled(GRIP, Style::default().fg(if dragged { DRAG_YELLOW } else { DARK_GREEN })),
        Span::styled(format!("{:>4} ", index + 1), Style::default().fg(MUTED_GRAY)),
        Span::styled(format!("{} {}", marker, channel.name), style),
    ];
    if !channel.enabled {
        spans.push(Span::styled(" [OFF]", Style::default().fg(ALERT_RED)));
    }
    spans.push(Span::styled(
        format!("  {} match{}", count, if count == 1 { "" } else { "es" }),
        Style::default().fg(MUTED_GRAY),
    ));
    if channel.has_orphans() {
        spans.push(Span::styled(" !orphaned", Style::default().fg(ALERT_RED)));
    }
    spans.push(sync_badge(list.row_sync(channel.id)));
    if dragged {
        spans.push(Span::styled(" \u{21C5} moving", Style::default().fg(DRAG_YELLOW)));
    }

    let mut lines = vec![Line::from(spans)];
    if expanded {
        lines.push(Line::from(Span::styled(
            format!("{}MATCHED_STREAMS:", MATCH_INDENT),
            Style::default().fg(DARK_GREEN).add_modifier(Modifier::BOLD),
        )));
        for (i, m) in channel.matches.iter().enumerate() {
            lines.push(match_line(m, focused && i == list.match_cursor()));
        }
    }
    lines
}

fn match_line(m: &Match, selected: bool) -> Line<'static> {
    let mut style = Style::default().fg(if m.is_orphaned { MUTED_GRAY } else { BRIGHT_GREEN });
    if selected {
        style = style.bg(FOCUS_BG).add_modifier(Modifier::BOLD);
    }
    let star = if m.is_primary { "\u{2605}" } else { " " };
    let mut spans = vec![
        Span::raw(MATCH_INDENT),
        Span::styled(format!("{} ", star), Style::default().fg(DRAG_YELLOW)),
        Span::styled(m.name.clone(), style),
    ];
    if !m.quality_tags.is_empty() {
        spans.push(Span::styled(
            format!(" [{}]", m.quality_tags.join(",")),
            Style::default().fg(TARGET_CYAN),
        ));
    }
    spans.push(Span::styled(
        format!(" {:.0}%", m.confidence * 100.0),
        Style::default().fg(MUTED_GRAY),
    ));
    if m.is_manual {
        spans.push(Span::styled(" manual", Style::default().fg(MATRIX_GREEN)));
    }
    if m.is_orphaned {
        spans.push(Span::styled(" orphaned", Style::default().fg(ALERT_RED)));
    }
    Line::from(spans)
}

pub fn render_channels_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let shown = app.list.displayed().len();
    let total = app.list.channels().len();
    let mut title = format!(" // CHANNELS [{}/{}] ", shown, total);
    if app.list.show_disabled() {
        title.push_str("(+disabled) ");
    }
    if !app.list.is_loaded() {
        title.push_str("LOADING... ");
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD)))
        .border_style(Style::default().fg(DARK_GREEN));
    let inner = block.inner(area);
    f.render_widget(block, area);

    render_rows(f, app, inner, channel_lines);
}
