pub mod channels;
pub mod colors;
pub mod footer;
pub mod header;
pub mod lineup;
pub mod popups;
pub mod utils;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::{App, CurrentScreen};

pub fn ui(f: &mut Frame, app: &mut App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(2), // Live region + key hints
        ])
        .split(area);

    header::render_header(f, app, chunks[0]);
    match app.current_screen {
        CurrentScreen::Channels => channels::render_channels_pane(f, app, chunks[1]),
        CurrentScreen::TargetLineup => lineup::render_lineup_pane(f, app, chunks[1]),
    }
    footer::render_footer(f, app, chunks[2]);

    // Overlays
    popups::render_undo_toast(f, app, chunks[1]);
    popups::render_add_match_popup(f, app, area);

    if let Some(notice) = app.current_notice() {
        popups::render_notice_popup(f, area, notice);
    } else if let Some(error) = &app.last_error {
        popups::render_error_popup(f, area, error);
    }

    if app.show_help {
        popups::render_help_popup(f, area);
    }
}
