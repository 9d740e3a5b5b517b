use iptv_lineup_lib::app::{App, CurrentScreen};
use iptv_lineup_lib::config::AppConfig;
use iptv_lineup_lib::demo::{demo_lineup, MemoryChannelService};
use iptv_lineup_lib::errors::LineupError;
use iptv_lineup_lib::lineup::drag::Modality;
use iptv_lineup_lib::lineup::ChannelList;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use std::sync::Arc;
use std::time::Instant;

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn config() -> AppConfig {
    AppConfig {
        announce_debounce_ms: 0,
        ..AppConfig::default()
    }
}

/// App with `count` demo channels already loaded, all enabled
fn loaded_app(count: usize) -> App {
    let config = config();
    let service = Arc::new(MemoryChannelService::demo(count));
    let mut app = App::new(config.clone(), service, "test".to_string());
    let mut lineup = demo_lineup(count);
    for channel in &mut lineup {
        channel.enabled = true;
    }
    app.list = ChannelList::with_channels(1, &config, lineup);
    app.list.focus_first();
    app
}

/// Render one frame and return the screen as text lines; panics on crash
fn render_frame(app: &mut App) -> Vec<String> {
    let backend = TestBackend::new(120, 40);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|f| {
            iptv_lineup_lib::ui::ui(f, app);
        })
        .unwrap();
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    buffer
        .content
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect())
        .collect()
}

fn screen_contains(lines: &[String], needle: &str) -> bool {
    lines.iter().any(|l| l.contains(needle))
}

// ─── Channels screen ──────────────────────────────────────────────────────────

#[test]
fn test_channels_screen_renders_rows_and_hints() {
    let mut app = loaded_app(10);
    let screen = render_frame(&mut app);

    assert!(screen_contains(&screen, "CHANNELS [10/10]"));
    assert!(screen_contains(&screen, "BBC One"));
    assert!(screen_contains(&screen, "Pick Up"));
    assert!(app.area_rows.height > 0, "renderer must publish the rows area");
}

#[test]
fn test_loading_title_before_first_fetch() {
    let service = Arc::new(MemoryChannelService::demo(3));
    let mut app = App::new(config(), service, "test".to_string());
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "LOADING"));
}

#[test]
fn test_large_lineup_only_renders_visible_rows() {
    let mut app = loaded_app(5000);
    let start = Instant::now();
    let screen = render_frame(&mut app);
    assert!(start.elapsed().as_millis() < 2000, "5000-row frame took too long");

    let materialized = app.list.virtual_items().len();
    let viewport = app.area_rows.height as usize;
    assert!(
        materialized <= viewport + 2 * AppConfig::default().overscan + 1,
        "{} rows materialized for a {}-row viewport",
        materialized,
        viewport
    );
    assert!(screen_contains(&screen, "BBC One"));
    assert!(!screen_contains(&screen, "Regional 4980"));
}

#[test]
fn test_scrolled_large_lineup_shows_tail() {
    let mut app = loaded_app(5000);
    render_frame(&mut app);
    app.list.focus_last();
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "Regional 4980"));
    assert!(!screen_contains(&screen, "BBC One "));
}

#[test]
fn test_expanded_row_lists_matches() {
    let mut app = loaded_app(10);
    // Channel index 3 has three demo matches
    let id = app.list.displayed()[3];
    app.list.toggle_expand(id);
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "MATCHED_STREAMS:"));
    assert!(screen_contains(&screen, "[FHD]"));
    assert!(screen_contains(&screen, "[SD]"));
}

#[test]
fn test_live_region_shown_in_footer() {
    let mut app = loaded_app(5);
    let id = app.list.displayed()[0];
    app.list.pick_up(Modality::Keyboard, id).unwrap();
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "Current position 1 of 5"));
    assert!(screen_contains(&screen, "Drop"));
}

#[test]
fn test_undo_toast_rendered_while_pending() {
    let mut app = loaded_app(5);
    let id = app.list.displayed()[1];
    app.list.schedule_disable(id, Instant::now());
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "CHANNELS [4/5]"));
    assert!(screen_contains(&screen, "Undo"));
}

#[test]
fn test_notice_popup_after_rejected_save() {
    let mut app = loaded_app(5);
    let epoch = app.list.epoch();
    let id = app.list.displayed()[0];
    app.list.commit_position(id, "3").unwrap();
    let outbox = app.list.take_outbox();
    assert_eq!(outbox.len(), 1);

    app.list.handle_response(
        epoch,
        outbox[0].id,
        Err(LineupError::Rejected("lineup locked".to_string())),
    );
    app.collect_notices();
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "SYNC_FAILURE"));
    assert!(screen_contains(&screen, "[r] Retry"));
}

#[test]
fn test_help_popup_renders() {
    let mut app = loaded_app(3);
    app.show_help = true;
    render_frame(&mut app);
}

// ─── Target lineup screen ─────────────────────────────────────────────────────

#[test]
fn test_lineup_screen_renders_positions() {
    let mut app = loaded_app(5);
    app.current_screen = CurrentScreen::TargetLineup;
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "TARGET_LINEUP [5 channels]"));
    assert!(screen_contains(&screen, "POS"));
    assert!(screen_contains(&screen, "Set Position"));
}

#[test]
fn test_lineup_screen_shows_position_draft() {
    let mut app = loaded_app(5);
    app.current_screen = CurrentScreen::TargetLineup;
    app.begin_position_edit(Some('4'));
    let screen = render_frame(&mut app);
    assert!(screen_contains(&screen, "4_]"));
    assert!(screen_contains(&screen, "Stop Editing"));
}

#[test]
fn test_tiny_terminal_does_not_panic() {
    let mut app = loaded_app(50);
    let backend = TestBackend::new(20, 6);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|f| iptv_lineup_lib::ui::ui(f, &mut app))
        .unwrap();
}
