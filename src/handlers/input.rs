use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tui_input::backend::crossterm::EventHandler;

use crate::app::{App, CurrentScreen, EditTarget, InputMode};
use crate::lineup::drag::Modality;

pub enum InputResult {
    Continue,
    Quit,
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) -> InputResult {
    // Only process key press events, not release (Windows sends both)
    if key.kind != KeyEventKind::Press {
        return InputResult::Continue;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return InputResult::Quit;
    }

    if app.input_mode == InputMode::Editing {
        handle_editing(app, key);
        return InputResult::Continue;
    }

    // Overlays swallow keys first
    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return InputResult::Continue;
    }
    if app.current_notice().is_some() || app.last_error.is_some() {
        match key.code {
            KeyCode::Esc => {
                app.dismiss_notice();
                return InputResult::Continue;
            }
            KeyCode::Char('r') => {
                app.retry_notice();
                return InputResult::Continue;
            }
            _ => {}
        }
    }

    let now = Instant::now();
    let keyboard_drag = app.list.drag_session().map(|s| s.modality) == Some(Modality::Keyboard);
    let page = i64::from(app.area_rows.height.max(1));

    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return InputResult::Quit;
        }
        KeyCode::Tab => app.switch_screen(app.current_screen.next()),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Esc => {
            app.list.cancel();
        }
        KeyCode::Char('u') => {
            app.list.undo_latest();
        }
        KeyCode::Char('R') | KeyCode::Char('r') => {
            app.list.refresh();
        }
        KeyCode::Char('h') => app.list.toggle_show_disabled(),
        KeyCode::Char('d') => {
            if let Some(id) = app.list.focused() {
                let enabled = app.list.channel(id).is_some_and(|c| c.enabled);
                if enabled {
                    app.list.schedule_disable(id, now);
                } else {
                    app.list.enable(id);
                }
            }
        }
        KeyCode::Up | KeyCode::Char('k') => step(app, keyboard_drag, -1, now),
        KeyCode::Down | KeyCode::Char('j') => step(app, keyboard_drag, 1, now),
        KeyCode::PageUp => step(app, keyboard_drag, -page, now),
        KeyCode::PageDown => step(app, keyboard_drag, page, now),
        KeyCode::Home | KeyCode::Char('g') if !keyboard_drag => app.list.focus_first(),
        KeyCode::End | KeyCode::Char('G') if !keyboard_drag => app.list.focus_last(),
        _ => match app.current_screen {
            CurrentScreen::Channels => handle_channels_key(app, key, keyboard_drag),
            CurrentScreen::TargetLineup => handle_lineup_key(app, key),
        },
    }

    InputResult::Continue
}

fn step(app: &mut App, keyboard_drag: bool, delta: i64, now: Instant) {
    if keyboard_drag {
        if let Err(reason) = app.list.keyboard_step(delta, now) {
            tracing::debug!(reason = reason.display_name(), "keyboard move ignored");
        }
    } else {
        app.list.move_focus(delta);
    }
}

fn handle_channels_key(app: &mut App, key: KeyEvent, keyboard_drag: bool) {
    let focused = app.list.focused();
    match key.code {
        KeyCode::Char(' ') => {
            let result = if keyboard_drag {
                app.list.release(Modality::Keyboard).map(|_| ())
            } else if let Some(id) = focused {
                app.list.pick_up(Modality::Keyboard, id)
            } else {
                Ok(())
            };
            if let Err(reason) = result {
                tracing::debug!(reason = reason.display_name(), "keyboard drag");
            }
        }
        KeyCode::Enter => {
            if let Some(id) = focused {
                app.list.toggle_expand(id);
            }
        }
        KeyCode::Char('[') => app.list.move_match_cursor(-1),
        KeyCode::Char(']') => app.list.move_match_cursor(1),
        KeyCode::Char('p') => {
            let stream = app.list.selected_match().map(|m| m.stream_id);
            if let (Some(id), Some(stream_id)) = (focused, stream) {
                app.list.set_primary_match(id, stream_id);
            }
        }
        KeyCode::Delete | KeyCode::Char('m') => {
            if let Some(mapping_id) = app.list.selected_match().map(|m| m.mapping_id) {
                app.list.remove_match(mapping_id);
            }
        }
        KeyCode::Char('a') => app.begin_add_match(),
        _ => {}
    }
}

fn handle_lineup_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.begin_position_edit(None),
        KeyCode::Char(c) if c.is_ascii_digit() => app.begin_position_edit(Some(c)),
        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.stop_editing(),
        _ => match app.edit_target {
            Some(EditTarget::Position) => {
                app.list
                    .position_editor_mut()
                    .input_mut()
                    .handle_event(&Event::Key(key));
            }
            Some(EditTarget::AddMatch(_)) => {
                app.stream_input.handle_event(&Event::Key(key));
            }
            None => app.stop_editing(),
        },
    }
}
