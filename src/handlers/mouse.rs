use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, CurrentScreen};
use crate::errors::GestureRejection;
use crate::flex_id::ChannelId;
use crate::lineup::drag::Modality;
use crate::lineup::ChannelList;
use crate::ui::channels::GRIP_WIDTH;

const WHEEL_STEP: i64 = 3;

/// Row under terminal cell `(x, y)` of the rows area
pub fn row_at(list: &ChannelList, area: Rect, x: u16, y: u16) -> Option<ChannelId> {
    if x < area.x || x >= area.x + area.width || y < area.y || y >= area.y + area.height {
        return None;
    }
    list.row_at_viewport(u32::from(y - area.y))
}

pub fn on_grip(area: Rect, x: u16) -> bool {
    x >= area.x && x < area.x + GRIP_WIDTH
}

fn log_rejection(result: Result<(), GestureRejection>) {
    match result {
        Ok(()) | Err(GestureRejection::NoSession) => {}
        Err(reason) => tracing::debug!(reason = reason.display_name(), "pointer event ignored"),
    }
}

pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let area = app.area_rows;
    let (x, y) = (mouse.column, mouse.row);
    let now = Instant::now();

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(id) = row_at(&app.list, area, x, y) else {
                return;
            };
            app.list.focus(id);
            if app.current_screen == CurrentScreen::Channels && on_grip(area, x) {
                log_rejection(app.list.pick_up(Modality::Pointer, id));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            // Dragging past the edge scrolls the list under the pointer
            if y < area.y {
                app.list.scroll_by(-1);
            } else if y >= area.y + area.height {
                app.list.scroll_by(1);
            }
            let target = row_at(&app.list, area, x, y);
            log_rejection(app.list.hover(Modality::Pointer, target, now));
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if app.list.drag_session().map(|s| s.modality) != Some(Modality::Pointer) {
                return;
            }
            let target = row_at(&app.list, area, x, y);
            log_rejection(app.list.hover(Modality::Pointer, target, now));
            if let Err(reason) = app.list.release(Modality::Pointer) {
                tracing::debug!(reason = reason.display_name(), "pointer drop cancelled");
            }
        }
        MouseEventKind::ScrollDown => app.list.scroll_by(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.list.scroll_by(-WHEEL_STEP),
        _ => {}
    }
}
