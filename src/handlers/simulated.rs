//! Simulated-mouse front end for automated tests and the QA driver.
//!
//! Coordinates are injected directly rather than read from the terminal. Like
//! a physical mouse, the adapter only remembers whether its button is down;
//! everything else lives in the list's drag session.

use std::time::Instant;

use ratatui::layout::Rect;

use crate::errors::GestureRejection;
use crate::flex_id::ChannelId;
use crate::handlers::mouse::row_at;
use crate::lineup::coordinator::RequestId;
use crate::lineup::drag::Modality;
use crate::lineup::ChannelList;

#[derive(Debug, Default, Clone)]
pub struct SimulatedMouse {
    pressed: bool,
}

impl SimulatedMouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Button down over `(x, y)`; picks up the row there
    pub fn press(&mut self, list: &mut ChannelList, area: Rect, x: u16, y: u16) -> Result<ChannelId, GestureRejection> {
        self.pressed = true;
        let id = row_at(list, area, x, y).ok_or(GestureRejection::NoTarget)?;
        list.pick_up(Modality::SimulatedMouse, id)?;
        Ok(id)
    }

    /// Pointer moved; without the button down this is a plain hover and does nothing
    pub fn move_to(
        &mut self,
        list: &mut ChannelList,
        area: Rect,
        x: u16,
        y: u16,
        now: Instant,
    ) -> Result<(), GestureRejection> {
        if !self.pressed {
            return Ok(());
        }
        let target = row_at(list, area, x, y);
        list.hover(Modality::SimulatedMouse, target, now)
    }

    /// Button up over `(x, y)`. Releasing outside every row cancels the drag.
    pub fn release(
        &mut self,
        list: &mut ChannelList,
        area: Rect,
        x: u16,
        y: u16,
        now: Instant,
    ) -> Result<Option<RequestId>, GestureRejection> {
        if !std::mem::take(&mut self.pressed) {
            return Err(GestureRejection::NoSession);
        }
        let target = row_at(list, area, x, y);
        list.hover(Modality::SimulatedMouse, target, now)?;
        list.release(Modality::SimulatedMouse)
    }
}
