//! Typed 1-based position entry, the keyboard explicit-position front end.

use tui_input::Input;

use crate::errors::GestureRejection;
use crate::flex_id::ChannelId;
use crate::lineup::reorder::index_for_position;

/// Parse a typed position into a destination index in `[0, count)`
pub fn parse_position(text: &str, count: usize) -> Result<usize, GestureRejection> {
    let position: usize = text.trim().parse().map_err(|_| GestureRejection::OutOfRange)?;
    index_for_position(position, count).ok_or(GestureRejection::OutOfRange)
}

/// Draft position for the row being edited. While a draft is open the row
/// shows the draft; on rejection or cancel it shows its real position again.
#[derive(Debug, Default, Clone)]
pub struct PositionEditor {
    editing: Option<ChannelId>,
    input: Input,
}

impl PositionEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: ChannelId, seed: Option<char>) {
        self.editing = Some(id);
        self.input = match seed {
            Some(c) if c.is_ascii_digit() => Input::new(c.to_string()),
            _ => Input::default(),
        };
    }

    pub fn editing(&self) -> Option<ChannelId> {
        self.editing
    }

    pub fn is_editing(&self, id: ChannelId) -> bool {
        self.editing == Some(id)
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn draft(&self) -> &str {
        self.input.value()
    }

    /// Close the draft and hand back what was typed
    pub fn finish(&mut self) -> Option<(ChannelId, String)> {
        let id = self.editing.take()?;
        let text = self.input.value().to_string();
        self.input.reset();
        Some((id, text))
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.input.reset();
    }
}
