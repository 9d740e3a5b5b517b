use std::time::{Duration, Instant};

use crate::flex_id::ChannelId;

/// A disable that is visually applied but not yet sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub channel_id: ChannelId,
    pub name: String,
    pub pending_removal: bool,
    pub expires_at: Instant,
    generation: u64,
}

impl UndoEntry {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Ticket for one scheduled disable. A handle from before a restart no
/// longer cancels anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoHandle {
    pub channel_id: ChannelId,
    generation: u64,
}

/// Deadline-based undo timers, one per channel, driven by [`expire`](Self::expire).
#[derive(Debug, Clone)]
pub struct UndoController {
    window: Duration,
    entries: Vec<UndoEntry>,
    next_generation: u64,
}

impl UndoController {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Vec::new(),
            next_generation: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start (or restart) the countdown for `channel_id`
    pub fn schedule(&mut self, channel_id: ChannelId, name: impl Into<String>, now: Instant) -> UndoHandle {
        self.entries.retain(|e| e.channel_id != channel_id);
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.push(UndoEntry {
            channel_id,
            name: name.into(),
            pending_removal: true,
            expires_at: now + self.window,
            generation,
        });
        UndoHandle { channel_id, generation }
    }

    pub fn cancel(&mut self, handle: UndoHandle) -> Option<UndoEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.channel_id == handle.channel_id && e.generation == handle.generation)?;
        Some(self.entries.remove(pos))
    }

    pub fn cancel_channel(&mut self, channel_id: ChannelId) -> Option<UndoEntry> {
        let pos = self.entries.iter().position(|e| e.channel_id == channel_id)?;
        Some(self.entries.remove(pos))
    }

    pub fn is_pending(&self, channel_id: ChannelId) -> bool {
        self.entries.iter().any(|e| e.channel_id == channel_id)
    }

    /// Remove and return every entry whose deadline has passed, oldest first
    pub fn expire(&mut self, now: Instant) -> Vec<UndoEntry> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.expires_at <= now);
        self.entries = live;
        expired
    }

    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Most recently scheduled entry, the one an undo key acts on
    pub fn latest(&self) -> Option<&UndoEntry> {
        self.entries.last()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.expires_at).min()
    }

    /// Drop all timers without committing any of them
    pub fn clear(&mut self) -> Vec<UndoEntry> {
        std::mem::take(&mut self.entries)
    }
}
