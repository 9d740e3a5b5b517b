//! The reorderable, virtualized channel list.
//!
//! [`ChannelList`] is one mounted instance of the list: it owns the local
//! lineup cache (through the [`Coordinator`]), the expanded set, the drag
//! session, undo timers, the live region and the virtualizer. Input adapters
//! and views only talk to this type.

pub mod announcer;
pub mod coordinator;
pub mod drag;
pub mod geometry;
pub mod position;
pub mod reorder;
pub mod undo;
pub mod virtualizer;

use std::collections::HashSet;
use std::time::Instant;

use crate::api::{Channel, Match, RemoteRequest, RemoteResponse};
use crate::config::AppConfig;
use crate::errors::{GestureRejection, LineupError};
use crate::flex_id::{ChannelId, MappingId, StreamId};

use announcer::{messages, Announcer, LiveRegion};
use coordinator::{Applied, Coordinator, Notice, Outgoing, RequestId, Retry, SyncState};
use drag::{DragMachine, DragSession, Modality, ReleaseOutcome};
use geometry::{RowGeometry, RowState};
use position::{parse_position, PositionEditor};
use undo::{UndoController, UndoEntry, UndoHandle};
use virtualizer::{Align, VirtualItem, Virtualizer};

pub struct ChannelList {
    epoch: u64,
    mounted: bool,
    coordinator: Coordinator,
    undo: UndoController,
    drag: DragMachine,
    announcer: Announcer,
    geometry: RowGeometry,
    virtualizer: Virtualizer,
    expanded: HashSet<ChannelId>,
    show_disabled: bool,
    /// Disables committed while disabled rows are shown; they stay hidden
    /// until the filter is toggled again
    just_disabled: HashSet<ChannelId>,
    /// Displayed sequence: local order minus undo-pending (and, unless
    /// `show_disabled`, disabled) channels
    displayed: Vec<ChannelId>,
    focused: Option<ChannelId>,
    focus_index: usize,
    match_cursor: usize,
    editor: PositionEditor,
}

impl ChannelList {
    /// Mount an empty list and queue the initial fetch
    pub fn mount(epoch: u64, config: &AppConfig) -> Self {
        let mut list = Self::build(epoch, config, Coordinator::new());
        list.coordinator.refresh();
        tracing::debug!(epoch, "channel list mounted");
        list
    }

    /// Mount with an already known lineup
    pub fn with_channels(epoch: u64, config: &AppConfig, channels: Vec<Channel>) -> Self {
        let mut list = Self::build(epoch, config, Coordinator::with_channels(channels));
        list.refresh_view();
        list
    }

    fn build(epoch: u64, config: &AppConfig, coordinator: Coordinator) -> Self {
        Self {
            epoch,
            mounted: true,
            coordinator,
            undo: UndoController::new(config.undo_window()),
            drag: DragMachine::new(),
            announcer: Announcer::new(config.announce_debounce()),
            geometry: config.geometry,
            virtualizer: Virtualizer::new(config.overscan),
            expanded: HashSet::new(),
            show_disabled: false,
            just_disabled: HashSet::new(),
            displayed: Vec::new(),
            focused: None,
            focus_index: 0,
            match_cursor: 0,
            editor: PositionEditor::new(),
        }
    }

    /// Tear down: pending disables are dropped without a remote call and
    /// responses still in flight will be discarded.
    pub fn unmount(&mut self) -> Vec<UndoEntry> {
        self.mounted = false;
        self.drag.cancel();
        self.editor.cancel();
        self.announcer.clear();
        let dropped = self.undo.clear();
        tracing::debug!(epoch = self.epoch, pending_undo = dropped.len(), "channel list unmounted");
        dropped
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_loaded(&self) -> bool {
        self.coordinator.is_loaded()
    }

    // --- Observable state ---

    pub fn channels(&self) -> &[Channel] {
        self.coordinator.local()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.coordinator.channel(id)
    }

    /// Ids of the displayed sequence, in order
    pub fn displayed(&self) -> &[ChannelId] {
        &self.displayed
    }

    pub fn displayed_channel(&self, index: usize) -> Option<&Channel> {
        self.displayed.get(index).and_then(|id| self.channel(*id))
    }

    pub fn displayed_index(&self, id: ChannelId) -> Option<usize> {
        self.displayed.iter().position(|d| *d == id)
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.session()
    }

    pub fn undo_entries(&self) -> &[UndoEntry] {
        self.undo.entries()
    }

    pub fn latest_undo(&self) -> Option<&UndoEntry> {
        self.undo.latest()
    }

    pub fn live_region(&self) -> &LiveRegion {
        self.announcer.region()
    }

    pub fn announcements(&self) -> impl Iterator<Item = &str> {
        self.announcer.history()
    }

    pub fn notices(&self) -> &[Notice] {
        self.coordinator.notices()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.coordinator.take_notices()
    }

    pub fn row_sync(&self, id: ChannelId) -> SyncState {
        self.coordinator.row_sync(id)
    }

    pub fn order_sync(&self) -> SyncState {
        self.coordinator.order_sync()
    }

    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    pub fn geometry(&self) -> RowGeometry {
        self.geometry
    }

    pub fn is_expanded(&self, id: ChannelId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn show_disabled(&self) -> bool {
        self.show_disabled
    }

    pub fn position_editor(&self) -> &PositionEditor {
        &self.editor
    }

    pub fn position_editor_mut(&mut self) -> &mut PositionEditor {
        &mut self.editor
    }

    /// Decoration revision; bumps on every drag transition
    pub fn revision(&self) -> u64 {
        self.virtualizer.revision()
    }

    // --- Displayed sequence and layout ---

    fn row_state(&self, id: ChannelId) -> RowState {
        RowState {
            expanded: self.expanded.contains(&id),
            match_count: self.channel(id).map_or(0, Channel::match_count),
        }
    }

    pub fn row_height(&self, id: ChannelId) -> u32 {
        self.geometry.height(self.row_state(id))
    }

    /// Recompute the displayed sequence and bring the virtualizer up to date.
    /// Offsets are discarded from the first row whose id or height changed.
    fn refresh_view(&mut self) {
        let displayed: Vec<ChannelId> = self
            .coordinator
            .local()
            .iter()
            .filter(|c| {
                !self.undo.is_pending(c.id)
                    && (c.enabled || (self.show_disabled && !self.just_disabled.contains(&c.id)))
            })
            .map(|c| c.id)
            .collect();
        let heights: Vec<u32> = displayed.iter().map(|id| self.row_height(*id).max(1)).collect();

        let first_stale = displayed
            .iter()
            .zip(&heights)
            .enumerate()
            .position(|(i, (id, height))| {
                self.displayed.get(i) != Some(id)
                    || self.virtualizer.item(i).map(|item| item.size) != Some(*height)
            })
            .unwrap_or(displayed.len());

        self.displayed = displayed;
        self.virtualizer.set_count(self.displayed.len());
        self.virtualizer.invalidate_from(first_stale);
        self.virtualizer.measure(|i| heights[i]);

        self.expanded.retain(|id| self.coordinator.channel(*id).is_some());
        self.repair_focus();
    }

    fn repair_focus(&mut self) {
        if let Some(index) = self.focused.and_then(|id| self.displayed_index(id)) {
            self.focus_index = index;
            return;
        }
        if self.displayed.is_empty() {
            self.focused = None;
            self.focus_index = 0;
            return;
        }
        self.focus_index = self.focus_index.min(self.displayed.len() - 1);
        self.focused = Some(self.displayed[self.focus_index]);
        self.match_cursor = 0;
    }

    pub fn set_viewport(&mut self, height: u32) {
        self.virtualizer.set_viewport(height);
    }

    pub fn viewport(&self) -> u32 {
        self.virtualizer.viewport()
    }

    pub fn scroll_by(&mut self, delta: i64) {
        self.virtualizer.scroll_by(delta);
    }

    pub fn scroll_offset(&self) -> u32 {
        self.virtualizer.scroll_offset()
    }

    pub fn scroll_to_index(&mut self, index: usize, align: Align) {
        self.virtualizer.scroll_to_index(index, align);
    }

    pub fn total_extent(&self) -> u32 {
        self.virtualizer.total_extent()
    }

    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        self.virtualizer.virtual_items()
    }

    /// Row under a viewport-relative line, for hit-testing
    pub fn row_at_viewport(&self, y: u32) -> Option<ChannelId> {
        let index = self.virtualizer.index_at_viewport_offset(y)?;
        self.displayed.get(index).copied()
    }

    // --- Focus ---

    pub fn focused(&self) -> Option<ChannelId> {
        self.focused
    }

    pub fn focus_index(&self) -> usize {
        self.focus_index
    }

    pub fn focus(&mut self, id: ChannelId) -> bool {
        let Some(index) = self.displayed_index(id) else {
            return false;
        };
        if self.focused != Some(id) {
            self.match_cursor = 0;
        }
        self.focused = Some(id);
        self.focus_index = index;
        self.virtualizer.scroll_to_index(index, Align::Auto);
        true
    }

    pub fn move_focus(&mut self, delta: i64) {
        if self.displayed.is_empty() {
            return;
        }
        let last = self.displayed.len() as i64 - 1;
        let index = (self.focus_index as i64 + delta).clamp(0, last) as usize;
        self.focus(self.displayed[index]);
    }

    pub fn focus_first(&mut self) {
        if let Some(id) = self.displayed.first().copied() {
            self.focus(id);
        }
    }

    pub fn focus_last(&mut self) {
        if let Some(id) = self.displayed.last().copied() {
            self.focus(id);
        }
    }

    // --- Expand / collapse and matches ---

    pub fn toggle_expand(&mut self, id: ChannelId) -> bool {
        if self.channel(id).is_none() {
            return false;
        }
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        self.match_cursor = 0;
        self.refresh_view();
        true
    }

    /// Match highlighted inside the focused, expanded row
    pub fn selected_match(&self) -> Option<&Match> {
        let id = self.focused?;
        if !self.expanded.contains(&id) {
            return None;
        }
        self.channel(id)?.matches.get(self.match_cursor)
    }

    pub fn match_cursor(&self) -> usize {
        self.match_cursor
    }

    pub fn move_match_cursor(&mut self, delta: i64) {
        let count = self
            .focused
            .and_then(|id| self.channel(id))
            .map_or(0, Channel::match_count);
        if count == 0 {
            self.match_cursor = 0;
            return;
        }
        self.match_cursor = (self.match_cursor as i64 + delta).clamp(0, count as i64 - 1) as usize;
    }

    pub fn set_primary_match(&mut self, channel_id: ChannelId, stream_id: StreamId) -> Option<RequestId> {
        let req = self.coordinator.set_primary_match(channel_id, stream_id)?;
        self.refresh_view();
        Some(req)
    }

    pub fn add_manual_match(&mut self, channel_id: ChannelId, stream_id: StreamId, as_primary: bool) -> Option<RequestId> {
        self.coordinator.add_manual_match(channel_id, stream_id, as_primary)
    }

    pub fn remove_match(&mut self, mapping_id: MappingId) -> Option<RequestId> {
        let req = self.coordinator.remove_match(mapping_id)?;
        self.refresh_view();
        self.move_match_cursor(0);
        Some(req)
    }

    pub fn toggle_show_disabled(&mut self) {
        self.show_disabled = !self.show_disabled;
        self.just_disabled.clear();
        self.refresh_view();
    }

    // --- Drag and drop ---

    fn name_of(&self, id: ChannelId) -> String {
        self.channel(id).map(|c| c.name.clone()).unwrap_or_else(|| id.to_string())
    }

    pub fn pick_up(&mut self, modality: Modality, id: ChannelId) -> Result<(), GestureRejection> {
        let origin = self.displayed_index(id).ok_or(GestureRejection::StaleIndex)?;
        self.editor.cancel();
        self.drag.pick_up(modality, id, origin)?;
        tracing::debug!(modality = modality.display_name(), channel = %id, origin, "picked up");
        let text = messages::picked_up(&self.name_of(id), origin + 1, self.displayed.len());
        self.announcer.announce(text);
        self.virtualizer.request_reflow();
        Ok(())
    }

    /// Update the hovered row for the owning modality
    pub fn hover(&mut self, modality: Modality, target: Option<ChannelId>, now: Instant) -> Result<(), GestureRejection> {
        let target = target.filter(|id| self.displayed_index(*id).is_some());
        if !self.drag.hover(modality, target)? {
            return Ok(());
        }
        self.virtualizer.request_reflow();

        let (Some(session), Some(target)) = (self.drag.session(), target) else {
            return Ok(());
        };
        let (dragged, origin) = (session.dragged, session.origin_index);
        let count = self.displayed.len();
        let name = self.name_of(dragged);

        let Some(target_index) = self.displayed_index(target) else {
            return Ok(());
        };
        let text = if target == dragged {
            messages::returned(&name, origin + 1, count)
        } else {
            let to = reorder::drop_on_row_index(origin, target_index, count);
            let projected = reorder::moved(&self.displayed, origin, to).unwrap_or_default();
            let neighbour = if to > 0 {
                projected.get(to - 1).map(|id| (self.name_of(*id), false))
            } else {
                projected.get(to + 1).map(|id| (self.name_of(*id), true))
            };
            messages::moved(
                &name,
                to + 1,
                count,
                neighbour.as_ref().map(|(n, before)| (n.as_str(), *before)),
            )
        };
        self.announcer.announce_move(text, now);
        Ok(())
    }

    /// Keyboard move: shift the target `delta` rows from the current target
    /// (or from the picked-up row), clamped to the list.
    pub fn keyboard_step(&mut self, delta: i64, now: Instant) -> Result<(), GestureRejection> {
        let session = self.drag.session().ok_or(GestureRejection::NoSession)?;
        if session.modality != Modality::Keyboard {
            return Err(GestureRejection::ForeignModality);
        }
        if self.displayed.is_empty() {
            return Err(GestureRejection::StaleIndex);
        }
        let from = session
            .target
            .and_then(|id| self.displayed_index(id))
            .unwrap_or(session.origin_index);
        let last = self.displayed.len() as i64 - 1;
        let index = (from as i64 + delta).clamp(0, last) as usize;
        let target = self.displayed[index];
        self.hover(Modality::Keyboard, Some(target), now)?;
        self.virtualizer.scroll_to_index(index, Align::Auto);
        Ok(())
    }

    /// Commit signal. On a valid drop the reorder is applied and persisted.
    pub fn release(&mut self, modality: Modality) -> Result<Option<RequestId>, GestureRejection> {
        let outcome = self.drag.release(modality)?;
        self.virtualizer.request_reflow();
        match outcome {
            ReleaseOutcome::Drop {
                dragged,
                origin_index,
                target,
                ..
            } => {
                let (Some(from), Some(target_index)) = (self.displayed_index(dragged), self.displayed_index(target))
                else {
                    self.announce_cancel(dragged, origin_index);
                    return Err(GestureRejection::StaleIndex);
                };
                let to = reorder::drop_on_row_index(from, target_index, self.displayed.len());
                self.splice(dragged, from, to)
            }
            ReleaseOutcome::Cancelled {
                dragged,
                origin_index,
                reason,
                ..
            } => {
                tracing::debug!(channel = %dragged, reason = reason.display_name(), "drag cancelled");
                self.announce_cancel(dragged, origin_index);
                Err(reason)
            }
        }
    }

    /// Explicit cancel, whichever modality owns the session
    pub fn cancel(&mut self) -> Option<DragSession> {
        let session = self.drag.cancel()?;
        self.virtualizer.request_reflow();
        self.announce_cancel(session.dragged, session.origin_index);
        Some(session)
    }

    fn announce_cancel(&mut self, dragged: ChannelId, origin_index: usize) {
        let name = self.name_of(dragged);
        self.announcer.announce(messages::cancelled(&name, origin_index + 1));
    }

    /// Typed 1-based position for `id`. Rejections leave the order untouched.
    pub fn commit_position(&mut self, id: ChannelId, text: &str) -> Result<Option<RequestId>, GestureRejection> {
        let from = self.displayed_index(id).ok_or(GestureRejection::StaleIndex)?;
        let to = parse_position(text, self.displayed.len())?;
        if from == to {
            return Ok(None);
        }
        self.splice(id, from, to)
    }

    /// Close the position draft and commit it
    pub fn finish_position_edit(&mut self) -> Result<Option<RequestId>, GestureRejection> {
        let (id, text) = self.editor.finish().ok_or(GestureRejection::NoSession)?;
        self.commit_position(id, &text)
    }

    /// Move the displayed row at `from` to `to` and persist the full order.
    /// Rows hidden from the displayed sequence keep their slots.
    fn splice(&mut self, id: ChannelId, from: usize, to: usize) -> Result<Option<RequestId>, GestureRejection> {
        let visible = reorder::moved(&self.displayed, from, to).ok_or(GestureRejection::StaleIndex)?;
        let shown: HashSet<ChannelId> = self.displayed.iter().copied().collect();
        let full: Vec<ChannelId> = self.coordinator.local().iter().map(|c| c.id).collect();
        let order = reorder::merge_visible_order(&full, &visible, |id| shown.contains(id));

        let req = self.coordinator.apply_reorder(order)?;
        self.refresh_view();
        self.focus(id);

        let name = self.name_of(id);
        self.announcer.announce(messages::dropped(&name, to + 1, self.displayed.len()));
        tracing::info!(channel = %id, from, to, "reordered");
        Ok(req)
    }

    // --- Enable / disable with undo ---

    /// Hide `id` and start its undo countdown. The remote toggle is only sent
    /// when the countdown expires.
    pub fn schedule_disable(&mut self, id: ChannelId, now: Instant) -> Option<UndoHandle> {
        let channel = self.channel(id)?;
        if !channel.enabled {
            return None;
        }
        let name = channel.name.clone();
        if self.drag.session().is_some_and(|s| s.dragged == id) {
            self.cancel();
        }
        let handle = self.undo.schedule(id, name.clone(), now);
        self.refresh_view();
        let seconds = self.undo.window().as_secs();
        self.announcer.announce(messages::removed_pending_undo(&name, seconds));
        Some(handle)
    }

    pub fn cancel_undo(&mut self, handle: UndoHandle) -> bool {
        match self.undo.cancel(handle) {
            Some(entry) => {
                self.restored(entry);
                true
            }
            None => false,
        }
    }

    pub fn cancel_undo_channel(&mut self, id: ChannelId) -> bool {
        match self.undo.cancel_channel(id) {
            Some(entry) => {
                self.restored(entry);
                true
            }
            None => false,
        }
    }

    /// Undo the most recent pending disable
    pub fn undo_latest(&mut self) -> bool {
        match self.undo.latest().map(|e| e.channel_id) {
            Some(id) => self.cancel_undo_channel(id),
            None => false,
        }
    }

    fn restored(&mut self, entry: UndoEntry) {
        self.refresh_view();
        self.focus(entry.channel_id);
        self.announcer.announce(messages::restored(&entry.name));
    }

    /// Re-enable a channel. A channel still inside its undo window is simply
    /// restored; a disabled one is toggled remotely right away.
    pub fn enable(&mut self, id: ChannelId) -> Option<RequestId> {
        if self.cancel_undo_channel(id) {
            return None;
        }
        let channel = self.channel(id)?;
        if channel.enabled {
            return None;
        }
        let name = channel.name.clone();
        let req = self.coordinator.apply_toggle(id)?;
        self.refresh_view();
        self.announcer.announce(messages::enabled(&name));
        Some(req)
    }

    /// Advance timers: commit expired disables and settle debounced
    /// announcements.
    pub fn tick(&mut self, now: Instant) {
        let expired = self.undo.expire(now);
        if !expired.is_empty() {
            for entry in expired {
                let still_enabled = self.channel(entry.channel_id).is_some_and(|c| c.enabled);
                if still_enabled {
                    tracing::info!(channel = %entry.channel_id, "undo window expired, disabling");
                    self.coordinator.apply_toggle(entry.channel_id);
                    self.just_disabled.insert(entry.channel_id);
                }
            }
            self.refresh_view();
        }
        self.announcer.tick(now);
    }

    // --- Remote plumbing ---

    pub fn refresh(&mut self) -> RequestId {
        self.coordinator.refresh()
    }

    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        if !self.mounted {
            return Vec::new();
        }
        self.coordinator.take_outbox()
    }

    /// Apply a completed call. Results from another mount are discarded.
    pub fn handle_response(
        &mut self,
        epoch: u64,
        id: RequestId,
        result: Result<RemoteResponse, LineupError>,
    ) -> Applied {
        if epoch != self.epoch || !self.mounted {
            tracing::debug!(epoch, current = self.epoch, request = %id, "discarding late response");
            return Applied::Ignored;
        }
        let applied = self.coordinator.handle_response(id, result);
        if applied != Applied::Ignored {
            self.refresh_view();
            let dragged_gone = self
                .drag
                .session()
                .is_some_and(|s| self.displayed_index(s.dragged).is_none());
            if dragged_gone {
                self.cancel();
            }
        }
        applied
    }

    /// Re-issue what a failure notice offered to retry
    pub fn retry(&mut self, retry: Retry) -> Option<RequestId> {
        let req = match retry {
            Retry::Reorder(ids) => match self.coordinator.apply_reorder(ids) {
                Ok(req) => req,
                // The lineup changed since; fetch it again instead
                Err(_) => Some(self.coordinator.refresh()),
            },
            // The failed call may still have landed; only flip if we are not there yet
            Retry::Toggle { id, enabled } => {
                if self.channel(id).is_some_and(|c| c.enabled != enabled) {
                    self.coordinator.apply_toggle(id)
                } else {
                    None
                }
            }
            Retry::Matches(RemoteRequest::SetPrimaryMatch { channel_id, stream_id }) => {
                self.coordinator.set_primary_match(channel_id, stream_id)
            }
            Retry::Matches(RemoteRequest::AddManualMatch {
                channel_id,
                stream_id,
                as_primary,
            }) => self.coordinator.add_manual_match(channel_id, stream_id, as_primary),
            Retry::Matches(RemoteRequest::RemoveMatch(mapping_id)) => self.coordinator.remove_match(mapping_id),
            Retry::Matches(_) | Retry::Refresh => Some(self.coordinator.refresh()),
        };
        self.refresh_view();
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> AppConfig {
        AppConfig {
            announce_debounce_ms: 0,
            ..AppConfig::default()
        }
    }

    fn list(names: &[&str]) -> ChannelList {
        let channels = names
            .iter()
            .enumerate()
            .map(|(i, n)| Channel::new(i as i64 + 1, *n, i as u32))
            .collect();
        let mut list = ChannelList::with_channels(1, &config(), channels);
        list.set_viewport(10);
        list
    }

    fn shown(list: &ChannelList) -> Vec<String> {
        list.displayed()
            .iter()
            .map(|id| list.channel(*id).unwrap().name.clone())
            .collect()
    }

    fn id(list: &ChannelList, name: &str) -> ChannelId {
        list.channels().iter().find(|c| c.name == name).unwrap().id
    }

    #[test]
    fn pointer_drag_reorders_and_queues_one_call() {
        let mut list = list(&["A", "B", "C"]);
        let (a, c) = (id(&list, "A"), id(&list, "C"));
        let now = Instant::now();
        list.pick_up(Modality::Pointer, a).unwrap();
        list.hover(Modality::Pointer, Some(c), now).unwrap();
        assert_eq!(list.live_region().text, "A moved to position 3 of 3, after C.");
        list.release(Modality::Pointer).unwrap();

        assert_eq!(shown(&list), ["B", "C", "A"]);
        let outbox = list.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(
            outbox[0].request,
            RemoteRequest::SetChannelOrder(vec![ChannelId(2), ChannelId(3), ChannelId(1)])
        );
        assert_eq!(list.live_region().text, "A dropped at position 3 of 3.");
        assert_eq!(list.focused(), Some(a));
    }

    #[test]
    fn keyboard_pick_up_step_and_drop() {
        let mut list = list(&["A", "B", "C", "D"]);
        let now = Instant::now();
        list.focus(id(&list, "D"));
        list.pick_up(Modality::Keyboard, id(&list, "D")).unwrap();
        list.keyboard_step(-1, now).unwrap();
        list.keyboard_step(-1, now).unwrap();
        list.keyboard_step(-10, now).unwrap();
        assert_eq!(list.live_region().text, "D moved to position 1 of 4, before A.");
        list.release(Modality::Keyboard).unwrap();
        assert_eq!(shown(&list), ["D", "A", "B", "C"]);
        assert_eq!(list.channels().iter().map(|c| c.position).collect::<Vec<_>>(), [0, 1, 2, 3]);
    }

    #[test]
    fn stepping_back_onto_origin_announces_return_and_cancels_on_release() {
        let mut list = list(&["A", "B"]);
        let now = Instant::now();
        list.pick_up(Modality::Keyboard, id(&list, "A")).unwrap();
        list.keyboard_step(1, now).unwrap();
        list.keyboard_step(-1, now).unwrap();
        assert_eq!(list.live_region().text, "A is back at its original position 1 of 2.");
        assert_eq!(list.release(Modality::Keyboard), Err(GestureRejection::SelfDrop));
        assert_eq!(shown(&list), ["A", "B"]);
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn explicit_cancel_leaves_order_untouched() {
        let mut list = list(&["A", "B", "C"]);
        let now = Instant::now();
        list.pick_up(Modality::SimulatedMouse, id(&list, "B")).unwrap();
        list.hover(Modality::SimulatedMouse, Some(id(&list, "A")), now).unwrap();
        assert!(list.cancel().is_some());
        assert_eq!(shown(&list), ["A", "B", "C"]);
        assert_eq!(list.live_region().text, "Reorder cancelled. B returned to position 2.");
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn typed_position_moves_last_to_first() {
        let mut list = list(&["A", "B", "C", "D", "E"]);
        let e = id(&list, "E");
        let req = list.commit_position(e, "1").unwrap();
        assert!(req.is_some());
        assert_eq!(shown(&list), ["E", "A", "B", "C", "D"]);
        let outbox = list.take_outbox();
        assert_eq!(outbox.len(), 1);
        match &outbox[0].request {
            RemoteRequest::SetChannelOrder(ids) => assert_eq!(ids.len(), 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn typed_garbage_is_rejected_without_mutation() {
        let mut list = list(&["A", "B"]);
        let b = id(&list, "B");
        list.position_editor_mut().begin(b, Some('9'));
        assert_eq!(list.finish_position_edit(), Err(GestureRejection::OutOfRange));
        assert_eq!(list.position_editor().editing(), None);
        assert_eq!(shown(&list), ["A", "B"]);
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn disable_then_undo_issues_no_call() {
        let mut list = list(&["A", "B", "C"]);
        let t0 = Instant::now();
        let handle = list.schedule_disable(id(&list, "B"), t0).unwrap();
        assert_eq!(shown(&list), ["A", "C"]);
        assert_eq!(
            list.live_region().text,
            "B removed from lineup. Undo available for 5 seconds."
        );
        assert!(list.cancel_undo(handle));
        list.tick(t0 + Duration::from_secs(10));
        assert_eq!(shown(&list), ["A", "B", "C"]);
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn disable_expiry_toggles_exactly_once() {
        let mut list = list(&["A", "B", "C"]);
        let b = id(&list, "B");
        let t0 = Instant::now();
        list.schedule_disable(b, t0).unwrap();
        list.tick(t0 + Duration::from_secs(5));
        list.tick(t0 + Duration::from_secs(6));
        assert_eq!(shown(&list), ["A", "C"]);
        assert_eq!(
            list.take_outbox()
                .into_iter()
                .map(|o| o.request)
                .collect::<Vec<_>>(),
            vec![RemoteRequest::ToggleChannelEnabled(b)]
        );
    }

    #[test]
    fn reorder_keeps_hidden_rows_in_their_slots() {
        let mut list = list(&["A", "B", "C", "D"]);
        let now = Instant::now();
        list.schedule_disable(id(&list, "B"), now).unwrap();
        // Displayed [A, C, D]; move D to the top
        list.commit_position(id(&list, "D"), "1").unwrap();
        let outbox = list.take_outbox();
        assert_eq!(
            outbox[0].request,
            RemoteRequest::SetChannelOrder(vec![ChannelId(4), ChannelId(2), ChannelId(1), ChannelId(3)])
        );
    }

    #[test]
    fn expanding_reflows_rows_below() {
        let mut channels: Vec<Channel> = (0..4).map(|i| Channel::new(i + 1, format!("C{i}"), i as u32)).collect();
        channels[1].matches = vec![Match::default(), Match::default()];
        let mut list = ChannelList::with_channels(1, &config(), channels);
        list.set_viewport(20);
        assert_eq!(list.total_extent(), 4);

        list.toggle_expand(ChannelId(2));
        assert_eq!(list.total_extent(), 7);
        let items = list.virtual_items();
        assert_eq!(items[1].size, 4);
        assert_eq!(items[2].start, 5);

        list.toggle_expand(ChannelId(2));
        assert_eq!(list.virtual_items()[2].start, 2);
    }

    #[test]
    fn responses_after_unmount_are_discarded() {
        let mut list = list(&["A", "B"]);
        list.commit_position(id(&list, "B"), "1").unwrap();
        let outbox = list.take_outbox();
        list.unmount();
        let applied = list.handle_response(
            1,
            outbox[0].id,
            Err(LineupError::Server(500, "late".into())),
        );
        assert_eq!(applied, Applied::Ignored);
        assert!(list.notices().is_empty());
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn rejected_reorder_reverts_and_offers_retry() {
        let mut list = list(&["A", "B", "C"]);
        list.commit_position(id(&list, "C"), "1").unwrap();
        let outbox = list.take_outbox();
        list.handle_response(1, outbox[0].id, Err(LineupError::Rejected("nope".into())));
        assert_eq!(shown(&list), ["A", "B", "C"]);
        let retry = list.notices()[0].retry.clone().unwrap();

        let refetch = list.take_outbox();
        assert_eq!(refetch[0].request, RemoteRequest::ListChannels);

        list.retry(retry);
        assert_eq!(shown(&list), ["C", "A", "B"]);
    }

    #[test]
    fn disabled_filter_shows_and_reenables() {
        let mut channels: Vec<Channel> = (0..3).map(|i| Channel::new(i + 1, format!("C{i}"), i as u32)).collect();
        channels[2].enabled = false;
        let mut list = ChannelList::with_channels(1, &config(), channels);
        assert_eq!(list.displayed().len(), 2);
        list.toggle_show_disabled();
        assert_eq!(list.displayed().len(), 3);
        assert!(list.enable(ChannelId(3)).is_some());
        assert!(list.channel(ChannelId(3)).unwrap().enabled);
        assert_eq!(list.live_region().text, "C2 enabled.");
    }

    #[test]
    fn retrying_a_timed_out_disable_that_landed_sends_nothing() {
        let mut list = list(&["A", "B"]);
        let a = id(&list, "A");
        let now = Instant::now();
        list.schedule_disable(a, now).unwrap();
        list.tick(now + Duration::from_secs(60));
        let toggle = list.take_outbox();
        assert_eq!(toggle[0].request, RemoteRequest::ToggleChannelEnabled(a));

        list.handle_response(
            1,
            toggle[0].id,
            Err(LineupError::Timeout(crate::errors::Command::ToggleChannelEnabled, 10)),
        );
        let retry = list.take_notices()[0].retry.clone().unwrap();

        // The backend applied the disable before the client gave up
        let refetch = list.take_outbox();
        let mut canonical = list.channels().to_vec();
        canonical[0].enabled = false;
        list.handle_response(1, refetch[0].id, Ok(RemoteResponse::Channels(canonical)));
        assert!(!list.channel(a).unwrap().enabled);

        assert_eq!(list.retry(retry), None);
        assert!(!list.channel(a).unwrap().enabled);
        assert!(list.take_outbox().is_empty());
    }

    #[test]
    fn retrying_a_timed_out_disable_that_did_not_land_toggles_again() {
        let mut list = list(&["A", "B"]);
        let a = id(&list, "A");
        let now = Instant::now();
        list.schedule_disable(a, now).unwrap();
        list.tick(now + Duration::from_secs(60));
        let toggle = list.take_outbox();
        list.handle_response(
            1,
            toggle[0].id,
            Err(LineupError::Timeout(crate::errors::Command::ToggleChannelEnabled, 10)),
        );
        let retry = list.take_notices()[0].retry.clone().unwrap();
        list.take_outbox();
        assert!(list.channel(a).unwrap().enabled);

        assert!(list.retry(retry).is_some());
        assert!(!list.channel(a).unwrap().enabled);
        let outbox = list.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].request, RemoteRequest::ToggleChannelEnabled(a));
    }

    #[test]
    fn expired_disable_stays_hidden_with_disabled_rows_shown() {
        let mut list = list(&["A", "B", "C"]);
        list.toggle_show_disabled();
        let b = id(&list, "B");
        let now = Instant::now();
        list.schedule_disable(b, now).unwrap();
        list.tick(now + Duration::from_secs(60));
        assert_eq!(list.take_outbox().len(), 1);
        assert_eq!(shown(&list), ["A", "C"]);

        // Toggling the filter off and on again reveals it as disabled
        list.toggle_show_disabled();
        list.toggle_show_disabled();
        assert_eq!(shown(&list), ["A", "B", "C"]);
        assert!(!list.channel(b).unwrap().enabled);
    }
}
