//! Optimistic persistence for the channel lineup.
//!
//! Two copies of the lineup are kept: `server`, the last state the backend
//! confirmed, and `local`, what the user sees. Mutations change `local` at
//! once and queue a [`RemoteRequest`] in the outbox; the shell runs the call
//! and feeds the result back through [`Coordinator::handle_response`].
//!
//! Rules:
//! - the next optimistic state is computed from the current `local`;
//! - a failed mutation resets `local` to `server` (never to an intermediate
//!   optimistic state), marks everything still in flight as superseded and
//!   queues a re-fetch;
//! - an order acknowledgement older than one already applied is ignored;
//! - a canonical record only reaches `local` when it answers the newest
//!   mutation of that row;
//! - a fetched lineup becomes the new `server`, and `local` is rebuilt from it
//!   by re-applying mutations that are still in flight and not superseded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::api::{Channel, Match, RemoteRequest, RemoteResponse};
use crate::errors::{GestureRejection, LineupError};
use crate::flex_id::{ChannelId, MappingId, StreamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sync state of one mutated entity (the lineup order, or a channel row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Clean,
    /// Applied locally, waiting for the backend to confirm request
    Optimistic(RequestId),
    /// Rolled back; waiting for the authoritative re-fetch
    Reconciling(RequestId),
}

impl SyncState {
    pub fn is_clean(&self) -> bool {
        matches!(self, SyncState::Clean)
    }
}

/// A call waiting to be dispatched
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub id: RequestId,
    pub request: RemoteRequest,
}

/// What the presentation layer should re-issue if the user asks to retry
#[derive(Debug, Clone, PartialEq)]
pub enum Retry {
    Reorder(Vec<ChannelId>),
    /// `enabled` is the state the failed call was meant to reach
    Toggle { id: ChannelId, enabled: bool },
    Matches(RemoteRequest),
    Refresh,
}

/// User-visible failure notice
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub detail: String,
    pub retry: Option<Retry>,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    fn new(message: String, detail: String, retry: Option<Retry>) -> Self {
        Self {
            message,
            detail,
            retry,
            raised_at: Utc::now(),
        }
    }
}

/// What a response did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Unknown request (already handled, or from a previous mount)
    Ignored,
    Acknowledged,
    Refreshed,
    RolledBack,
    RefreshFailed,
}

#[derive(Debug, Clone, PartialEq)]
enum MatchEdit {
    SetPrimary(StreamId),
    Add,
    Remove(MappingId),
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Fetch,
    Order(Vec<ChannelId>),
    Toggle { id: ChannelId, enabled: bool },
    Matches { id: ChannelId, edit: MatchEdit },
}

impl Pending {
    fn row(&self) -> Option<ChannelId> {
        match self {
            Pending::Toggle { id, .. } | Pending::Matches { id, .. } => Some(*id),
            Pending::Fetch | Pending::Order(_) => None,
        }
    }
}

/// Newest acknowledged state of one row
#[derive(Debug, Clone, Default)]
struct RowAck {
    record: Option<(RequestId, Channel)>,
    matches: Option<(RequestId, Vec<Match>)>,
}

impl RowAck {
    /// Drop what a list response issued at `fetch` already reflects
    fn forget_through(&mut self, fetch: RequestId) {
        if matches!(&self.record, Some((acked, _)) if *acked <= fetch) {
            self.record = None;
        }
        if matches!(&self.matches, Some((acked, _)) if *acked <= fetch) {
            self.matches = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.record.is_none() && self.matches.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Coordinator {
    server: Vec<Channel>,
    local: Vec<Channel>,
    loaded: bool,
    order_sync: SyncState,
    rows: HashMap<ChannelId, SyncState>,
    pending: BTreeMap<RequestId, (Pending, RemoteRequest)>,
    outbox: Vec<Outgoing>,
    notices: Vec<Notice>,
    next_request: u64,
    /// Newest acknowledged order, replayed over list responses issued before it
    order_acked: Option<(RequestId, Vec<ChannelId>)>,
    row_acks: HashMap<ChannelId, RowAck>,
    /// Requests at or below this id were superseded by a rollback
    rollback_floor: Option<RequestId>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed both copies directly, as if a fetch had just completed
    pub fn with_channels(mut channels: Vec<Channel>) -> Self {
        channels.sort_by_key(|c| c.position);
        Self {
            server: channels.clone(),
            local: channels,
            loaded: true,
            ..Self::default()
        }
    }

    pub fn local(&self) -> &[Channel] {
        &self.local
    }

    pub fn server(&self) -> &[Channel] {
        &self.server
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.local.iter().find(|c| c.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn order_sync(&self) -> SyncState {
        self.order_sync
    }

    pub fn row_sync(&self, id: ChannelId) -> SyncState {
        self.rows.get(&id).copied().unwrap_or_default()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_fetching(&self) -> bool {
        self.pending.values().any(|(p, _)| matches!(p, Pending::Fetch))
    }

    pub fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn issue(&mut self, pending: Pending, request: RemoteRequest) -> RequestId {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        tracing::info!(request = %id, command = %request.command(), "queueing remote call");
        self.pending.insert(id, (pending, request.clone()));
        self.outbox.push(Outgoing { id, request });
        id
    }

    fn superseded(&self, id: RequestId) -> bool {
        self.rollback_floor.is_some_and(|floor| id <= floor)
    }

    /// Queue a fetch of the authoritative lineup
    pub fn refresh(&mut self) -> RequestId {
        self.issue(Pending::Fetch, RemoteRequest::ListChannels)
    }

    /// Replace the lineup order. `ids` must be a permutation of the current
    /// local ids; returns `Ok(None)` when it is the current order.
    pub fn apply_reorder(&mut self, ids: Vec<ChannelId>) -> Result<Option<RequestId>, GestureRejection> {
        if !is_permutation_of(&ids, &self.local) {
            return Err(GestureRejection::StaleIndex);
        }
        if self.local.iter().map(|c| c.id).eq(ids.iter().copied()) {
            return Ok(None);
        }

        apply_order(&mut self.local, &ids);
        let id = self.issue(Pending::Order(ids.clone()), RemoteRequest::SetChannelOrder(ids));
        self.order_sync = SyncState::Optimistic(id);
        Ok(Some(id))
    }

    /// Flip a channel's enabled flag
    pub fn apply_toggle(&mut self, channel_id: ChannelId) -> Option<RequestId> {
        let channel = self.local.iter_mut().find(|c| c.id == channel_id)?;
        channel.enabled = !channel.enabled;
        let enabled = channel.enabled;
        let id = self.issue(
            Pending::Toggle {
                id: channel_id,
                enabled,
            },
            RemoteRequest::ToggleChannelEnabled(channel_id),
        );
        self.rows.insert(channel_id, SyncState::Optimistic(id));
        Some(id)
    }

    pub fn set_primary_match(&mut self, channel_id: ChannelId, stream_id: StreamId) -> Option<RequestId> {
        let channel = self.local.iter_mut().find(|c| c.id == channel_id)?;
        if !channel.matches.iter().any(|m| m.stream_id == stream_id) {
            return None;
        }
        let edit = MatchEdit::SetPrimary(stream_id);
        apply_match_edit(&mut channel.matches, &edit);
        let id = self.issue(
            Pending::Matches { id: channel_id, edit },
            RemoteRequest::SetPrimaryMatch {
                channel_id,
                stream_id,
            },
        );
        self.rows.insert(channel_id, SyncState::Optimistic(id));
        Some(id)
    }

    /// Nothing changes locally until the backend returns the canonical match
    /// list; the row is marked in flight meanwhile.
    pub fn add_manual_match(&mut self, channel_id: ChannelId, stream_id: StreamId, as_primary: bool) -> Option<RequestId> {
        self.channel(channel_id)?;
        let id = self.issue(
            Pending::Matches {
                id: channel_id,
                edit: MatchEdit::Add,
            },
            RemoteRequest::AddManualMatch {
                channel_id,
                stream_id,
                as_primary,
            },
        );
        self.rows.insert(channel_id, SyncState::Optimistic(id));
        Some(id)
    }

    pub fn remove_match(&mut self, mapping_id: MappingId) -> Option<RequestId> {
        let channel = self
            .local
            .iter_mut()
            .find(|c| c.matches.iter().any(|m| m.mapping_id == mapping_id))?;
        let channel_id = channel.id;
        let edit = MatchEdit::Remove(mapping_id);
        apply_match_edit(&mut channel.matches, &edit);
        let id = self.issue(
            Pending::Matches { id: channel_id, edit },
            RemoteRequest::RemoveMatch(mapping_id),
        );
        self.rows.insert(channel_id, SyncState::Optimistic(id));
        Some(id)
    }

    /// Reconcile one completed call
    pub fn handle_response(&mut self, id: RequestId, result: Result<RemoteResponse, LineupError>) -> Applied {
        let Some((pending, request)) = self.pending.remove(&id) else {
            tracing::debug!(request = %id, "discarding response for unknown request");
            return Applied::Ignored;
        };
        let toggle_target = match &pending {
            Pending::Toggle { enabled, .. } => Some(*enabled),
            _ => None,
        };

        match (pending, result) {
            (Pending::Fetch, Ok(RemoteResponse::Channels(channels))) => {
                self.apply_fetch(id, channels);
                Applied::Refreshed
            }
            (Pending::Fetch, Ok(other)) => {
                self.fetch_failed(id, LineupError::Parse(format!("unexpected response {other:?}")));
                Applied::RefreshFailed
            }
            (Pending::Fetch, Err(err)) => {
                self.fetch_failed(id, err);
                Applied::RefreshFailed
            }
            (Pending::Order(ids), Ok(RemoteResponse::Ordered)) => {
                if self.order_acked.as_ref().map_or(true, |(acked, _)| id > *acked) {
                    apply_order(&mut self.server, &ids);
                    self.order_acked = Some((id, ids));
                }
                if self.order_sync == SyncState::Optimistic(id) {
                    self.order_sync = SyncState::Clean;
                }
                Applied::Acknowledged
            }
            (Pending::Toggle { id: channel_id, .. }, Ok(RemoteResponse::Toggled(record))) => {
                if record.id != channel_id {
                    return self.mutation_failed(
                        id,
                        request,
                        toggle_target,
                        LineupError::Parse(format!("toggle returned channel {}", record.id)),
                    );
                }
                replace_record(&mut self.server, &record);
                let ack = self.row_acks.entry(channel_id).or_default();
                if ack.record.as_ref().map_or(true, |(acked, _)| id > *acked) {
                    ack.record = Some((id, record.clone()));
                }
                if self.answers_newest(channel_id, id) {
                    replace_record(&mut self.local, &record);
                    self.rows.remove(&channel_id);
                }
                Applied::Acknowledged
            }
            (Pending::Matches { id: channel_id, .. }, Ok(RemoteResponse::Matches(matches))) => {
                set_matches(&mut self.server, channel_id, matches.clone());
                let ack = self.row_acks.entry(channel_id).or_default();
                if ack.matches.as_ref().map_or(true, |(acked, _)| id > *acked) {
                    ack.matches = Some((id, matches.clone()));
                }
                if self.answers_newest(channel_id, id) {
                    set_matches(&mut self.local, channel_id, matches);
                    self.rows.remove(&channel_id);
                }
                Applied::Acknowledged
            }
            (_, Ok(other)) => self.mutation_failed(
                id,
                request,
                toggle_target,
                LineupError::Parse(format!("unexpected response {other:?}")),
            ),
            (_, Err(err)) => self.mutation_failed(id, request, toggle_target, err),
        }
    }

    fn answers_newest(&self, channel_id: ChannelId, id: RequestId) -> bool {
        !self.superseded(id) && self.rows.get(&channel_id) == Some(&SyncState::Optimistic(id))
    }

    fn apply_fetch(&mut self, id: RequestId, mut channels: Vec<Channel>) {
        channels.sort_by_key(|c| c.position);
        tracing::info!(request = %id, count = channels.len(), "lineup fetched");
        self.server = channels;
        self.loaded = true;
        self.replay_acks_after(id);

        let mut local = self.server.clone();
        for (req, (pending, _)) in &self.pending {
            if self.superseded(*req) {
                continue;
            }
            match pending {
                Pending::Fetch => {}
                Pending::Order(ids) => {
                    if is_permutation_of(ids, &local) {
                        apply_order(&mut local, ids);
                    }
                }
                Pending::Toggle { id, enabled } => {
                    if let Some(channel) = local.iter_mut().find(|c| c.id == *id) {
                        channel.enabled = *enabled;
                    }
                }
                Pending::Matches { id, edit } => {
                    if let Some(channel) = local.iter_mut().find(|c| c.id == *id) {
                        apply_match_edit(&mut channel.matches, edit);
                    }
                }
            }
        }
        self.local = local;

        let live: HashSet<ChannelId> = self.local.iter().map(|c| c.id).collect();
        self.rows.retain(|row, state| {
            live.contains(row) && !matches!(state, SyncState::Reconciling(r) if *r <= id)
        });
        if matches!(self.order_sync, SyncState::Reconciling(r) if r <= id) {
            self.order_sync = SyncState::Clean;
        }
    }

    /// Re-apply acknowledged mutations issued after the list request `fetch`;
    /// its snapshot predates them.
    fn replay_acks_after(&mut self, fetch: RequestId) {
        if matches!(&self.order_acked, Some((acked, _)) if *acked <= fetch) {
            self.order_acked = None;
        }
        self.row_acks.retain(|_, ack| {
            ack.forget_through(fetch);
            !ack.is_empty()
        });

        if let Some((acked, ids)) = &self.order_acked {
            if is_permutation_of(ids, &self.server) {
                tracing::debug!(request = %acked, "replaying acknowledged order over older lineup");
                apply_order(&mut self.server, ids);
            }
        }
        for (row, ack) in &self.row_acks {
            match (&ack.record, &ack.matches) {
                (Some((r, record)), Some((m, matches))) if m > r => {
                    replace_record(&mut self.server, record);
                    set_matches(&mut self.server, *row, matches.clone());
                }
                (Some((_, record)), _) => replace_record(&mut self.server, record),
                (None, Some((_, matches))) => set_matches(&mut self.server, *row, matches.clone()),
                (None, None) => {}
            }
        }
    }

    fn fetch_failed(&mut self, id: RequestId, err: LineupError) {
        tracing::warn!(request = %id, error = %err, "lineup fetch failed");
        self.rows
            .retain(|_, state| !matches!(state, SyncState::Reconciling(r) if *r <= id));
        if matches!(self.order_sync, SyncState::Reconciling(r) if r <= id) {
            self.order_sync = SyncState::Clean;
        }
        self.notices.push(Notice::new(
            "Could not refresh the lineup".to_string(),
            err.diagnostics(),
            Some(Retry::Refresh),
        ));
    }

    fn mutation_failed(
        &mut self,
        id: RequestId,
        request: RemoteRequest,
        toggle_target: Option<bool>,
        err: LineupError,
    ) -> Applied {
        let failed_row = match &request {
            RemoteRequest::ToggleChannelEnabled(channel_id)
            | RemoteRequest::SetPrimaryMatch { channel_id, .. }
            | RemoteRequest::AddManualMatch { channel_id, .. } => Some(*channel_id),
            _ => None,
        };

        if self.superseded(id) {
            // The rollback that superseded this call already restored the
            // server state and queued a fetch.
            tracing::warn!(request = %id, error = %err, "superseded call failed");
            if let Some(row) = failed_row {
                if self.rows.get(&row) == Some(&SyncState::Optimistic(id)) {
                    self.rows.remove(&row);
                }
            }
            return Applied::Acknowledged;
        }

        tracing::warn!(request = %id, command = %request.command(), error = %err, "rolling back optimistic update");

        let retry = match (&request, toggle_target) {
            (RemoteRequest::SetChannelOrder(ids), _) => Retry::Reorder(ids.clone()),
            (RemoteRequest::ToggleChannelEnabled(channel_id), Some(enabled)) => Retry::Toggle {
                id: *channel_id,
                enabled,
            },
            (RemoteRequest::ToggleChannelEnabled(_), None) | (RemoteRequest::ListChannels, _) => Retry::Refresh,
            (other, _) => Retry::Matches(other.clone()),
        };

        self.rollback_floor = Some(RequestId(self.next_request));
        self.local = self.server.clone();
        let fetch = self.refresh();

        let optimistic_rows: Vec<ChannelId> = self
            .rows
            .iter()
            .filter(|(_, state)| !state.is_clean())
            .map(|(row, _)| *row)
            .collect();
        for row in optimistic_rows.into_iter().chain(failed_row) {
            self.rows.insert(row, SyncState::Reconciling(fetch));
        }
        if !self.order_sync.is_clean() || matches!(request, RemoteRequest::SetChannelOrder(_)) {
            self.order_sync = SyncState::Reconciling(fetch);
        }

        self.notices.push(Notice::new(
            format!("{} failed: {}", request.command().display_name(), err.summary()),
            err.diagnostics(),
            Some(retry),
        ));
        Applied::RolledBack
    }
}

fn is_permutation_of(ids: &[ChannelId], channels: &[Channel]) -> bool {
    if ids.len() != channels.len() {
        return false;
    }
    let wanted: HashSet<ChannelId> = ids.iter().copied().collect();
    wanted.len() == ids.len() && channels.iter().all(|c| wanted.contains(&c.id))
}

/// Sort `channels` into `ids` order and renumber positions from 0. Channels
/// missing from `ids` keep their relative order at the end.
fn apply_order(channels: &mut [Channel], ids: &[ChannelId]) {
    let rank: HashMap<ChannelId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    channels.sort_by_key(|c| rank.get(&c.id).copied().unwrap_or(usize::MAX));
    for (position, channel) in channels.iter_mut().enumerate() {
        channel.position = position as u32;
    }
}

/// Take the canonical fields of `record`, keeping the ordinal we already hold
fn replace_record(channels: &mut [Channel], record: &Channel) {
    if let Some(channel) = channels.iter_mut().find(|c| c.id == record.id) {
        let position = channel.position;
        *channel = record.clone();
        channel.position = position;
    }
}

fn set_matches(channels: &mut [Channel], id: ChannelId, matches: Vec<Match>) {
    if let Some(channel) = channels.iter_mut().find(|c| c.id == id) {
        channel.matches = matches;
    }
}

fn apply_match_edit(matches: &mut Vec<Match>, edit: &MatchEdit) {
    match edit {
        MatchEdit::SetPrimary(stream_id) => {
            for m in matches.iter_mut() {
                m.is_primary = m.stream_id == *stream_id;
            }
        }
        MatchEdit::Remove(mapping_id) => matches.retain(|m| m.mapping_id != *mapping_id),
        MatchEdit::Add => {}
    }
}
