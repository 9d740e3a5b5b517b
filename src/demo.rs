//! In-process channel service: backs `--demo`, the QA driver and tests.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::api::{Channel, ChannelService, Match, RemoteRequest};
use crate::errors::{Command, LineupError};
use crate::flex_id::{ChannelId, MappingId, StreamId};

const DEMO_NAMES: &[&str] = &[
    "BBC One",
    "BBC Two",
    "ITV1",
    "Channel 4",
    "Channel 5",
    "Sky News",
    "CNN International",
    "Al Jazeera English",
    "France 24",
    "DW News",
    "ESPN",
    "Eurosport 1",
    "Eurosport 2",
    "Sky Sports Main Event",
    "TNT Sports 1",
    "Discovery",
    "National Geographic",
    "History",
    "Comedy Central",
    "MTV",
];

const QUALITY_TAGS: &[&str] = &["FHD", "HD", "SD"];

#[derive(Debug, Default)]
struct MemoryState {
    channels: Vec<Channel>,
    calls: Vec<RemoteRequest>,
    failures: Vec<(Command, LineupError)>,
    next_mapping: i64,
}

/// Lineup held in memory. Every call is recorded; failures can be queued per
/// command and an artificial latency applied to all calls.
#[derive(Debug, Default)]
pub struct MemoryChannelService {
    state: Mutex<MemoryState>,
    latency: Mutex<Duration>,
}

impl MemoryChannelService {
    pub fn new(mut channels: Vec<Channel>) -> Self {
        channels.sort_by_key(|c| c.position);
        let next_mapping = channels
            .iter()
            .flat_map(|c| c.matches.iter().map(|m| m.mapping_id.get()))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            state: Mutex::new(MemoryState {
                channels,
                next_mapping,
                ..MemoryState::default()
            }),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// A lineup of `count` channels with a spread of match counts, a few
    /// disabled channels and some orphaned streams.
    pub fn demo(count: usize) -> Self {
        Self::new(demo_lineup(count))
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = latency;
    }

    fn latency(&self) -> Duration {
        *self.latency.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next call of `command` fail with `error`
    pub fn fail_next(&self, command: Command, error: LineupError) {
        self.state().failures.push((command, error));
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, command: Command) -> Vec<RemoteRequest> {
        self.state()
            .calls
            .iter()
            .filter(|r| r.command() == command)
            .cloned()
            .collect()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.state().channels.clone()
    }

    async fn begin(&self, request: RemoteRequest) -> Result<(), LineupError> {
        let command = request.command();
        self.state().calls.push(request);
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state();
        if let Some(pos) = state.failures.iter().position(|(c, _)| *c == command) {
            let (_, error) = state.failures.remove(pos);
            tracing::debug!(%command, %error, "injected failure");
            return Err(error);
        }
        Ok(())
    }
}

fn channel_mut(channels: &mut [Channel], id: ChannelId) -> Result<&mut Channel, LineupError> {
    channels
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| LineupError::Rejected(format!("unknown channel {id}")))
}

impl ChannelService for MemoryChannelService {
    fn list_channels_with_mappings(&self) -> BoxFuture<'_, Result<Vec<Channel>, LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::ListChannels).await?;
            Ok(self.state().channels.clone())
        })
    }

    fn set_channel_order(&self, ordered_ids: Vec<ChannelId>) -> BoxFuture<'_, Result<(), LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::SetChannelOrder(ordered_ids.clone())).await?;
            let mut state = self.state();
            let mut reordered = Vec::with_capacity(ordered_ids.len());
            for id in &ordered_ids {
                let channel = state
                    .channels
                    .iter()
                    .find(|c| c.id == *id)
                    .ok_or_else(|| LineupError::Rejected(format!("unknown channel {id}")))?;
                reordered.push(channel.clone());
            }
            if reordered.len() != state.channels.len() {
                return Err(LineupError::Rejected("order must list every channel once".to_string()));
            }
            for (position, channel) in reordered.iter_mut().enumerate() {
                channel.position = position as u32;
            }
            state.channels = reordered;
            Ok(())
        })
    }

    fn toggle_channel_enabled(&self, id: ChannelId) -> BoxFuture<'_, Result<Channel, LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::ToggleChannelEnabled(id)).await?;
            let mut state = self.state();
            let channel = channel_mut(&mut state.channels, id)?;
            channel.enabled = !channel.enabled;
            Ok(channel.clone())
        })
    }

    fn set_primary_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::SetPrimaryMatch {
                channel_id,
                stream_id,
            })
            .await?;
            let mut state = self.state();
            let channel = channel_mut(&mut state.channels, channel_id)?;
            if !channel.matches.iter().any(|m| m.stream_id == stream_id) {
                return Err(LineupError::Rejected(format!("stream {stream_id} is not matched")));
            }
            for m in channel.matches.iter_mut() {
                m.is_primary = m.stream_id == stream_id;
            }
            Ok(channel.matches.clone())
        })
    }

    fn add_manual_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
        as_primary: bool,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::AddManualMatch {
                channel_id,
                stream_id,
                as_primary,
            })
            .await?;
            let mut state = self.state();
            let mapping_id = MappingId(state.next_mapping);
            state.next_mapping += 1;
            let channel = channel_mut(&mut state.channels, channel_id)?;
            let first = channel.matches.is_empty();
            if as_primary {
                for m in channel.matches.iter_mut() {
                    m.is_primary = false;
                }
            }
            channel.matches.push(Match {
                mapping_id,
                stream_id,
                name: format!("Stream {stream_id}"),
                confidence: 1.0,
                is_primary: as_primary || first,
                is_manual: true,
                ..Match::default()
            });
            Ok(channel.matches.clone())
        })
    }

    fn remove_match(&self, mapping_id: MappingId) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move {
            self.begin(RemoteRequest::RemoveMatch(mapping_id)).await?;
            let mut state = self.state();
            let channel = state
                .channels
                .iter_mut()
                .find(|c| c.matches.iter().any(|m| m.mapping_id == mapping_id))
                .ok_or_else(|| LineupError::Rejected(format!("unknown mapping {mapping_id}")))?;
            channel.matches.retain(|m| m.mapping_id != mapping_id);
            Ok(channel.matches.clone())
        })
    }
}

/// Deterministic demo lineup
pub fn demo_lineup(count: usize) -> Vec<Channel> {
    (0..count)
        .map(|i| {
            let name = match DEMO_NAMES.get(i) {
                Some(name) => name.to_string(),
                None => format!("Regional {:03}", i + 1 - DEMO_NAMES.len()),
            };
            let mut channel = Channel::new(i as i64 + 1, name.clone(), i as u32);
            channel.enabled = i % 11 != 7;
            channel.matches = (0..i % 4)
                .map(|k| Match {
                    mapping_id: MappingId((i * 10 + k) as i64 + 1),
                    stream_id: StreamId(10_000 + (i * 10 + k) as i64),
                    name: format!("{} {}", name, QUALITY_TAGS[k % QUALITY_TAGS.len()]),
                    quality_tags: vec![QUALITY_TAGS[k % QUALITY_TAGS.len()].to_string()],
                    confidence: 0.98 - k as f32 * 0.12,
                    is_primary: k == 0,
                    is_manual: false,
                    is_orphaned: i % 17 == 3 && k == 2,
                })
                .collect();
            channel
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_lineup_is_contiguous_and_varied() {
        let lineup = demo_lineup(40);
        assert_eq!(lineup.len(), 40);
        assert!(lineup.iter().enumerate().all(|(i, c)| c.position == i as u32));
        assert!(lineup.iter().any(|c| !c.enabled));
        assert!(lineup.iter().any(|c| c.match_count() == 3));
        assert!(lineup.iter().any(Channel::has_orphans));
        assert_eq!(lineup[20].name, "Regional 001");
        for channel in &lineup {
            assert!(channel.matches.iter().filter(|m| m.is_primary).count() <= 1);
        }
    }

    #[tokio::test]
    async fn records_calls_and_applies_order() {
        let service = MemoryChannelService::demo(3);
        service
            .set_channel_order(vec![ChannelId(3), ChannelId(1), ChannelId(2)])
            .await
            .unwrap();
        let names: Vec<_> = service.channels().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["ITV1", "BBC One", "BBC Two"]);
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn incomplete_order_is_rejected() {
        let service = MemoryChannelService::demo(3);
        let err = service.set_channel_order(vec![ChannelId(1)]).await.unwrap_err();
        assert!(matches!(err, LineupError::Rejected(_)));
    }

    #[tokio::test]
    async fn injected_failure_hits_only_the_next_call() {
        let service = MemoryChannelService::demo(3);
        service.fail_next(Command::ToggleChannelEnabled, LineupError::Server(503, "busy".into()));
        assert!(service.toggle_channel_enabled(ChannelId(1)).await.is_err());
        let channel = service.toggle_channel_enabled(ChannelId(1)).await.unwrap();
        assert!(!channel.enabled);
        assert_eq!(service.calls_of(Command::ToggleChannelEnabled).len(), 2);
    }

    #[tokio::test]
    async fn manual_match_can_become_primary() {
        let service = MemoryChannelService::demo(4);
        let matches = service
            .add_manual_match(ChannelId(3), StreamId(77), true)
            .await
            .unwrap();
        assert_eq!(matches.len(), 3);
        let primary: Vec<_> = matches.iter().filter(|m| m.is_primary).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].stream_id, StreamId(77));
        assert!(primary[0].is_manual);

        let remaining = service.remove_match(primary[0].mapping_id).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
