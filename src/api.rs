use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{Command, LineupError};
use crate::flex_id::{deserialize_flex_f32, ChannelId, MappingId, StreamId};

/// A stream bound to a lineup channel
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub mapping_id: MappingId,
    pub stream_id: StreamId,
    pub name: String,
    #[serde(default)]
    pub quality_tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_flex_f32")]
    pub confidence: f32,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_manual: bool,
    /// Provider stream can no longer be resolved
    #[serde(default)]
    pub is_orphaned: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub matches: Vec<Match>,
}

fn default_enabled() -> bool {
    true
}

impl Channel {
    pub fn new(id: i64, name: impl Into<String>, position: u32) -> Self {
        Self {
            id: ChannelId(id),
            name: name.into(),
            icon: None,
            enabled: true,
            position,
            matches: Vec::new(),
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn primary_match(&self) -> Option<&Match> {
        self.matches.iter().find(|m| m.is_primary)
    }

    pub fn has_orphans(&self) -> bool {
        self.matches.iter().any(|m| m.is_orphaned)
    }
}

/// One call to the channel-management backend
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRequest {
    ListChannels,
    SetChannelOrder(Vec<ChannelId>),
    ToggleChannelEnabled(ChannelId),
    SetPrimaryMatch {
        channel_id: ChannelId,
        stream_id: StreamId,
    },
    AddManualMatch {
        channel_id: ChannelId,
        stream_id: StreamId,
        as_primary: bool,
    },
    RemoveMatch(MappingId),
}

impl RemoteRequest {
    pub fn command(&self) -> Command {
        match self {
            RemoteRequest::ListChannels => Command::ListChannels,
            RemoteRequest::SetChannelOrder(_) => Command::SetChannelOrder,
            RemoteRequest::ToggleChannelEnabled(_) => Command::ToggleChannelEnabled,
            RemoteRequest::SetPrimaryMatch { .. } => Command::SetPrimaryMatch,
            RemoteRequest::AddManualMatch { .. } => Command::AddManualMatch,
            RemoteRequest::RemoveMatch(_) => Command::RemoveMatch,
        }
    }
}

/// Successful result of a [`RemoteRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResponse {
    Channels(Vec<Channel>),
    Ordered,
    Toggled(Channel),
    Matches(Vec<Match>),
}

/// Remote channel-management service
pub trait ChannelService: Send + Sync {
    fn list_channels_with_mappings(&self) -> BoxFuture<'_, Result<Vec<Channel>, LineupError>>;

    fn set_channel_order(&self, ordered_ids: Vec<ChannelId>) -> BoxFuture<'_, Result<(), LineupError>>;

    fn toggle_channel_enabled(&self, id: ChannelId) -> BoxFuture<'_, Result<Channel, LineupError>>;

    fn set_primary_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>>;

    fn add_manual_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
        as_primary: bool,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>>;

    fn remove_match(&self, mapping_id: MappingId) -> BoxFuture<'_, Result<Vec<Match>, LineupError>>;
}

/// Run one request against a service
pub async fn execute(
    service: &dyn ChannelService,
    request: RemoteRequest,
) -> Result<RemoteResponse, LineupError> {
    match request {
        RemoteRequest::ListChannels => service
            .list_channels_with_mappings()
            .await
            .map(RemoteResponse::Channels),
        RemoteRequest::SetChannelOrder(ids) => service
            .set_channel_order(ids)
            .await
            .map(|_| RemoteResponse::Ordered),
        RemoteRequest::ToggleChannelEnabled(id) => service
            .toggle_channel_enabled(id)
            .await
            .map(RemoteResponse::Toggled),
        RemoteRequest::SetPrimaryMatch {
            channel_id,
            stream_id,
        } => service
            .set_primary_match(channel_id, stream_id)
            .await
            .map(RemoteResponse::Matches),
        RemoteRequest::AddManualMatch {
            channel_id,
            stream_id,
            as_primary,
        } => service
            .add_manual_match(channel_id, stream_id, as_primary)
            .await
            .map(RemoteResponse::Matches),
        RemoteRequest::RemoveMatch(mapping_id) => service
            .remove_match(mapping_id)
            .await
            .map(RemoteResponse::Matches),
    }
}

/// JSON command transport: `POST {base_url}/invoke/{command}` with a camelCase
/// argument object; the response body is the command's return value.
#[derive(Debug, Clone)]
pub struct CommandClient {
    pub base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl CommandClient {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .user_agent(concat!("iptv-lineup/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url,
            timeout_secs,
            client,
        }
    }

    fn endpoint(&self, command: Command) -> String {
        format!("{}/invoke/{}", self.base_url, command.wire_name())
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        command: Command,
        args: serde_json::Value,
    ) -> Result<T, LineupError> {
        let url = self.endpoint(command);
        tracing::debug!(%command, %url, "invoking backend command");

        let response = self
            .client
            .post(&url)
            .json(&args)
            .send()
            .await
            .map_err(|e| LineupError::from_reqwest(command, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body
            };
            return Err(LineupError::Server(status.as_u16(), message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LineupError::from_reqwest(command, self.timeout_secs, e))?;
        decode_body(&bytes)
    }
}

/// Decode a command response; an empty body decodes as JSON `null` so unit
/// returning commands work with backends that send nothing.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LineupError> {
    let text = std::str::from_utf8(bytes).map_err(|e| LineupError::Parse(e.to_string()))?;
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| LineupError::Parse(e.to_string()))
}

impl ChannelService for CommandClient {
    fn list_channels_with_mappings(&self) -> BoxFuture<'_, Result<Vec<Channel>, LineupError>> {
        Box::pin(async move {
            let mut channels: Vec<Channel> = self.invoke(Command::ListChannels, json!({})).await?;
            channels.sort_by_key(|c| c.position);
            Ok(channels)
        })
    }

    fn set_channel_order(&self, ordered_ids: Vec<ChannelId>) -> BoxFuture<'_, Result<(), LineupError>> {
        Box::pin(async move {
            self.invoke::<serde_json::Value>(Command::SetChannelOrder, json!({ "orderedIds": ordered_ids }))
                .await
                .map(|_| ())
        })
    }

    fn toggle_channel_enabled(&self, id: ChannelId) -> BoxFuture<'_, Result<Channel, LineupError>> {
        Box::pin(async move { self.invoke(Command::ToggleChannelEnabled, json!({ "id": id })).await })
    }

    fn set_primary_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move {
            self.invoke(
                Command::SetPrimaryMatch,
                json!({ "channelId": channel_id, "streamId": stream_id }),
            )
            .await
        })
    }

    fn add_manual_match(
        &self,
        channel_id: ChannelId,
        stream_id: StreamId,
        as_primary: bool,
    ) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move {
            self.invoke(
                Command::AddManualMatch,
                json!({ "channelId": channel_id, "streamId": stream_id, "asPrimary": as_primary }),
            )
            .await
        })
    }

    fn remove_match(&self, mapping_id: MappingId) -> BoxFuture<'_, Result<Vec<Match>, LineupError>> {
        Box::pin(async move { self.invoke(Command::RemoveMatch, json!({ "mappingId": mapping_id })).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_deserializes_backend_shape() {
        let json = r#"{
            "id": "12",
            "name": "BBC One",
            "position": 3,
            "matches": [
                {"mappingId": 7, "streamId": "9001", "name": "UK: BBC One FHD",
                 "qualityTags": ["FHD"], "confidence": "0.93", "isPrimary": true}
            ]
        }"#;
        let channel: Channel = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id, ChannelId(12));
        assert!(channel.enabled);
        assert_eq!(channel.match_count(), 1);
        let primary = channel.primary_match().unwrap();
        assert_eq!(primary.stream_id, StreamId(9001));
        assert!(!primary.is_orphaned);
        assert!((primary.confidence - 0.93).abs() < 1e-6);
    }

    #[test]
    fn missing_matches_default_to_empty() {
        let channel: Channel = serde_json::from_str(r#"{"id": 1, "name": "CNN"}"#).unwrap();
        assert!(channel.matches.is_empty());
        assert_eq!(channel.position, 0);
    }

    #[test]
    fn empty_body_decodes_as_unit() {
        let value: serde_json::Value = decode_body(b"").unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = CommandClient::new("http://localhost:7700/".into(), 5);
        assert_eq!(
            client.endpoint(Command::SetChannelOrder),
            "http://localhost:7700/invoke/set_channel_order"
        );
    }
}
