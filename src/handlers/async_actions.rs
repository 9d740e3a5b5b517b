use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{self, ChannelService, RemoteRequest, RemoteResponse};
use crate::app::{App, AsyncAction};
use crate::errors::LineupError;
use crate::lineup::coordinator::{Applied, Outgoing};

/// Spawn every queued remote call of the mounted list
pub fn flush_outbox(app: &mut App, tx: &mpsc::Sender<AsyncAction>) {
    let epoch = app.list.epoch();
    let timeout = app.config.request_timeout();
    for Outgoing { id, request } in app.list.take_outbox() {
        let service = Arc::clone(&app.service);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = run_request(service.as_ref(), request, timeout).await;
            let _ = tx.send(AsyncAction::Remote { epoch, id, result }).await;
        });
    }
}

/// Execute one request, bounded by `timeout`
pub async fn run_request(
    service: &dyn ChannelService,
    request: RemoteRequest,
    timeout: Duration,
) -> Result<RemoteResponse, LineupError> {
    let command = request.command();
    match tokio::time::timeout(timeout, api::execute(service, request)).await {
        Ok(result) => {
            if let Err(e) = &result {
                tracing::warn!(%command, error = %e, "remote call failed");
            }
            result
        }
        Err(_) => {
            tracing::warn!(%command, secs = timeout.as_secs(), "remote call timed out");
            Err(LineupError::Timeout(command, timeout.as_secs()))
        }
    }
}

pub fn handle_async_action(app: &mut App, action: AsyncAction) {
    match action {
        AsyncAction::Remote { epoch, id, result } => {
            let applied = app.list.handle_response(epoch, id, result);
            if applied == Applied::RolledBack {
                tracing::info!(request = %id, "optimistic update rolled back");
            }
            app.collect_notices();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::MemoryChannelService;
    use crate::errors::Command;

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let service = MemoryChannelService::demo(2);
        service.set_latency(Duration::from_secs(30));
        let result = run_request(&service, RemoteRequest::ListChannels, Duration::from_secs(10)).await;
        assert_eq!(result, Err(LineupError::Timeout(Command::ListChannels, 10)));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let service = MemoryChannelService::demo(2);
        let result = run_request(&service, RemoteRequest::ListChannels, Duration::from_secs(10)).await;
        match result {
            Ok(RemoteResponse::Channels(channels)) => assert_eq!(channels.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
