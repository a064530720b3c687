use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dao::models::EventId,
    dto::{sse::ServerEvent, ws::ClientMessage},
    error::ServiceError,
    services::broadcast,
    state::SharedState,
};

/// Time a client has to send its first `join`.
const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

type Outbound = mpsc::UnboundedSender<Message>;

/// Handle the full lifecycle of one display or player WebSocket.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let first_join = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => parse(text.as_str()).and_then(|m| m.join_event()),
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => None,
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let Some(mut event_id) = first_join else {
        warn!("first websocket message was not a join");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let mut forwarder = match join(&state, event_id, &outbound_tx).await {
        Ok(forwarder) => forwarder,
        Err(err) => {
            warn!(event_id, error = %err, "websocket join refused");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };
    info!(event_id, "websocket client joined");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match parse(text.as_str()) {
                Some(ClientMessage::Join { event_id: next }) => {
                    if !state.event_exists(next) {
                        warn!(event_id = next, "ignoring join of unknown event");
                        continue;
                    }
                    forwarder.abort();
                    match join(&state, next, &outbound_tx).await {
                        Ok(handle) => {
                            forwarder = handle;
                            debug!(from = event_id, to = next, "websocket client switched event");
                            event_id = next;
                        }
                        Err(err) => {
                            warn!(event_id = next, error = %err, "websocket rejoin failed");
                            break;
                        }
                    }
                }
                Some(ClientMessage::Unknown) | None => {
                    debug!(event_id, payload = %text.as_str(), "ignoring websocket message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(event_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder.abort();
    info!(event_id, "websocket client disconnected");
    finalize(writer_task, outbound_tx).await;
}

fn parse(text: &str) -> Option<ClientMessage> {
    serde_json::from_str(text)
        .inspect_err(|err| debug!(error = %err, "unparseable websocket message"))
        .ok()
}

fn send_frame(outbound: &Outbound, event: &ServerEvent) -> bool {
    match event.to_frame() {
        Ok(frame) => outbound.send(Message::Text(frame.into())).is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to encode websocket frame");
            true
        }
    }
}

/// Send the resync frames for `event_id` and start forwarding its channel.
async fn join(
    state: &SharedState,
    event_id: EventId,
    outbound: &Outbound,
) -> Result<JoinHandle<()>, ServiceError> {
    let (mut receiver, frames) = broadcast::subscribe(state, event_id).await?;
    for frame in &frames {
        send_frame(outbound, frame);
    }

    let outbound = outbound.clone();
    Ok(tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if !send_frame(&outbound, &event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(event_id, skipped, "websocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }))
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: Outbound) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
