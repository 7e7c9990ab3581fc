use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to the spectator stream and build the greeting sent ahead of live events.
pub async fn subscribe(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    // Subscribe before reading the snapshot so nothing published in between is missed.
    let receiver = state.spectators().subscribe();
    let snapshot = state.snapshot().await;
    let handshake = Handshake {
        stream: "spectator".into(),
        mode: snapshot.mode,
        player_count: snapshot.clients.len(),
    };
    let greeting = match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize spectator handshake");
            None
        }
    };
    (receiver, greeting)
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the
/// client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    greeting: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(greeting) = greeting {
            if tx.send(Ok(to_event(greeting))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Keep the stream alive; the next snapshot resynchronises the viewer.
                            warn!(skipped, "spectator stream lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("spectator SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}
