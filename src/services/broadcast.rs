//! Fan-out of socket notifications. Broadcasts reach every open socket and are
//! mirrored onto the spectator SSE stream; unicasts reach one socket only.

use axum::extract::ws::Message;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dto::{
        snapshot::{PlayerRoundView, SnapshotView},
        sse::ServerEvent,
        ws::{ClientStatePayload, ErrorPayload, ModeData, ServerMessage, SnapshotData},
    },
    state::{
        SharedState,
        binder::ConnectionId,
        registry::Snapshot,
        round::{GameMode, PlayerRound},
    },
};

/// The writer task of a socket is gone.
#[derive(Debug, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Serialize `message` and queue it on one socket's writer channel.
///
/// A serialization failure is logged and swallowed; only a closed writer is reported.
pub fn send_message(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
) -> Result<(), ConnectionClosed> {
    let Some(text) = encode(message) else {
        return Ok(());
    };
    tx.send(Message::Text(text.into()))
        .map_err(|_| ConnectionClosed)
}

/// Send `message` to every open socket and to spectators.
pub fn broadcast(state: &SharedState, message: ServerMessage) {
    let Some(text) = encode(&message) else {
        return;
    };

    let mut delivered = 0usize;
    for connection in state.connections().iter() {
        if connection.tx.send(Message::Text(text.clone().into())).is_ok() {
            delivered += 1;
        } else {
            debug!(connection = %connection.id, "skipping closed socket during broadcast");
        }
    }

    match ServerEvent::from_message(&message) {
        Ok(event) => state.spectators().broadcast(event),
        Err(err) => warn!(error = %err, "failed to mirror notification to spectators"),
    }

    debug!(event = message.event_name(), delivered, "broadcast notification");
}

/// Send `message` to a single socket. Returns whether the socket was open.
pub fn unicast(state: &SharedState, target: ConnectionId, message: &ServerMessage) -> bool {
    let Some(tx) = state.connections().get(&target).map(|conn| conn.tx.clone()) else {
        debug!(connection = %target, event = message.event_name(), "unicast target not connected");
        return false;
    };
    send_message(&tx, message).is_ok()
}

/// Announce the mode in force.
pub fn broadcast_mode(state: &SharedState, mode: GameMode) {
    broadcast(state, ServerMessage::Mode(ModeData { mode }));
}

/// Publish a full snapshot.
pub fn broadcast_snapshot(state: &SharedState, snapshot: &Snapshot) {
    broadcast(
        state,
        ServerMessage::State(SnapshotData {
            snapshot: SnapshotView::from(snapshot),
        }),
    );
}

/// Publish one player's new round state.
pub fn broadcast_player(state: &SharedState, id: ConnectionId, round: &PlayerRound) {
    broadcast(
        state,
        ServerMessage::ClientState(ClientStatePayload {
            id,
            state: PlayerRoundView::from(round),
        }),
    );
}

/// Tell one socket about a problem that has no acknowledgement to travel on.
pub fn notify_error(state: &SharedState, target: ConnectionId, code: &str, message: String) {
    unicast(
        state,
        target,
        &ServerMessage::Error(ErrorPayload {
            code: code.to_string(),
            message,
        }),
    );
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(error = %err, event = message.event_name(), "failed to serialize notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ViewerConnection},
    };

    fn connect(state: &SharedState) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections().insert(id, ViewerConnection { id, tx });
        (id, rx)
    }

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_sockets_and_spectators() {
        let state = AppState::new(AppConfig::default());
        let (_, mut first) = connect(&state);
        let (_, mut second) = connect(&state);
        let mut spectator = state.spectators().subscribe();

        broadcast_mode(&state, GameMode::Official);

        for rx in [&mut first, &mut second] {
            let frame = text(rx.recv().await.unwrap());
            assert_eq!(frame["event"], "server:mode");
            assert_eq!(frame["payload"]["mode"], "official");
        }
        let event = spectator.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("server:mode"));
    }

    #[tokio::test]
    async fn unicast_skips_other_sockets() {
        let state = AppState::new(AppConfig::default());
        let (target, mut target_rx) = connect(&state);
        let (_, mut other_rx) = connect(&state);
        let mut spectator = state.spectators().subscribe();

        notify_error(&state, target, "SESSION_TAKEN_OVER", "moved".into());

        let frame = text(target_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "server:error");
        assert_eq!(frame["payload"]["code"], "SESSION_TAKEN_OVER");
        assert!(other_rx.try_recv().is_err());
        assert!(spectator.try_recv().is_err());
        assert!(!unicast(
            &state,
            ConnectionId::new(),
            &ServerMessage::Mode(ModeData {
                mode: GameMode::Practice
            })
        ));
    }
}
