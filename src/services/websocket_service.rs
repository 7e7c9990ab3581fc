use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{AckPayload, ClientCommand, ErrorPayload, InboundFrame, ModeData, ServerMessage},
    error::ServiceError,
    services::{
        broadcast::{self, send_message},
        round_service,
    },
    state::{SharedState, ViewerConnection, binder::ConnectionId},
};

/// Handle the full lifecycle of one player, admin or viewer socket.
pub async fn handle_socket(state: SharedState, socket: WebSocket, admin_session: Option<String>) {
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

    let connection = ConnectionId::new();
    let viewer = ViewerConnection {
        id: connection,
        tx: outbound_tx.clone(),
    };
    info!(%connection, admin = admin_session.is_some(), "socket connected");

    if register(&state, viewer).await.is_err() {
        info!(%connection, "socket closed before the initial state was sent");
        disconnect(&state, connection).await;
        finalize(writer_task, outbound_tx).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection, payload = %text.as_str(), "received frame");
                let reply =
                    handle_frame(&state, connection, admin_session.as_deref(), text.as_str())
                        .await;
                if let Some(reply) = reply {
                    if send_message(&outbound_tx, &reply).is_err() {
                        info!(%connection, "writer closed while replying, terminating");
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection, "socket closed by peer");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                warn!(%connection, "ignoring binary frame");
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection, error = %err, "websocket error");
                break;
            }
        }
    }

    disconnect(&state, connection).await;
    finalize(writer_task, outbound_tx).await;
}

/// Decode one text frame, run it and build the reply for the sender, if any.
///
/// Frames carrying an `ack` id are answered with an acknowledgement. Rejections of frames
/// without one are reported through an error notice; successes without one stay silent.
pub async fn handle_frame(
    state: &SharedState,
    connection: ConnectionId,
    admin_session: Option<&str>,
    text: &str,
) -> Option<ServerMessage> {
    let frame = match InboundFrame::from_json_str(text) {
        Ok(frame) => frame,
        Err(rejected) => {
            warn!(%connection, error = %rejected.error, "rejected malformed frame");
            return Some(reply_error(rejected.ack, &rejected.error));
        }
    };

    let command = frame.command.name();
    match dispatch(state, connection, admin_session, frame.command).await {
        Ok(data) => frame
            .ack
            .map(|ack| ServerMessage::Ack(AckPayload::ok(ack, data))),
        Err(err) => {
            debug!(%connection, command, code = err.code(), error = %err, "command rejected");
            Some(reply_error(frame.ack, &err))
        }
    }
}

async fn dispatch(
    state: &SharedState,
    connection: ConnectionId,
    admin_session: Option<&str>,
    command: ClientCommand,
) -> Result<Value, ServiceError> {
    if command.requires_admin() {
        state
            .admin_sessions()
            .authorize(admin_session, command.name())?;
    }

    match command {
        ClientCommand::Join(payload) => {
            round_service::join(state, connection, payload)
                .await
                .map(|data| ack_data(&data))
        }
        ClientCommand::StartSpin => round_service::start_spin(state, connection)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::StopReel(payload) => round_service::stop_reel(state, connection, payload)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::SelfReset => round_service::self_reset(state, connection)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::GetSnapshot => Ok(ack_data(&round_service::snapshot(state).await)),
        ClientCommand::SetMode(payload) => {
            Ok(ack_data(&round_service::set_mode(state, payload.mode).await))
        }
        ClientCommand::StartAll => round_service::start_all(state)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::ResetOne(payload) => round_service::reset_one(state, payload.target_id)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::ResetAll => round_service::reset_all(state)
            .await
            .map(|data| ack_data(&data)),
        ClientCommand::RebindAll => Ok(ack_data(&round_service::rebind_all(state).await)),
    }
}

fn reply_error(ack: Option<u64>, err: &ServiceError) -> ServerMessage {
    match ack {
        Some(ack) => ServerMessage::Ack(AckPayload::err(ack, err)),
        None => ServerMessage::Error(ErrorPayload::from(err)),
    }
}

fn ack_data<T: Serialize>(data: &T) -> Value {
    serde_json::to_value(data).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize acknowledgement data");
        Value::Null
    })
}

/// Add the socket to the fan-out table and give it the current mode and snapshot.
///
/// Runs under the session lock so no broadcast can slip in ahead of the initial state.
async fn register(
    state: &SharedState,
    viewer: ViewerConnection,
) -> Result<(), broadcast::ConnectionClosed> {
    let game = state.game().lock().await;
    let tx = viewer.tx.clone();
    state.connections().insert(viewer.id, viewer);
    send_message(&tx, &ServerMessage::Mode(ModeData { mode: game.mode() }))?;
    send_message(&tx, &ServerMessage::State(round_service::snapshot_of(&game)))
}

async fn disconnect(state: &SharedState, connection: ConnectionId) {
    state.connections().remove(&connection);
    round_service::release(state, connection).await;
    info!(%connection, "socket disconnected");
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
