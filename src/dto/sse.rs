use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::ws::ServerMessage, state::round::GameMode};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the spectator SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Mirror a socket notification: the SSE event name is the socket event name.
    pub fn from_message(message: &ServerMessage) -> serde_json::Result<Self> {
        Ok(Self {
            event: Some(message.event_name().to_string()),
            data: message.payload_json()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Initial metadata sent to a spectator when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Mode in force when the stream opened.
    pub mode: GameMode,
    /// Players currently bound to a live connection.
    pub player_count: usize,
}
