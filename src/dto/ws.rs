//! Wire protocol of the `/ws` endpoint: tagged commands in, acknowledgements and
//! notifications out. Every frame is `{"event", "payload", "ack"}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::{
    dto::snapshot::{PlayerRoundView, SnapshotView},
    error::ServiceError,
    state::{binder::ConnectionId, round::GameMode},
};

const JOIN_EVENT: &str = "client:join";

#[derive(Debug, Deserialize)]
/// Envelope shared by every inbound frame.
struct RawFrame {
    event: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
/// Commands accepted from player and admin sockets.
#[serde(tag = "event", content = "payload")]
pub enum ClientCommand {
    #[serde(rename = "client:join")]
    Join(JoinPayload),
    #[serde(rename = "client:startSpin", alias = "client:pull")]
    StartSpin,
    #[serde(rename = "client:stopReel")]
    StopReel(StopReelPayload),
    #[serde(rename = "client:reset")]
    SelfReset,
    #[serde(rename = "state:get")]
    GetSnapshot,
    #[serde(rename = "admin:setMode")]
    SetMode(SetModePayload),
    #[serde(rename = "admin:startAll")]
    StartAll,
    #[serde(rename = "admin:resetOne")]
    ResetOne(ResetOnePayload),
    #[serde(rename = "admin:resetAll")]
    ResetAll,
    #[serde(rename = "admin:rebindAll")]
    RebindAll,
}

impl ClientCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::Join(_) => "client:join",
            ClientCommand::StartSpin => "client:startSpin",
            ClientCommand::StopReel(_) => "client:stopReel",
            ClientCommand::SelfReset => "client:reset",
            ClientCommand::GetSnapshot => "state:get",
            ClientCommand::SetMode(_) => "admin:setMode",
            ClientCommand::StartAll => "admin:startAll",
            ClientCommand::ResetOne(_) => "admin:resetOne",
            ClientCommand::ResetAll => "admin:resetAll",
            ClientCommand::RebindAll => "admin:rebindAll",
        }
    }

    /// Whether the command needs a valid admin session.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            ClientCommand::SetMode(_)
                | ClientCommand::StartAll
                | ClientCommand::ResetOne(_)
                | ClientCommand::ResetAll
                | ClientCommand::RebindAll
        )
    }
}

/// A decoded and validated inbound frame.
#[derive(Debug)]
pub struct InboundFrame {
    /// Acknowledgement id to answer, if the client asked for one.
    pub ack: Option<u64>,
    /// The command to run.
    pub command: ClientCommand,
}

/// A frame that could not be turned into a command.
#[derive(Debug)]
pub struct RejectedFrame {
    /// Acknowledgement id, when it could be recovered.
    pub ack: Option<u64>,
    /// Why the frame was rejected.
    pub error: ServiceError,
}

impl InboundFrame {
    /// Parse a text frame. Field types are checked here; value ranges are checked
    /// by the round state machine after the join and phase guards.
    pub fn from_json_str(text: &str) -> Result<Self, RejectedFrame> {
        let value: Value = serde_json::from_str(text).map_err(|err| RejectedFrame {
            ack: None,
            error: ServiceError::InvalidInput(format!("malformed frame: {err}")),
        })?;
        let ack = value.get("ack").and_then(Value::as_u64);
        let reject = |error: ServiceError| RejectedFrame { ack, error };
        let raw: RawFrame = serde_json::from_value(value)
            .map_err(|err| reject(ServiceError::InvalidInput(format!("malformed frame: {err}"))))?;

        let mut tagged = Map::new();
        tagged.insert("event".into(), Value::String(raw.event.clone()));
        match raw.payload {
            None | Some(Value::Null) => {}
            // `{}` counts as no payload, except for a join.
            Some(Value::Object(map)) if map.is_empty() && raw.event != JOIN_EVENT => {}
            Some(payload) => {
                tagged.insert("payload".into(), payload);
            }
        }

        let command: ClientCommand = serde_json::from_value(Value::Object(tagged))
            .map_err(|err| {
                reject(ServiceError::InvalidInput(format!(
                    "invalid `{}` frame: {err}",
                    raw.event
                )))
            })?;

        Ok(Self { ack, command })
    }
}

#[derive(Debug, Deserialize)]
/// Join payload: either a bare name or a name with a resume token.
#[serde(untagged)]
pub enum JoinPayload {
    Name(String),
    Details(JoinDetails),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "reconnectToken")]
    pub resume_token: Option<String>,
}

impl JoinPayload {
    /// Split into the requested name and optional resume token.
    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            JoinPayload::Name(name) => (name, None),
            JoinPayload::Details(details) => (details.name, details.resume_token),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReelPayload {
    #[serde(alias = "reelId")]
    pub reel_index: i64,
    #[serde(alias = "stopIndex")]
    pub stop_position: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetModePayload {
    pub mode: GameMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOnePayload {
    #[serde(alias = "socketId")]
    pub target_id: ConnectionId,
}

/// Everything the server sends over a socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "ack")]
    Ack(AckPayload),
    #[serde(rename = "server:mode")]
    Mode(ModeData),
    #[serde(rename = "server:state")]
    State(SnapshotData),
    #[serde(rename = "server:clientState")]
    ClientState(ClientStatePayload),
    #[serde(rename = "server:spinResult")]
    SpinResult(SpinResultPayload),
    #[serde(rename = "server:confetti")]
    Confetti(ConfettiPayload),
    #[serde(rename = "server:forceRebind")]
    ForceRebind(ForceRebindPayload),
    #[serde(rename = "server:error")]
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Wire name of the notification.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Ack(_) => "ack",
            ServerMessage::Mode(_) => "server:mode",
            ServerMessage::State(_) => "server:state",
            ServerMessage::ClientState(_) => "server:clientState",
            ServerMessage::SpinResult(_) => "server:spinResult",
            ServerMessage::Confetti(_) => "server:confetti",
            ServerMessage::ForceRebind(_) => "server:forceRebind",
            ServerMessage::Error(_) => "server:error",
        }
    }

    /// Payload serialized alone, as carried by the spectator stream.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            ServerMessage::Ack(payload) => serde_json::to_string(payload),
            ServerMessage::Mode(payload) => serde_json::to_string(payload),
            ServerMessage::State(payload) => serde_json::to_string(payload),
            ServerMessage::ClientState(payload) => serde_json::to_string(payload),
            ServerMessage::SpinResult(payload) => serde_json::to_string(payload),
            ServerMessage::Confetti(payload) => serde_json::to_string(payload),
            ServerMessage::ForceRebind(payload) => serde_json::to_string(payload),
            ServerMessage::Error(payload) => serde_json::to_string(payload),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// Reply to a request that carried an `ack` id.
pub struct AckPayload {
    pub ack: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckPayload {
    /// Successful acknowledgement carrying `data`.
    pub fn ok(ack: u64, data: Value) -> Self {
        Self {
            ack,
            ok: true,
            data: Some(data),
            code: None,
            error: None,
        }
    }

    /// Failed acknowledgement describing `err`.
    pub fn err(ack: u64, err: &ServiceError) -> Self {
        Self {
            ack,
            ok: false,
            data: None,
            code: Some(err.code().to_string()),
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub mode: GameMode,
    pub state: PlayerRoundView,
    pub resume_token: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundData {
    pub state: PlayerRoundView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopReelData {
    #[schema(value_type = String)]
    pub id: ConnectionId,
    pub reel_index: u8,
    pub stop_position: u8,
    pub symbol: String,
    pub completed: bool,
    pub state: PlayerRoundView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SpinResultPayload>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotData {
    pub snapshot: SnapshotView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModeData {
    pub mode: GameMode,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAllData {
    pub started_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetAllData {
    pub reset_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebindAllData {
    pub rebind_count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Broadcast whenever one player's round changes.
pub struct ClientStatePayload {
    #[schema(value_type = String)]
    pub id: ConnectionId,
    pub state: PlayerRoundView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Sent only to the player whose round just completed.
pub struct SpinResultPayload {
    #[schema(value_type = String)]
    pub id: ConnectionId,
    pub final_reels: Vec<String>,
    pub is_win: bool,
    pub result_text: String,
    pub mode: GameMode,
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast for every winning round.
pub struct ConfettiPayload {
    #[schema(value_type = String)]
    pub id: ConnectionId,
    pub name: String,
    pub final_reels: Vec<String>,
    pub triggered_at: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Tells every client to drop its identity and join again.
pub struct ForceRebindPayload {
    pub message: String,
    pub triggered_at: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&ServiceError> for ErrorPayload {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
