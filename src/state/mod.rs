pub mod admin;
pub mod binder;
pub mod game;
mod hub;
pub mod ranking;
pub mod reels;
pub mod registry;
pub mod round;
pub mod state_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use crate::config::AppConfig;

pub use self::hub::BroadcastHub;
use self::{
    admin::AdminSessions,
    binder::ConnectionId,
    game::GameSession,
    registry::Snapshot,
};

pub type SharedState = Arc<AppState>;

/// Capacity of the spectator broadcast channel.
const SPECTATOR_CAPACITY: usize = 64;

#[derive(Clone)]
/// Handle used to push messages to a connected viewer.
pub struct ViewerConnection {
    pub id: ConnectionId,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: the game session, live sockets and admin sessions.
///
/// All game mutations go through the [`GameSession`] mutex and complete without awaiting,
/// so one command is fully applied (and its notifications queued) before the next starts.
pub struct AppState {
    game: Mutex<GameSession>,
    connections: DashMap<ConnectionId, ViewerConnection>,
    admin_sessions: AdminSessions,
    spectators: BroadcastHub,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            game: Mutex::new(GameSession::new(config.name_policy())),
            connections: DashMap::new(),
            admin_sessions: AdminSessions::new(
                config.admin_token().map(str::to_string),
                config.admin_session_ttl(),
            ),
            spectators: BroadcastHub::new(SPECTATOR_CAPACITY),
            config,
        })
    }

    /// The authoritative game session.
    pub fn game(&self) -> &Mutex<GameSession> {
        &self.game
    }

    /// Registry of open viewer sockets keyed by connection id.
    pub fn connections(&self) -> &DashMap<ConnectionId, ViewerConnection> {
        &self.connections
    }

    /// Admin session store.
    pub fn admin_sessions(&self) -> &AdminSessions {
        &self.admin_sessions
    }

    /// Broadcast hub used for the spectator SSE stream.
    pub fn spectators(&self) -> &BroadcastHub {
        &self.spectators
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Snapshot the current mode and connected players.
    pub async fn snapshot(&self) -> Snapshot {
        self.game.lock().await.snapshot()
    }
}
