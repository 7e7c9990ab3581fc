//! Runs player and admin commands against the game session and decides what
//! each accepted command broadcasts.
//!
//! The session lock is held across the mutation and the queuing of its
//! notifications, so every socket observes commands in the order they were applied.

use tracing::info;

use crate::{
    dto::{
        snapshot::{PlayerRoundView, SnapshotView, reels_to_vec},
        ws::{
            ConfettiPayload, ForceRebindPayload, JoinData, JoinPayload, ModeData, RebindAllData,
            ResetAllData, RoundData, ServerMessage, SnapshotData, SpinResultPayload, StartAllData,
            StopReelData, StopReelPayload,
        },
    },
    error::ServiceError,
    services::broadcast,
    state::{
        SharedState,
        binder::ConnectionId,
        game::{BulkChange, GameSession, PlayerUpdate},
        round::{GameMode, now_millis},
    },
};

/// Message pushed to every client after an admin rebind.
pub const FORCE_REBIND_MESSAGE: &str = "後台已重設，請重新輸入姓名";
/// Error code sent to a socket whose player was resumed elsewhere.
pub const SESSION_TAKEN_OVER: &str = "SESSION_TAKEN_OVER";

/// Human-readable verdict shown to the player whose round just completed.
pub fn result_text(mode: GameMode, is_win: bool) -> &'static str {
    match (mode, is_win) {
        (GameMode::Official, true) => "恭喜中獎",
        (GameMode::Official, false) => "太可惜了><",
        (GameMode::Practice, true) => "練習中獎，可繼續挑戰",
        (GameMode::Practice, false) => "練習完成，再試一次",
    }
}

/// Bind `connection` to a new or resumed player.
pub async fn join(
    state: &SharedState,
    connection: ConnectionId,
    payload: JoinPayload,
) -> Result<JoinData, ServiceError> {
    let (name, resume_token) = payload.into_parts();
    let mut game = state.game().lock().await;
    let joined = game.join(connection, &name, resume_token.as_deref());

    if let Some(evicted) = joined.evicted {
        info!(%connection, %evicted, "player resumed on a new connection");
        broadcast::notify_error(
            state,
            evicted,
            SESSION_TAKEN_OVER,
            "this player was resumed on another connection".into(),
        );
    }
    info!(
        %connection,
        name = %joined.round.name,
        resumed = joined.resumed,
        "player joined"
    );

    broadcast::broadcast_player(state, connection, &joined.round);
    broadcast::broadcast_snapshot(state, &game.snapshot());

    Ok(JoinData {
        mode: game.mode(),
        state: PlayerRoundView::from(&joined.round),
        resume_token: joined.resume_token.to_string(),
    })
}

/// Forget the binding of a closed socket. The player's round is kept for resumption.
pub async fn release(state: &SharedState, connection: ConnectionId) {
    let mut game = state.game().lock().await;
    if game.release(connection) {
        info!(%connection, "player disconnected");
        broadcast::broadcast_snapshot(state, &game.snapshot());
    }
}

/// Player-initiated spin.
pub async fn start_spin(
    state: &SharedState,
    connection: ConnectionId,
) -> Result<RoundData, ServiceError> {
    let mut game = state.game().lock().await;
    let round = game.start_spin(connection)?;
    broadcast::broadcast_player(state, connection, &round);
    Ok(RoundData {
        state: PlayerRoundView::from(&round),
    })
}

/// Stop the next reel; settles the round when the last reel stops.
pub async fn stop_reel(
    state: &SharedState,
    connection: ConnectionId,
    payload: StopReelPayload,
) -> Result<StopReelData, ServiceError> {
    let mut game = state.game().lock().await;
    let stopped = game.stop_reel(connection, payload.reel_index, payload.stop_position)?;
    broadcast::broadcast_player(state, connection, &stopped.round);

    let result = stopped.settlement.as_ref().map(|settlement| SpinResultPayload {
        id: connection,
        final_reels: reels_to_vec(&settlement.final_reels),
        is_win: settlement.is_win,
        result_text: result_text(stopped.mode, settlement.is_win).to_string(),
        mode: stopped.mode,
        locked: settlement.locked,
    });

    if let Some(result) = &result {
        info!(
            %connection,
            is_win = result.is_win,
            locked = result.locked,
            "round settled"
        );
        broadcast::unicast(state, connection, &ServerMessage::SpinResult(result.clone()));
        if result.is_win {
            broadcast::broadcast(
                state,
                ServerMessage::Confetti(ConfettiPayload {
                    id: connection,
                    name: stopped.round.name.clone(),
                    final_reels: result.final_reels.clone(),
                    triggered_at: stopped.round.finished_at.unwrap_or_else(now_millis),
                }),
            );
        }
    }

    Ok(StopReelData {
        id: connection,
        reel_index: stopped.reel.get(),
        stop_position: stopped.stop.get(),
        symbol: stopped.symbol.to_string(),
        completed: result.is_some(),
        state: PlayerRoundView::from(&stopped.round),
        result,
    })
}

/// Player-initiated reset.
pub async fn self_reset(
    state: &SharedState,
    connection: ConnectionId,
) -> Result<RoundData, ServiceError> {
    let mut game = state.game().lock().await;
    let round = game.self_reset(connection)?;
    broadcast::broadcast_player(state, connection, &round);
    Ok(RoundData {
        state: PlayerRoundView::from(&round),
    })
}

/// Current mode and connected players.
pub async fn snapshot(state: &SharedState) -> SnapshotData {
    let game = state.game().lock().await;
    snapshot_of(&game)
}

/// Snapshot payload of an already locked session.
pub fn snapshot_of(game: &GameSession) -> SnapshotData {
    SnapshotData {
        snapshot: SnapshotView::from(&game.snapshot()),
    }
}

/// Admin: switch the global mode.
pub async fn set_mode(state: &SharedState, mode: GameMode) -> ModeData {
    let mut game = state.game().lock().await;
    let change = game.set_mode(mode);
    info!(mode = ?change.mode, unlocked = change.unlocked.len(), "admin changed mode");

    broadcast::broadcast_mode(state, change.mode);
    publish_updates(state, &change.unlocked);
    broadcast::broadcast_snapshot(state, &game.snapshot());
    ModeData { mode: change.mode }
}

/// Admin: start every ready round.
pub async fn start_all(state: &SharedState) -> Result<StartAllData, ServiceError> {
    let mut game = state.game().lock().await;
    let BulkChange { count, updates } = game.start_all()?;
    info!(started = count, "admin started all rounds");
    publish_updates(state, &updates);
    Ok(StartAllData {
        started_count: count,
    })
}

/// Admin: reset the round of the player on `target`.
pub async fn reset_one(
    state: &SharedState,
    target: ConnectionId,
) -> Result<RoundData, ServiceError> {
    let mut game = state.game().lock().await;
    let round = game.reset_one(target)?;
    info!(%target, "admin reset one round");
    broadcast::broadcast_player(state, target, &round);
    Ok(RoundData {
        state: PlayerRoundView::from(&round),
    })
}

/// Admin: reset every known round.
pub async fn reset_all(state: &SharedState) -> Result<ResetAllData, ServiceError> {
    let mut game = state.game().lock().await;
    let BulkChange { count, updates } = game.reset_all()?;
    info!(reset = count, "admin reset all rounds");
    publish_updates(state, &updates);
    Ok(ResetAllData { reset_count: count })
}

/// Admin: drop every identity and make all clients join again.
pub async fn rebind_all(state: &SharedState) -> RebindAllData {
    let mut game = state.game().lock().await;
    let count = game.rebind_all();
    info!(rebound = count, "admin forced every client to rebind");

    broadcast::broadcast(
        state,
        ServerMessage::ForceRebind(ForceRebindPayload {
            message: FORCE_REBIND_MESSAGE.to_string(),
            triggered_at: now_millis(),
        }),
    );
    broadcast::broadcast_snapshot(state, &game.snapshot());
    RebindAllData {
        rebind_count: count,
    }
}

fn publish_updates(state: &SharedState, updates: &[PlayerUpdate]) {
    for update in updates {
        broadcast::broadcast_player(state, update.id, &update.round);
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        dto::ws::JoinDetails,
        state::{AppState, ViewerConnection},
    };

    fn connect(state: &SharedState) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections().insert(id, ViewerConnection { id, tx });
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Message::Text(text) = message {
                frames.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        frames
    }

    fn count(frames: &[Value], event: &str) -> usize {
        frames.iter().filter(|frame| frame["event"] == event).count()
    }

    async fn join_as(state: &SharedState, connection: ConnectionId, name: &str) -> JoinData {
        join(state, connection, JoinPayload::Name(name.into())).await.unwrap()
    }

    async fn spin_to_win(state: &SharedState, connection: ConnectionId) {
        start_spin(state, connection).await.unwrap();
        for reel_index in 1..=4 {
            let payload = StopReelPayload {
                reel_index,
                stop_position: 0,
            };
            stop_reel(state, connection, payload).await.unwrap();
        }
    }

    #[test]
    fn result_text_follows_mode_tone() {
        assert_eq!(result_text(GameMode::Official, true), "恭喜中獎");
        assert_eq!(result_text(GameMode::Official, false), "太可惜了><");
        assert_eq!(result_text(GameMode::Practice, true), "練習中獎，可繼續挑戰");
        assert_eq!(result_text(GameMode::Practice, false), "練習完成，再試一次");
    }

    #[tokio::test]
    async fn spin_result_is_private_and_confetti_repeats_for_everyone() {
        let state = AppState::new(AppConfig::default());
        let (winner, mut winner_rx) = connect(&state);
        let (watcher, mut watcher_rx) = connect(&state);
        join_as(&state, winner, "A").await;
        join_as(&state, watcher, "B").await;
        drain(&mut winner_rx);
        drain(&mut watcher_rx);
        let mut spectator = state.spectators().subscribe();

        spin_to_win(&state, winner).await;
        spin_to_win(&state, winner).await;

        let mine = drain(&mut winner_rx);
        let theirs = drain(&mut watcher_rx);
        assert_eq!(count(&mine, "server:spinResult"), 2);
        assert_eq!(count(&theirs, "server:spinResult"), 0);
        assert_eq!(count(&mine, "server:confetti"), 2);
        assert_eq!(count(&theirs, "server:confetti"), 2);

        let confetti = theirs
            .iter()
            .find(|frame| frame["event"] == "server:confetti")
            .unwrap();
        assert_eq!(confetti["payload"]["id"], winner.to_string());
        assert_eq!(confetti["payload"]["name"], "A");

        let mut mirrored = Vec::new();
        while let Ok(event) = spectator.try_recv() {
            mirrored.push(event.event);
        }
        let spectator_confetti = mirrored
            .iter()
            .filter(|event| event.as_deref() == Some("server:confetti"))
            .count();
        assert_eq!(spectator_confetti, 2);
        assert!(
            !mirrored
                .iter()
                .any(|event| event.as_deref() == Some("server:spinResult"))
        );
    }

    #[tokio::test]
    async fn rejected_command_sends_nothing() {
        let state = AppState::new(AppConfig::default());
        let (player, mut player_rx) = connect(&state);
        let (_, mut other_rx) = connect(&state);
        join_as(&state, player, "A").await;
        drain(&mut player_rx);
        drain(&mut other_rx);
        let mut spectator = state.spectators().subscribe();

        let payload = StopReelPayload {
            reel_index: 1,
            stop_position: 0,
        };
        let err = stop_reel(&state, player, payload).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(start_all(&state).await.unwrap_err().code(), "MODE_MISMATCH");

        assert!(drain(&mut player_rx).is_empty());
        assert!(drain(&mut other_rx).is_empty());
        assert!(spectator.try_recv().is_err());
    }

    #[tokio::test]
    async fn rebind_all_pushes_force_rebind_then_empty_snapshot() {
        let state = AppState::new(AppConfig::default());
        let (first, mut first_rx) = connect(&state);
        let (second, mut second_rx) = connect(&state);
        join_as(&state, first, "A").await;
        join_as(&state, second, "B").await;
        drain(&mut first_rx);
        drain(&mut second_rx);

        let data = rebind_all(&state).await;
        assert_eq!(data.rebind_count, 2);

        for rx in [&mut first_rx, &mut second_rx] {
            let frames = drain(rx);
            let events: Vec<_> = frames.iter().map(|frame| frame["event"].clone()).collect();
            assert_eq!(events, ["server:forceRebind", "server:state"]);
            assert_eq!(frames[0]["payload"]["message"], FORCE_REBIND_MESSAGE);
            assert_eq!(frames[1]["payload"]["snapshot"]["clients"], serde_json::json!({}));
        }
    }

    #[tokio::test]
    async fn resume_notifies_only_the_evicted_socket() {
        let state = AppState::new(AppConfig::default());
        let (old, mut old_rx) = connect(&state);
        let (fresh, mut fresh_rx) = connect(&state);
        let token = join_as(&state, old, "A").await.resume_token;
        drain(&mut old_rx);
        drain(&mut fresh_rx);

        let payload = JoinPayload::Details(JoinDetails {
            name: "A".into(),
            resume_token: Some(token.clone()),
        });
        let data = join(&state, fresh, payload).await.unwrap();
        assert_eq!(data.resume_token, token);

        let evicted = drain(&mut old_rx);
        let error = evicted
            .iter()
            .find(|frame| frame["event"] == "server:error")
            .unwrap();
        assert_eq!(error["payload"]["code"], SESSION_TAKEN_OVER);
        assert_eq!(count(&drain(&mut fresh_rx), "server:error"), 0);
    }
}
