//! Round controller: validates player and admin commands against the global mode and
//! each player's round, and drives the registry and binder.
//!
//! Every operation runs to completion without awaiting, so callers holding the session
//! lock observe commands as atomic.

use tracing::debug;

use crate::{
    error::ServiceError,
    state::{
        binder::{ConnectionBinder, ConnectionId, Joined, NamePolicy},
        reels::{ReelIndex, StopPosition, Symbol},
        registry::{SessionRegistry, Snapshot},
        round::{GameMode, PlayerRound, RoundPhase, now_millis},
        state_machine::{self, RoundContext, RoundEvent, Settlement, Transition},
    },
};

/// A player's new round state, addressed by their live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerUpdate {
    /// Connection the player is bound to.
    pub id: ConnectionId,
    /// Round after the change.
    pub round: PlayerRound,
}

/// Result of an accepted reel stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelStopped {
    /// Reel that stopped.
    pub reel: ReelIndex,
    /// Position it stopped at.
    pub stop: StopPosition,
    /// Symbol now shown on that reel.
    pub symbol: Symbol,
    /// Round after the stop.
    pub round: PlayerRound,
    /// Mode the round was evaluated in.
    pub mode: GameMode,
    /// Present when the stop completed the round.
    pub settlement: Option<Settlement>,
}

/// Result of a global mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    /// Mode now in force.
    pub mode: GameMode,
    /// Connected players whose locked round was released.
    pub unlocked: Vec<PlayerUpdate>,
}

/// Result of an admin bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkChange {
    /// Number of rounds transitioned, connected or not.
    pub count: usize,
    /// Connected players whose round changed.
    pub updates: Vec<PlayerUpdate>,
}

/// Owned game context: global mode, player rounds and connection bindings.
#[derive(Debug, Default)]
pub struct GameSession {
    registry: SessionRegistry,
    binder: ConnectionBinder,
    names: NamePolicy,
}

impl GameSession {
    /// Fresh session in practice mode with no players.
    pub fn new(names: NamePolicy) -> Self {
        Self {
            registry: SessionRegistry::new(),
            binder: ConnectionBinder::new(),
            names,
        }
    }

    /// Current global mode.
    pub fn mode(&self) -> GameMode {
        self.registry.mode()
    }

    /// Snapshot of the mode and every connected player's round.
    pub fn snapshot(&self) -> Snapshot {
        self.registry.snapshot(&self.binder)
    }

    /// Number of players known to the session, connected or not.
    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    /// Bind `connection` to a new or resumed player.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        name: &str,
        resume_token: Option<&str>,
    ) -> Joined {
        self.binder.join(
            &mut self.registry,
            connection,
            name,
            resume_token,
            &self.names,
        )
    }

    /// Round of the player bound to `connection`.
    pub fn resolve(&self, connection: ConnectionId) -> Option<&PlayerRound> {
        self.binder.resolve(&self.registry, connection)
    }

    /// Unbind a disconnected connection. Returns whether it was bound.
    pub fn release(&mut self, connection: ConnectionId) -> bool {
        self.binder.release(connection).is_some()
    }

    /// Player-initiated spin; only allowed in practice mode.
    pub fn start_spin(&mut self, connection: ConnectionId) -> Result<PlayerRound, ServiceError> {
        self.ensure_joined(connection)?;
        if self.mode() == GameMode::Official {
            return Err(ServiceError::ModeMismatch(
                "spins are started by the admin in official mode".into(),
            ));
        }
        let (_, round) = self.apply_to(connection, RoundEvent::StartSpin)?;
        Ok(round)
    }

    /// Stop the next reel of the caller's spinning round.
    ///
    /// Rejections follow guard order: not joined, not spinning, reel out of range or
    /// order, then stop position out of range.
    pub fn stop_reel(
        &mut self,
        connection: ConnectionId,
        reel: i64,
        stop: i64,
    ) -> Result<ReelStopped, ServiceError> {
        let mode = self.mode();
        let (transition, round) = self.apply_to(connection, RoundEvent::StopReel { reel, stop })?;
        match transition {
            Transition::ReelStopped {
                reel,
                stop,
                symbol,
                settlement,
            } => Ok(ReelStopped {
                reel,
                stop,
                symbol,
                round,
                mode,
                settlement,
            }),
            other => Err(ServiceError::InvalidState(format!(
                "unexpected transition {other:?} for a reel stop"
            ))),
        }
    }

    /// Player-initiated reset; only allowed in practice mode and never mid-spin.
    pub fn self_reset(&mut self, connection: ConnectionId) -> Result<PlayerRound, ServiceError> {
        self.ensure_joined(connection)?;
        self.require_mode(GameMode::Practice, "self reset")?;
        let (_, round) = self.apply_to(connection, RoundEvent::Reset { force: false })?;
        Ok(round)
    }

    /// Switch the global mode. Switching to practice releases every locked round.
    pub fn set_mode(&mut self, mode: GameMode) -> ModeChange {
        self.registry.set_mode(mode);
        let unlocked = if mode == GameMode::Practice {
            self.apply_bulk(RoundEvent::Unlock, |round| {
                round.phase == RoundPhase::Locked
            })
            .updates
        } else {
            Vec::new()
        };
        debug!(?mode, unlocked = unlocked.len(), "global mode changed");
        ModeChange { mode, unlocked }
    }

    /// Start every `ready` round; other rounds are skipped.
    pub fn start_all(&mut self) -> Result<BulkChange, ServiceError> {
        self.require_mode(GameMode::Official, "start all")?;
        Ok(self.apply_bulk(RoundEvent::StartSpin, |round| {
            round.phase == RoundPhase::Ready
        }))
    }

    /// Reset the round of the player on connection `target`, even mid-spin.
    pub fn reset_one(&mut self, target: ConnectionId) -> Result<PlayerRound, ServiceError> {
        self.require_mode(GameMode::Official, "reset one")?;
        if self.resolve(target).is_none() {
            return Err(ServiceError::NotFound(format!("player `{target}` not found")));
        }
        let (_, round) = self.apply_to(target, RoundEvent::Reset { force: true })?;
        Ok(round)
    }

    /// Reset every known round.
    pub fn reset_all(&mut self) -> Result<BulkChange, ServiceError> {
        self.require_mode(GameMode::Official, "reset all")?;
        Ok(self.apply_bulk(RoundEvent::Reset { force: true }, |_| true))
    }

    /// Forget every player, token and binding. Returns how many connections were bound.
    pub fn rebind_all(&mut self) -> usize {
        self.binder.rebind_all(&mut self.registry)
    }

    fn context(&self) -> RoundContext {
        RoundContext {
            mode: self.mode(),
            now_ms: now_millis(),
        }
    }

    fn ensure_joined(&self, connection: ConnectionId) -> Result<(), ServiceError> {
        self.resolve(connection)
            .map(|_| ())
            .ok_or_else(ServiceError::not_joined)
    }

    fn require_mode(&self, required: GameMode, action: &str) -> Result<(), ServiceError> {
        if self.mode() == required {
            Ok(())
        } else {
            Err(ServiceError::ModeMismatch(format!(
                "{action} is only available in {required:?} mode"
            )))
        }
    }

    fn apply_to(
        &mut self,
        connection: ConnectionId,
        event: RoundEvent,
    ) -> Result<(Transition, PlayerRound), ServiceError> {
        let ctx = self.context();
        let token = self
            .binder
            .token_for(connection)
            .ok_or_else(ServiceError::not_joined)?;
        let round = self
            .registry
            .get_mut(token)
            .ok_or_else(ServiceError::not_joined)?;
        let transition = state_machine::apply(round, event, ctx)?;
        Ok((transition, round.clone()))
    }

    fn apply_bulk<F>(&mut self, event: RoundEvent, eligible: F) -> BulkChange
    where
        F: Fn(&PlayerRound) -> bool,
    {
        let ctx = self.context();
        let mut count = 0;
        let mut updates = Vec::new();
        for (token, round) in self.registry.rounds_mut() {
            if !eligible(round) {
                continue;
            }
            if state_machine::apply(round, event, ctx).is_err() {
                continue;
            }
            count += 1;
            if let Some(id) = self.binder.connection_for(token) {
                updates.push(PlayerUpdate {
                    id,
                    round: round.clone(),
                });
            }
        }
        BulkChange { count, updates }
    }
}
