use thiserror::Error;

use crate::state::{
    reels::{
        EMPTY_REELS, OutOfRange, ReelIndex, Reels, StopPosition, Symbol, evaluate_outcome,
        symbol_at,
    },
    round::{GameMode, PlayerRound, RoundPhase},
};

/// Events that can be applied to a player's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Begin a spin from `ready`.
    StartSpin,
    /// Stop one reel at the given position. Both values arrive unchecked from the client.
    StopReel {
        /// One-based reel being stopped.
        reel: i64,
        /// Position the reel lands on.
        stop: i64,
    },
    /// Reinitialize the round. `force` lets an admin reset a spinning round.
    Reset {
        /// Whether a spinning round may be reset.
        force: bool,
    },
    /// Release a locked round back to `ready`, keeping its outcome.
    Unlock,
}

/// Context a transition is evaluated in.
#[derive(Debug, Clone, Copy)]
pub struct RoundContext {
    /// Global mode at the moment of the transition.
    pub mode: GameMode,
    /// Current time in unix milliseconds.
    pub now_ms: u64,
}

/// Reasons a round event is rejected. A rejected event leaves the round untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// Spin requested while a spin is already running.
    #[error("already spinning")]
    AlreadySpinning,
    /// Spin requested on a locked round.
    #[error("round is locked and must be reset first")]
    Locked,
    /// Reel stop requested outside of a spin.
    #[error("round is not spinning")]
    NotSpinning,
    /// Reel stopped out of left-to-right order.
    #[error("stop reel {expected} first")]
    OutOfOrder {
        /// Reel that must be stopped next.
        expected: ReelIndex,
        /// Reel the caller tried to stop.
        got: ReelIndex,
    },
    /// Non-forced reset of a spinning round.
    #[error("cannot reset while spinning")]
    ResetWhileSpinning,
    /// Reel index or stop position outside the machine.
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
}

/// Final assembled result of a completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Frozen reels.
    pub final_reels: Reels,
    /// Whether the reels are the winning line.
    pub is_win: bool,
    /// Whether the round locked because the mode was official.
    pub locked: bool,
}

/// What an accepted event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The round moved to `spinning`.
    Started,
    /// One reel stopped; `settlement` is set when it was the last one.
    ReelStopped {
        /// Reel that stopped.
        reel: ReelIndex,
        /// Position it stopped at.
        stop: StopPosition,
        /// Symbol shown.
        symbol: Symbol,
        /// Present when the round completed.
        settlement: Option<Settlement>,
    },
    /// The round was reinitialized.
    Reset,
    /// A locked round became `ready`.
    Unlocked,
    /// The event had nothing to do (unlocking a round that is not locked).
    Unchanged,
}

/// Apply `event` to `round`. Guards run before any field is written.
pub fn apply(
    round: &mut PlayerRound,
    event: RoundEvent,
    ctx: RoundContext,
) -> Result<Transition, RoundError> {
    match (round.phase, event) {
        (RoundPhase::Ready, RoundEvent::StartSpin) => {
            round.phase = RoundPhase::Spinning;
            round.reels = EMPTY_REELS;
            round.final_reels = None;
            round.is_win = false;
            round.finished_at = None;
            Ok(Transition::Started)
        }
        (RoundPhase::Spinning, RoundEvent::StartSpin) => Err(RoundError::AlreadySpinning),
        (RoundPhase::Locked, RoundEvent::StartSpin) => Err(RoundError::Locked),

        (RoundPhase::Spinning, RoundEvent::StopReel { reel, stop }) => {
            stop_reel(round, reel, stop, ctx)
        }
        (_, RoundEvent::StopReel { .. }) => Err(RoundError::NotSpinning),

        (RoundPhase::Spinning, RoundEvent::Reset { force: false }) => {
            Err(RoundError::ResetWhileSpinning)
        }
        (_, RoundEvent::Reset { .. }) => {
            let name = std::mem::take(&mut round.name);
            *round = PlayerRound::new(name);
            Ok(Transition::Reset)
        }

        (RoundPhase::Locked, RoundEvent::Unlock) => {
            round.phase = RoundPhase::Ready;
            Ok(Transition::Unlocked)
        }
        (_, RoundEvent::Unlock) => Ok(Transition::Unchanged),
    }
}

fn stop_reel(
    round: &mut PlayerRound,
    reel: i64,
    stop: i64,
    ctx: RoundContext,
) -> Result<Transition, RoundError> {
    let Some(expected) = round.next_expected_reel() else {
        // A spinning round always has at least one open reel.
        return Err(RoundError::NotSpinning);
    };
    let reel = ReelIndex::try_from(reel)?;
    if reel != expected {
        return Err(RoundError::OutOfOrder {
            expected,
            got: reel,
        });
    }
    let stop = StopPosition::try_from(stop)?;

    let symbol = symbol_at(reel, stop);
    round.reels[reel.slot()] = symbol;

    if round.next_expected_reel().is_some() {
        return Ok(Transition::ReelStopped {
            reel,
            stop,
            symbol,
            settlement: None,
        });
    }

    let outcome = evaluate_outcome(&round.reels);
    let locked = ctx.mode == GameMode::Official;
    round.final_reels = Some(round.reels);
    round.is_win = outcome.is_win;
    round.finished_at = Some(ctx.now_ms);
    round.phase = if locked {
        RoundPhase::Locked
    } else {
        RoundPhase::Ready
    };

    Ok(Transition::ReelStopped {
        reel,
        stop,
        symbol,
        settlement: Some(Settlement {
            final_reels: round.reels,
            is_win: outcome.is_win,
            locked,
        }),
    })
}
