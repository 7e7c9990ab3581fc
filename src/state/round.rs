use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::state::reels::{EMPTY_REELS, PLACEHOLDER, ReelIndex, Reels};

/// Process-wide game mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Players spin and reset on their own.
    #[default]
    Practice,
    /// The admin starts and resets rounds; finished rounds lock.
    Official,
}

/// Phase of a single player's round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Waiting for a spin to start.
    #[default]
    Ready,
    /// Reels are turning and being stopped left to right.
    Spinning,
    /// Finished in official mode; waits for an admin unlock.
    Locked,
}

/// Authoritative round record of one logical player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRound {
    /// Sanitized display name.
    pub name: String,
    /// Current phase.
    pub phase: RoundPhase,
    /// Reels of the round in progress (or of the last finished round).
    pub reels: Reels,
    /// Frozen reels of the last completed round.
    pub final_reels: Option<Reels>,
    /// Whether `final_reels` is the winning line.
    pub is_win: bool,
    /// Completion time (unix milliseconds) of the last round.
    pub finished_at: Option<u64>,
}

impl PlayerRound {
    /// Fresh round in the `ready` phase.
    pub fn new(name: String) -> Self {
        Self {
            name,
            phase: RoundPhase::Ready,
            reels: EMPTY_REELS,
            final_reels: None,
            is_win: false,
            finished_at: None,
        }
    }

    /// Number of reels already stopped.
    pub fn stopped_count(&self) -> usize {
        self.reels.iter().take_while(|s| **s != PLACEHOLDER).count()
    }

    /// The reel that must be stopped next, if any remain.
    pub fn next_expected_reel(&self) -> Option<ReelIndex> {
        ReelIndex::from_slot(self.stopped_count())
    }
}

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or_default()
}
