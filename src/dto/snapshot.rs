use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    ranking::RankedEntry,
    reels::Reels,
    registry::Snapshot,
    round::{GameMode, PlayerRound, RoundPhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Wire view of one player's round.
pub struct PlayerRoundView {
    pub name: String,
    pub phase: RoundPhase,
    pub reels: Vec<String>,
    pub final_reels: Option<Vec<String>>,
    pub is_win: bool,
    pub finished_at: Option<u64>,
}

impl From<&PlayerRound> for PlayerRoundView {
    fn from(round: &PlayerRound) -> Self {
        Self {
            name: round.name.clone(),
            phase: round.phase,
            reels: reels_to_vec(&round.reels),
            final_reels: round.final_reels.as_ref().map(reels_to_vec),
            is_win: round.is_win,
            finished_at: round.finished_at,
        }
    }
}

/// Owned copy of a reel line.
pub fn reels_to_vec(reels: &Reels) -> Vec<String> {
    reels.iter().map(|symbol| symbol.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Mode plus every connected player's round, keyed by connection id in join order.
pub struct SnapshotView {
    pub mode: GameMode,
    #[schema(value_type = Object)]
    pub clients: IndexMap<String, PlayerRoundView>,
}

impl From<&Snapshot> for SnapshotView {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            mode: snapshot.mode,
            clients: snapshot
                .clients
                .iter()
                .map(|(id, round)| (id.to_string(), PlayerRoundView::from(round)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// One line of the admin ranking grid.
pub struct RankedEntryView {
    pub rank: usize,
    pub id: String,
    pub state: PlayerRoundView,
    /// Share of reels showing their winning symbol, in percent.
    pub accuracy: u8,
    /// Reels stopped so far.
    pub completed: usize,
}

impl From<&RankedEntry> for RankedEntryView {
    fn from(entry: &RankedEntry) -> Self {
        Self {
            rank: entry.rank,
            id: entry.id.to_string(),
            state: PlayerRoundView::from(&entry.round),
            accuracy: entry.progress.accuracy,
            completed: entry.progress.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Ranking of connected players under the current mode.
pub struct RankingView {
    pub mode: GameMode,
    pub entries: Vec<RankedEntryView>,
}
