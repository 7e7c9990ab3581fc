use std::cmp::Ordering;

use crate::state::{
    binder::ConnectionId,
    reels::{PLACEHOLDER, REEL_COUNT, WINNING_REELS},
    registry::Snapshot,
    round::PlayerRound,
};

/// Progress of a round towards the winning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Percentage of reels showing their winning symbol.
    pub accuracy: u8,
    /// Reels already stopped.
    pub completed: usize,
}

/// One line of the admin grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Connection the player is bound to.
    pub id: ConnectionId,
    /// The player's round.
    pub round: PlayerRound,
    /// Progress used for ordering.
    pub progress: Progress,
}

/// Measure how close `round` is to the winning line.
pub fn progress(round: &PlayerRound) -> Progress {
    let correct = round
        .reels
        .iter()
        .zip(WINNING_REELS.iter())
        .filter(|(shown, target)| shown == target)
        .count();
    let completed = round.reels.iter().filter(|s| **s != PLACEHOLDER).count();
    Progress {
        accuracy: ((correct * 100 + REEL_COUNT / 2) / REEL_COUNT) as u8,
        completed,
    }
}

/// Rank connected players: accuracy, then stopped reels, then earliest finish,
/// then name and connection id as tie breakers.
pub fn rank(snapshot: &Snapshot) -> Vec<RankedEntry> {
    let mut entries: Vec<_> = snapshot
        .clients
        .iter()
        .map(|(id, round)| (*id, round.clone(), progress(round)))
        .collect();

    entries.sort_by(|(id_a, a, pa), (id_b, b, pb)| {
        pb.accuracy
            .cmp(&pa.accuracy)
            .then_with(|| pb.completed.cmp(&pa.completed))
            .then_with(|| compare_finished_at(a.finished_at, b.finished_at))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| id_a.cmp(id_b))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (id, round, progress))| RankedEntry {
            rank: index + 1,
            id,
            round,
            progress,
        })
        .collect()
}

/// Earlier finishes first; rounds that never finished go last.
fn compare_finished_at(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::state::round::GameMode;

    fn round(name: &str, reels: [&'static str; 4], finished_at: Option<u64>) -> PlayerRound {
        let mut round = PlayerRound::new(name.into());
        round.reels = reels;
        round.finished_at = finished_at;
        round
    }

    #[test]
    fn progress_counts_matches_and_stops() {
        let p = progress(&round("A", ["複", "10", "-", "-"], None));
        assert_eq!(p.accuracy, 25);
        assert_eq!(p.completed, 2);
    }

    #[test]
    fn ranking_orders_by_accuracy_then_progress_then_finish() {
        let ids: Vec<_> = (0..4).map(|_| ConnectionId::new()).collect();
        let mut clients = IndexMap::new();
        clients.insert(ids[0], round("slow", ["複", "象", "公", "30"], Some(200)));
        clients.insert(ids[1], round("idle", ["-", "-", "-", "-"], None));
        clients.insert(ids[2], round("fast", ["複", "象", "公", "31"], Some(100)));
        clients.insert(ids[3], round("winner", ["複", "象", "公", "場"], Some(300)));
        let snapshot = Snapshot {
            mode: GameMode::Official,
            clients,
        };

        let ranked = rank(&snapshot);
        let names: Vec<_> = ranked.iter().map(|e| e.round.name.as_str()).collect();
        assert_eq!(names, ["winner", "fast", "slow", "idle"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
        assert_eq!(ranked[0].progress.accuracy, 100);
    }
}
