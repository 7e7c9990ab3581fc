//! Read-only projections of the live game for dashboards and tooling.

use crate::{
    dto::snapshot::{RankedEntryView, RankingView, SnapshotView},
    state::{SharedState, ranking},
};

/// Mode plus every connected player's round.
pub async fn snapshot(state: &SharedState) -> SnapshotView {
    SnapshotView::from(&state.snapshot().await)
}

/// Connected players ordered for the admin grid.
pub async fn ranking(state: &SharedState) -> RankingView {
    let snapshot = state.snapshot().await;
    RankingView {
        mode: snapshot.mode,
        entries: ranking::rank(&snapshot)
            .iter()
            .map(RankedEntryView::from)
            .collect(),
    }
}
