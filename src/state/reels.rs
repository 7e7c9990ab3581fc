//! Reel resolver: fixed symbol strips, stop-position lookup and win evaluation.

use std::fmt;

use thiserror::Error;

/// Number of reels on the machine.
pub const REEL_COUNT: usize = 4;
/// Number of stop positions on every strip.
pub const STRIP_LEN: usize = 5;
/// Marker for a reel that has not been stopped yet.
pub const PLACEHOLDER: Symbol = "-";

/// A symbol printed on a reel strip.
pub type Symbol = &'static str;
/// Ordered reel values, left to right.
pub type Reels = [Symbol; REEL_COUNT];

/// Reels of a round where nothing has been stopped yet.
pub const EMPTY_REELS: Reels = [PLACEHOLDER; REEL_COUNT];

const REEL_STRIPS: [[Symbol; STRIP_LEN]; REEL_COUNT] = [
    ["複", "0", "1", "2", "3"],
    ["象", "10", "11", "12", "13"],
    ["公", "20", "21", "22", "23"],
    ["場", "30", "31", "32", "33"],
];

/// The only winning line: the position-0 symbol of every strip.
pub const WINNING_REELS: Reels = [
    REEL_STRIPS[0][0],
    REEL_STRIPS[1][0],
    REEL_STRIPS[2][0],
    REEL_STRIPS[3][0],
];

/// Raised when a reel index or stop position falls outside its range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{what} must be within {min}..={max} (got {got})")]
pub struct OutOfRange {
    /// Which input was rejected.
    pub what: &'static str,
    /// Inclusive lower bound.
    pub min: i64,
    /// Inclusive upper bound.
    pub max: i64,
    /// Rejected value.
    pub got: i64,
}

/// One-based reel index (1..=4), left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReelIndex(u8);

impl ReelIndex {
    /// Leftmost reel.
    pub const FIRST: ReelIndex = ReelIndex(1);

    /// One-based value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot inside [`Reels`].
    pub fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Reel index for a zero-based slot, if it exists.
    pub fn from_slot(slot: usize) -> Option<Self> {
        (slot < REEL_COUNT).then(|| ReelIndex(slot as u8 + 1))
    }
}

impl TryFrom<i64> for ReelIndex {
    type Error = OutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (1..=REEL_COUNT as i64).contains(&value) {
            Ok(ReelIndex(value as u8))
        } else {
            Err(OutOfRange {
                what: "reelIndex",
                min: 1,
                max: REEL_COUNT as i64,
                got: value,
            })
        }
    }
}

impl fmt::Display for ReelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based stop position on a strip (0..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopPosition(u8);

impl StopPosition {
    /// Raw position value.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for StopPosition {
    type Error = OutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..STRIP_LEN as i64).contains(&value) {
            Ok(StopPosition(value as u8))
        } else {
            Err(OutOfRange {
                what: "stopPosition",
                min: 0,
                max: STRIP_LEN as i64 - 1,
                got: value,
            })
        }
    }
}

/// Result of evaluating a fully stopped set of reels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// True when every reel shows its winning symbol.
    pub is_win: bool,
}

/// Symbol shown by `reel` when stopped at `stop`.
pub fn symbol_at(reel: ReelIndex, stop: StopPosition) -> Symbol {
    REEL_STRIPS[reel.slot()][usize::from(stop.get())]
}

/// Evaluate a complete set of reels; there is no partial credit.
pub fn evaluate_outcome(reels: &Reels) -> Outcome {
    Outcome {
        is_win: *reels == WINNING_REELS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(stops: [i64; REEL_COUNT]) -> Reels {
        let mut reels = EMPTY_REELS;
        for (slot, stop) in stops.into_iter().enumerate() {
            let reel = ReelIndex::from_slot(slot).unwrap();
            reels[slot] = symbol_at(reel, StopPosition::try_from(stop).unwrap());
        }
        reels
    }

    #[test]
    fn all_zero_stops_win() {
        let reels = resolve([0, 0, 0, 0]);
        assert_eq!(reels, ["複", "象", "公", "場"]);
        assert!(evaluate_outcome(&reels).is_win);
    }

    #[test]
    fn single_off_stop_loses() {
        let reels = resolve([0, 0, 1, 0]);
        assert_eq!(reels, ["複", "象", "20", "場"]);
        assert!(!evaluate_outcome(&reels).is_win);
    }

    #[test]
    fn every_strip_position_resolves() {
        for slot in 0..REEL_COUNT {
            let reel = ReelIndex::from_slot(slot).unwrap();
            for stop in 0..STRIP_LEN as i64 {
                let symbol = symbol_at(reel, StopPosition::try_from(stop).unwrap());
                assert_ne!(symbol, PLACEHOLDER);
            }
        }
    }

    #[test]
    fn ranges_are_enforced() {
        assert!(ReelIndex::try_from(0).is_err());
        assert!(ReelIndex::try_from(5).is_err());
        assert_eq!(ReelIndex::try_from(4).unwrap().slot(), 3);
        assert!(StopPosition::try_from(-1).is_err());
        assert!(StopPosition::try_from(5).is_err());
        assert_eq!(StopPosition::try_from(4).unwrap().get(), 4);
    }

    #[test]
    fn placeholder_reels_never_win() {
        assert!(!evaluate_outcome(&EMPTY_REELS).is_win);
    }
}
