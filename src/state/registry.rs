use std::fmt;

use indexmap::IndexMap;
use rand::RngCore;

use crate::state::{
    binder::{ConnectionBinder, ConnectionId},
    round::{GameMode, PlayerRound},
};

/// Bytes of entropy behind a resume token.
const RESUME_TOKEN_BYTES: usize = 24;

/// Durable identity of a logical player, reusable across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResumeToken(String);

impl ResumeToken {
    /// Wrap a client-supplied token; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// Token as sent to the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only projection handed to (re)connecting viewers and admin polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current global mode.
    pub mode: GameMode,
    /// Rounds of connected players keyed by connection id, in join order.
    pub clients: IndexMap<ConnectionId, PlayerRound>,
}

/// Authoritative store of player rounds and the global mode.
///
/// The registry enforces no game rules; it only keeps storage consistent.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    mode: GameMode,
    rounds: IndexMap<ResumeToken, PlayerRound>,
}

impl SessionRegistry {
    /// Empty registry in practice mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current global mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Replace the global mode.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }

    /// Round stored under `token`.
    pub fn get(&self, token: &ResumeToken) -> Option<&PlayerRound> {
        self.rounds.get(token)
    }

    /// Mutable round stored under `token`.
    pub fn get_mut(&mut self, token: &ResumeToken) -> Option<&mut PlayerRound> {
        self.rounds.get_mut(token)
    }

    /// Overwrite a known round. Returns `false` (and stores nothing) for unknown tokens.
    pub fn set(&mut self, token: &ResumeToken, round: PlayerRound) -> bool {
        match self.rounds.get_mut(token) {
            Some(slot) => {
                *slot = round;
                true
            }
            None => false,
        }
    }

    /// Remove a round, returning it if it existed.
    pub fn delete(&mut self, token: &ResumeToken) -> Option<PlayerRound> {
        self.rounds.shift_remove(token)
    }

    /// Whether `token` names a known player.
    pub fn contains(&self, token: &ResumeToken) -> bool {
        self.rounds.contains_key(token)
    }

    /// Store a new round under a freshly minted, unused token.
    pub fn insert_new(&mut self, round: PlayerRound) -> ResumeToken {
        let token = loop {
            let candidate = ResumeToken(random_hex(RESUME_TOKEN_BYTES));
            if !self.rounds.contains_key(&candidate) {
                break candidate;
            }
        };
        self.rounds.insert(token.clone(), round);
        token
    }

    /// Iterate every known round mutably.
    pub fn rounds_mut(&mut self) -> impl Iterator<Item = (&ResumeToken, &mut PlayerRound)> {
        self.rounds.iter_mut()
    }

    /// Number of known players.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether no player is known.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Drop every round and token.
    pub fn clear(&mut self) {
        self.rounds.clear();
    }

    /// Project the connected players' rounds keyed by their live connection.
    pub fn snapshot(&self, binder: &ConnectionBinder) -> Snapshot {
        let clients = binder
            .bindings()
            .filter_map(|(connection_id, token)| {
                self.rounds
                    .get(token)
                    .map(|round| (connection_id, round.clone()))
            })
            .collect();
        Snapshot {
            mode: self.mode,
            clients,
        }
    }
}

/// Lowercase hex string of `len` random bytes.
pub(crate) fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_unique_hex() {
        let mut registry = SessionRegistry::new();
        let a = registry.insert_new(PlayerRound::new("A".into()));
        let b = registry.insert_new(PlayerRound::new("B".into()));
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), RESUME_TOKEN_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn set_unknown_token_is_noop() {
        let mut registry = SessionRegistry::new();
        let stray = ResumeToken::parse("nope").unwrap();
        assert!(!registry.set(&stray, PlayerRound::new("X".into())));
        assert!(registry.is_empty());
    }

    #[test]
    fn set_and_delete_known_token() {
        let mut registry = SessionRegistry::new();
        let token = registry.insert_new(PlayerRound::new("A".into()));
        assert!(registry.set(&token, PlayerRound::new("B".into())));
        assert_eq!(registry.get(&token).unwrap().name, "B");
        assert!(registry.delete(&token).is_some());
        assert!(!registry.contains(&token));
    }

    #[test]
    fn parse_rejects_blank_tokens() {
        assert_eq!(ResumeToken::parse("   "), None);
        assert_eq!(ResumeToken::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn snapshot_only_lists_bound_rounds() {
        let mut registry = SessionRegistry::new();
        let mut binder = ConnectionBinder::new();
        let bound = registry.insert_new(PlayerRound::new("A".into()));
        registry.insert_new(PlayerRound::new("B".into()));
        let connection = ConnectionId::new();
        binder.bind(connection, bound);

        let snapshot = registry.snapshot(&binder);
        assert_eq!(snapshot.mode, GameMode::Practice);
        assert_eq!(snapshot.clients.len(), 1);
        assert_eq!(snapshot.clients[&connection].name, "A");
    }
}
