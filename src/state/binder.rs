use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{
    registry::{ResumeToken, SessionRegistry},
    round::PlayerRound,
};

/// Default cap on display name length (in characters).
pub const DEFAULT_NAME_MAX_LEN: usize = 24;
/// Name given to players whose sanitized name is empty.
pub const DEFAULT_PLAYER_NAME: &str = "玩家";

/// Transient identity of one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How display names are cleaned up on join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePolicy {
    /// Maximum number of characters kept.
    pub max_len: usize,
    /// Name used when nothing survives sanitizing.
    pub fallback: String,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_NAME_MAX_LEN,
            fallback: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

/// Strip control characters and angle brackets, trim, and cap the length.
pub fn sanitize_name(raw: &str, policy: &NamePolicy) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect();
    let capped: String = cleaned.trim().chars().take(policy.max_len).collect();
    let capped = capped.trim_end();
    if capped.is_empty() {
        policy.fallback.clone()
    } else {
        capped.to_string()
    }
}

/// Result of binding a connection to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// Token the client must present to resume later.
    pub resume_token: ResumeToken,
    /// The player's round after the join.
    pub round: PlayerRound,
    /// True when an existing player was resumed.
    pub resumed: bool,
    /// Connection that lost its binding to this player, if any.
    pub evicted: Option<ConnectionId>,
}

/// Two-way mapping between live connections and resume tokens.
///
/// A connection maps to at most one token and a token to at most one connection.
#[derive(Debug, Default)]
pub struct ConnectionBinder {
    by_connection: IndexMap<ConnectionId, ResumeToken>,
    by_token: HashMap<ResumeToken, ConnectionId>,
}

impl ConnectionBinder {
    /// Binder without any binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection` to `token`, returning the connection it evicted.
    pub fn bind(&mut self, connection: ConnectionId, token: ResumeToken) -> Option<ConnectionId> {
        if let Some(previous_token) = self.by_connection.get(&connection) {
            if *previous_token != token {
                self.by_token.remove(previous_token);
            }
        }

        let evicted = match self.by_token.insert(token.clone(), connection) {
            Some(previous) if previous != connection => {
                self.by_connection.shift_remove(&previous);
                Some(previous)
            }
            _ => None,
        };
        self.by_connection.insert(connection, token);
        evicted
    }

    /// Token currently bound to `connection`.
    pub fn token_for(&self, connection: ConnectionId) -> Option<&ResumeToken> {
        self.by_connection.get(&connection)
    }

    /// Connection currently bound to `token`.
    pub fn connection_for(&self, token: &ResumeToken) -> Option<ConnectionId> {
        self.by_token.get(token).copied()
    }

    /// Live bindings in the order connections joined.
    pub fn bindings(&self) -> impl Iterator<Item = (ConnectionId, &ResumeToken)> {
        self.by_connection.iter().map(|(id, token)| (*id, token))
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    /// Whether no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }

    /// Join `connection` as a player, resuming the round behind `resume_token` when known.
    ///
    /// Unknown or absent tokens mint a new player. The name is always overwritten.
    pub fn join(
        &mut self,
        registry: &mut SessionRegistry,
        connection: ConnectionId,
        raw_name: &str,
        resume_token: Option<&str>,
        policy: &NamePolicy,
    ) -> Joined {
        let name = sanitize_name(raw_name, policy);
        let known = resume_token
            .and_then(ResumeToken::parse)
            .filter(|token| registry.contains(token));

        let (token, resumed) = match known {
            Some(token) => {
                if let Some(round) = registry.get_mut(&token) {
                    round.name = name;
                }
                (token, true)
            }
            None => (registry.insert_new(PlayerRound::new(name)), false),
        };

        let evicted = self.bind(connection, token.clone());
        let round = registry
            .get(&token)
            .cloned()
            .unwrap_or_else(|| PlayerRound::new(policy.fallback.clone()));

        Joined {
            resume_token: token,
            round,
            resumed,
            evicted,
        }
    }

    /// Round of the player bound to `connection`; `None` means "not joined".
    pub fn resolve<'a>(
        &self,
        registry: &'a SessionRegistry,
        connection: ConnectionId,
    ) -> Option<&'a PlayerRound> {
        self.token_for(connection)
            .and_then(|token| registry.get(token))
    }

    /// Drop the binding of a disconnected connection. The player and token survive.
    pub fn release(&mut self, connection: ConnectionId) -> Option<ResumeToken> {
        let token = self.by_connection.shift_remove(&connection)?;
        if self.by_token.get(&token) == Some(&connection) {
            self.by_token.remove(&token);
        }
        Some(token)
    }

    /// Forget every binding, token and round. Returns how many connections were bound.
    pub fn rebind_all(&mut self, registry: &mut SessionRegistry) -> usize {
        let bound = self.by_connection.len();
        self.by_connection.clear();
        self.by_token.clear();
        registry.clear();
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::round::RoundPhase;

    fn setup() -> (ConnectionBinder, SessionRegistry, NamePolicy) {
        (
            ConnectionBinder::new(),
            SessionRegistry::new(),
            NamePolicy::default(),
        )
    }

    #[test]
    fn sanitize_strips_markup_and_controls() {
        let policy = NamePolicy::default();
        assert_eq!(sanitize_name("  <b>Ann</b>\n ", &policy), "bAnn/b");
        assert_eq!(sanitize_name("\u{7}\t  ", &policy), DEFAULT_PLAYER_NAME);
        assert_eq!(sanitize_name("<>", &policy), DEFAULT_PLAYER_NAME);
    }

    #[test]
    fn sanitize_caps_length_in_chars() {
        let policy = NamePolicy {
            max_len: 3,
            fallback: "p".into(),
        };
        assert_eq!(sanitize_name("複象公場", &policy), "複象公");
    }

    #[test]
    fn join_without_token_mints_player() {
        let (mut binder, mut registry, policy) = setup();
        let connection = ConnectionId::new();
        let joined = binder.join(&mut registry, connection, "A", None, &policy);

        assert!(!joined.resumed);
        assert_eq!(joined.evicted, None);
        assert_eq!(joined.round, PlayerRound::new("A".into()));
        assert_eq!(binder.token_for(connection), Some(&joined.resume_token));
    }

    #[test]
    fn unknown_token_is_treated_as_absent() {
        let (mut binder, mut registry, policy) = setup();
        let joined = binder.join(
            &mut registry,
            ConnectionId::new(),
            "A",
            Some("deadbeef"),
            &policy,
        );
        assert!(!joined.resumed);
        assert_ne!(joined.resume_token.as_str(), "deadbeef");
    }

    #[test]
    fn rejoin_with_token_evicts_previous_connection() {
        let (mut binder, mut registry, policy) = setup();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        let joined = binder.join(&mut registry, first, "A", None, &policy);
        registry.get_mut(&joined.resume_token).unwrap().phase = RoundPhase::Spinning;

        let again = binder.join(
            &mut registry,
            second,
            "B",
            Some(joined.resume_token.as_str()),
            &policy,
        );
        assert!(again.resumed);
        assert_eq!(again.evicted, Some(first));
        assert_eq!(again.resume_token, joined.resume_token);
        assert_eq!(again.round.name, "B");
        assert_eq!(again.round.phase, RoundPhase::Spinning);
        assert_eq!(registry.len(), 1);
        assert!(binder.resolve(&registry, first).is_none());
        assert_eq!(binder.resolve(&registry, second).unwrap().name, "B");
    }

    #[test]
    fn release_keeps_player() {
        let (mut binder, mut registry, policy) = setup();
        let connection = ConnectionId::new();
        let joined = binder.join(&mut registry, connection, "A", None, &policy);

        assert_eq!(binder.release(connection), Some(joined.resume_token.clone()));
        assert!(binder.resolve(&registry, connection).is_none());
        assert!(registry.contains(&joined.resume_token));
        assert_eq!(binder.connection_for(&joined.resume_token), None);
    }

    #[test]
    fn release_of_evicted_connection_keeps_new_binding() {
        let (mut binder, mut registry, policy) = setup();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        let joined = binder.join(&mut registry, first, "A", None, &policy);
        binder.join(
            &mut registry,
            second,
            "A",
            Some(joined.resume_token.as_str()),
            &policy,
        );

        assert_eq!(binder.release(first), None);
        assert_eq!(binder.connection_for(&joined.resume_token), Some(second));
    }

    #[test]
    fn rebind_all_forgets_everything() {
        let (mut binder, mut registry, policy) = setup();
        let joined = binder.join(&mut registry, ConnectionId::new(), "A", None, &policy);
        binder.join(&mut registry, ConnectionId::new(), "B", None, &policy);

        assert_eq!(binder.rebind_all(&mut registry), 2);
        assert!(binder.is_empty());
        assert!(registry.is_empty());

        let fresh = binder.join(
            &mut registry,
            ConnectionId::new(),
            "A",
            Some(joined.resume_token.as_str()),
            &policy,
        );
        assert!(!fresh.resumed);
        assert_ne!(fresh.resume_token, joined.resume_token);
    }
}
