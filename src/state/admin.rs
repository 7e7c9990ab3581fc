use std::time::{Duration, Instant};

use dashmap::DashMap;
use subtle::ConstantTimeEq;

use crate::{error::ServiceError, state::registry::random_hex};

/// Bytes of entropy behind an admin session id.
const SESSION_ID_BYTES: usize = 24;

/// Short-lived admin sessions established by presenting the shared admin secret.
pub struct AdminSessions {
    secret: Option<String>,
    ttl: Duration,
    sessions: DashMap<String, Instant>,
}

impl AdminSessions {
    /// Build the store. A blank `secret` disables admin login entirely.
    pub fn new(secret: Option<String>, ttl: Duration) -> Self {
        let secret = secret
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            secret,
            ttl,
            sessions: DashMap::new(),
        }
    }

    /// Whether an admin secret is configured.
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Exchange the admin secret for a new session id.
    pub fn login(&self, token: &str) -> Result<String, ServiceError> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(ServiceError::NotConfigured);
        };

        let matches: bool = token.trim().as_bytes().ct_eq(secret.as_bytes()).into();
        if !matches {
            return Err(ServiceError::Unauthorized("invalid admin token".into()));
        }

        self.sweep_expired();
        let session_id = random_hex(SESSION_ID_BYTES);
        self.sessions
            .insert(session_id.clone(), Instant::now() + self.ttl);
        Ok(session_id)
    }

    /// Whether `session_id` is live. Expired sessions are dropped on sight.
    pub fn is_valid(&self, session_id: &str) -> bool {
        let now = Instant::now();
        let expired = match self.sessions.get(session_id) {
            Some(expires_at) => *expires_at <= now,
            None => return false,
        };
        if expired {
            self.sessions.remove(session_id);
        }
        !expired
    }

    /// Validate `session_id` and extend its expiry.
    pub fn touch(&self, session_id: &str) -> bool {
        if !self.is_valid(session_id) {
            return false;
        }
        if let Some(mut expires_at) = self.sessions.get_mut(session_id) {
            *expires_at = Instant::now() + self.ttl;
        }
        true
    }

    /// Guard for admin commands on a connection that presented `session_id`.
    pub fn authorize(&self, session_id: Option<&str>, action: &str) -> Result<(), ServiceError> {
        match session_id {
            Some(id) if self.touch(id) => Ok(()),
            _ => Err(ServiceError::Unauthorized(format!(
                "{action} requires an admin login"
            ))),
        }
    }

    /// End a session.
    pub fn revoke(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drop every expired session and return how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, expires_at| *expires_at > now);
        before - self.sessions.len()
    }
}
