//! Application-level configuration loading from an optional JSON file and the environment.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::binder::{DEFAULT_NAME_MAX_LEN, DEFAULT_PLAYER_NAME, NamePolicy};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "REEL_RALLY_CONFIG_PATH";
/// Port used when neither `PORT` nor `SERVER_PORT` is set.
const DEFAULT_PORT: u16 = 3000;
/// Admin sessions last twelve hours unless configured otherwise.
const DEFAULT_ADMIN_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    port: u16,
    admin_token: Option<String>,
    admin_session_ttl: Duration,
    secure_cookies: bool,
    names: NamePolicy,
}

impl AppConfig {
    /// Load the configuration file (falling back to defaults) and apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_env_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides read through `lookup` (the process environment in production).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
        {
            self.port = port;
        }

        if let Some(token) = lookup("ADMIN_TOKEN") {
            let token = token.trim().to_string();
            self.admin_token = (!token.is_empty()).then_some(token);
        }

        match lookup("ADMIN_SESSION_TTL_MS").map(|value| value.parse::<u64>()) {
            Some(Ok(ms)) if ms > 0 => self.admin_session_ttl = Duration::from_millis(ms),
            Some(_) => warn!("ignoring invalid ADMIN_SESSION_TTL_MS"),
            None => {}
        }

        if let Some(secure) = lookup("ADMIN_COOKIE_SECURE") {
            self.secure_cookies = matches!(secure.trim(), "1" | "true" | "yes");
        }

        self
    }

    /// Port the HTTP server listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Shared admin secret, when configured.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Lifetime of an admin session.
    pub fn admin_session_ttl(&self) -> Duration {
        self.admin_session_ttl
    }

    /// Whether the admin cookie carries the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Rules applied to player display names.
    pub fn name_policy(&self) -> NamePolicy {
        self.names.clone()
    }

    /// Replace the admin secret; used by tests and embedders.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_token: None,
            admin_session_ttl: DEFAULT_ADMIN_SESSION_TTL,
            secure_cookies: false,
            names: NamePolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    player_name_max_len: Option<usize>,
    default_player_name: Option<String>,
    admin_session_ttl_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let fallback = value
            .default_player_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
        Self {
            port: value.port.unwrap_or(defaults.port),
            admin_session_ttl: value
                .admin_session_ttl_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.admin_session_ttl),
            names: NamePolicy {
                max_len: value
                    .player_name_max_len
                    .filter(|len| *len > 0)
                    .unwrap_or(DEFAULT_NAME_MAX_LEN),
                fallback,
            },
            ..defaults
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_values_fill_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"playerNameMaxLen": 8, "adminSessionTtlMs": 5000}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.name_policy().max_len, 8);
        assert_eq!(config.name_policy().fallback, DEFAULT_PLAYER_NAME);
        assert_eq!(config.admin_session_ttl(), Duration::from_millis(5000));
    }

    #[test]
    fn env_overrides_file() {
        let config = AppConfig::default().with_env_overrides(env_of(&[
            ("SERVER_PORT", "8081"),
            ("ADMIN_TOKEN", "  secret "),
            ("ADMIN_SESSION_TTL_MS", "1000"),
            ("ADMIN_COOKIE_SECURE", "true"),
        ]));
        assert_eq!(config.port(), 8081);
        assert_eq!(config.admin_token(), Some("secret"));
        assert_eq!(config.admin_session_ttl(), Duration::from_secs(1));
        assert!(config.secure_cookies());
    }

    #[test]
    fn blank_admin_token_disables_login() {
        let config = AppConfig::default()
            .with_admin_token("x")
            .with_env_overrides(env_of(&[("ADMIN_TOKEN", "   ")]));
        assert_eq!(config.admin_token(), None);
    }

    #[test]
    fn invalid_ttl_keeps_default() {
        let config =
            AppConfig::default().with_env_overrides(env_of(&[("ADMIN_SESSION_TTL_MS", "soon")]));
        assert_eq!(config.admin_session_ttl(), DEFAULT_ADMIN_SESSION_TTL);
    }
}
