//! Client settings with file loading and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TetherSettings::default()`]
//! 2. If the settings file exists, its values override defaults per-field
//!    (missing fields keep their defaults via serde)
//! 3. Apply environment variable overrides (highest priority)
//!
//! Invalid env values are silently ignored, falling back to file/default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::RECONNECT_DELAY_MS;
use crate::errors::StorageError;

/// REST API settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the conversation CRUD API.
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001/api".to_owned(),
        }
    }
}

/// Live channel settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// Base WebSocket URL; the conversation id is appended as a path segment.
    pub ws_url: String,
    /// Fixed delay before reconnecting a dropped subscription.
    pub reconnect_delay_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:3001/ws/executions".to_owned(),
            reconnect_delay_ms: RECONNECT_DELAY_MS,
        }
    }
}

/// Durable client-state settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Path of the single JSON record holding session metadata.
    pub state_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
        Self {
            state_path: PathBuf::from(home).join(".tether").join("sessions.json"),
        }
    }
}

/// Root settings for the client engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TetherSettings {
    /// REST API settings.
    pub api: ApiSettings,
    /// Live channel settings.
    pub channel: ChannelSettings,
    /// Durable state settings.
    pub storage: StorageSettings,
}

/// Resolve the default settings file path (`~/.tether/settings.json`).
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".tether").join("settings.json")
}

impl TetherSettings {
    /// Load settings from the default path with env overrides.
    pub fn load() -> Result<Self, StorageError> {
        Self::load_from_path(&settings_path())
    }

    /// Load settings from a specific path with env overrides.
    ///
    /// A missing file yields defaults; invalid JSON is an error.
    pub fn load_from_path(path: &Path) -> Result<Self, StorageError> {
        let mut settings = if path.exists() {
            debug!(?path, "loading settings from file");
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            debug!(?path, "settings file not found, using defaults");
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_string("TETHER_API_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = read_env_string("TETHER_WS_URL") {
            self.channel.ws_url = v;
        }
        if let Some(v) = read_env_u64("TETHER_RECONNECT_MS", 1, 600_000) {
            self.channel.reconnect_delay_ms = v;
        }
        if let Some(v) = read_env_string("TETHER_STATE_PATH") {
            self.storage.state_path = PathBuf::from(v);
        }
    }
}

/// Read a non-empty string env var.
fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read an integer env var, rejecting values outside `[min, max]`.
fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| (min..=max).contains(v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = TetherSettings::default();
        assert_eq!(s.channel.reconnect_delay_ms, RECONNECT_DELAY_MS);
        assert!(s.api.base_url.starts_with("http://"));
        assert!(s.storage.state_path.ends_with("sessions.json"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = TetherSettings::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s, {
            let mut d = TetherSettings::default();
            d.apply_env_overrides();
            d
        });
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"channel":{"reconnectDelayMs":50}}"#).unwrap();
        let s = TetherSettings::load_from_path(&path).unwrap();
        assert_eq!(s.channel.reconnect_delay_ms, 50);
        assert_eq!(s.api, ApiSettings::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(TetherSettings::load_from_path(&path).is_err());
    }

    #[test]
    fn env_u64_rejects_out_of_range() {
        // Uses direct parsing helpers to avoid mutating process env in tests.
        assert_eq!("500".parse::<u64>().ok().filter(|v| (1..=600_000).contains(v)), Some(500));
        assert_eq!("0".parse::<u64>().ok().filter(|v| (1..=600_000).contains(v)), None);
        assert_eq!("abc".parse::<u64>().ok(), None);
    }
}
