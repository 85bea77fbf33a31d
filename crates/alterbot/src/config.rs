// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bot configuration.
//!
//! Two layers:
//! - [`BotSettings`]: process settings read once at startup from an optional
//!   JSON document, then overridden from the environment / command line.
//! - [`RuntimeConfigStore`]: the mutable connection target (host, port,
//!   username) that the control surface can change while the bot runs.
//!
//! # Settings document
//!
//! ```json
//! {
//!   "client": { "host": "play.example.net", "port": 25565, "username": "AlterBot" },
//!   "action": {
//!     "commands": ["forward", "back", "left", "right", "jump"],
//!     "holdDuration": 2000,
//!     "retryDelay": 10000
//!   }
//! }
//! ```

use crate::session::ControlState;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Runtime connection target
// ============================================================================

/// Connection parameters for the next session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Server host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (1-65535).
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,

    /// Offline-mode player name.
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    25565
}

fn default_username() -> String {
    "AlterBot".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
        }
    }
}

impl RuntimeConfig {
    /// Create a connection target.
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
        }
    }
}

impl std::fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} as {}", self.host, self.port, self.username)
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = PortValue::deserialize(deserializer)?;
    value.coerce().map_err(serde::de::Error::custom)
}

/// A port as it arrives from the outside: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    /// Coerce to a TCP port. Zero and out-of-range values are rejected.
    pub fn coerce(&self) -> Result<u16, ConfigError> {
        let raw = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidPort(format!("{:?} is not a number", s)))?,
        };

        match u16::try_from(raw) {
            Ok(0) | Err(_) => Err(ConfigError::InvalidPort(format!(
                "{} is outside 1-65535",
                raw
            ))),
            Ok(port) => Ok(port),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl From<u16> for PortValue {
    fn from(port: u16) -> Self {
        Self::Number(u64::from(port))
    }
}

/// Partial update of the connection target. Absent or empty fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub host: Option<String>,
    pub port: Option<PortValue>,
    pub username: Option<String>,
}

impl ConfigUpdate {
    /// Update only the host.
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Update only the port.
    pub fn port(port: impl Into<PortValue>) -> Self {
        Self {
            port: Some(port.into()),
            ..Default::default()
        }
    }

    /// Update only the username.
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Process-wide holder of the current [`RuntimeConfig`].
#[derive(Debug)]
pub struct RuntimeConfigStore {
    current: RwLock<RuntimeConfig>,
}

impl RuntimeConfigStore {
    /// Create a store seeded with the startup configuration.
    pub fn new(initial: RuntimeConfig) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> RuntimeConfig {
        self.current.read().clone()
    }

    /// Apply a partial update and return the resulting configuration.
    ///
    /// Coercion happens before anything is written: on error the store is
    /// unchanged.
    pub fn update(&self, update: &ConfigUpdate) -> Result<RuntimeConfig, ConfigError> {
        let port = match &update.port {
            Some(value) if !value.is_blank() => Some(value.coerce()?),
            _ => None,
        };

        let mut current = self.current.write();
        if let Some(host) = non_blank(&update.host) {
            current.host = host.to_string();
        }
        if let Some(port) = port {
            current.port = port;
        }
        if let Some(username) = non_blank(&update.username) {
            current.username = username.to_string();
        }

        info!("Config updated: {}", *current);
        Ok(current.clone())
    }
}

// ============================================================================
// Process settings
// ============================================================================

/// Periodic activity and retry parameters (`action` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSettings {
    /// Movement commands picked at random on every tick.
    #[serde(default = "default_commands")]
    pub commands: Vec<ControlState>,

    /// How long a movement command is held (ms).
    #[serde(rename = "holdDuration", default = "default_hold_duration")]
    pub hold_duration_ms: u64,

    /// Tick period (ms). Defaults to the hold duration.
    #[serde(rename = "interval", default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    /// Probability of sprinting while a command is held.
    #[serde(rename = "sprintChance", default = "default_sprint_chance")]
    pub sprint_chance: f64,

    /// Delay before reconnecting after a post-login disconnect (ms).
    #[serde(rename = "retryDelay", default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Delay before retrying a connection that never logged in (ms).
    #[serde(rename = "initialRetryDelay", default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,
}

fn default_commands() -> Vec<ControlState> {
    vec![
        ControlState::Forward,
        ControlState::Back,
        ControlState::Left,
        ControlState::Right,
        ControlState::Jump,
    ]
}

fn default_hold_duration() -> u64 {
    2000
}

fn default_sprint_chance() -> f64 {
    0.5
}

fn default_retry_delay() -> u64 {
    10_000
}

fn default_initial_retry_delay() -> u64 {
    60_000
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            commands: default_commands(),
            hold_duration_ms: default_hold_duration(),
            interval_ms: None,
            sprint_chance: default_sprint_chance(),
            retry_delay_ms: default_retry_delay(),
            initial_retry_delay_ms: default_initial_retry_delay(),
        }
    }
}

impl ActionSettings {
    /// Get hold duration as Duration.
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    /// Get tick period as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or(self.hold_duration_ms))
    }

    /// Reconnect delays derived from this section.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Fixed-delay reconnect policy.
///
/// No exponential growth, no jitter and no retry cap: the controller retries
/// forever with one of two constant delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait after a failure before the first handshake.
    pub initial_delay: Duration,
    /// Wait after a disconnect that followed a handshake.
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ActionSettings::default().reconnect_policy()
    }
}

/// Values from the environment or command line that win over the document.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub host: Option<String>,
    pub port: Option<String>,
    pub username: Option<String>,
    pub retry_delay_ms: Option<u64>,
    pub initial_retry_delay_ms: Option<u64>,
}

/// Complete process settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    /// Initial connection target.
    #[serde(default)]
    pub client: RuntimeConfig,

    /// Periodic activity and retry parameters.
    #[serde(default)]
    pub action: ActionSettings,
}

impl BotSettings {
    /// Load settings from a JSON document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings as pretty-printed JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the document (if any), then apply overrides and validate.
    pub fn load(path: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let settings = base.with_overrides(overrides)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply environment / CLI overrides.
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = non_blank(&overrides.host) {
            self.client.host = host.to_string();
        }
        if let Some(port) = non_blank(&overrides.port) {
            self.client.port = PortValue::Text(port.to_string()).coerce()?;
        }
        if let Some(username) = non_blank(&overrides.username) {
            self.client.username = username.to_string();
        }
        if let Some(ms) = overrides.retry_delay_ms {
            self.action.retry_delay_ms = ms;
        }
        if let Some(ms) = overrides.initial_retry_delay_ms {
            self.action.initial_retry_delay_ms = ms;
        }
        Ok(self)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.host.trim().is_empty() {
            return Err(ConfigError::Invalid("client.host cannot be empty".into()));
        }
        if self.client.username.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "client.username cannot be empty".into(),
            ));
        }
        if self.action.hold_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "action.holdDuration cannot be 0".into(),
            ));
        }
        if self.action.interval_ms == Some(0) {
            return Err(ConfigError::Invalid("action.interval cannot be 0".into()));
        }
        if !(0.0..=1.0).contains(&self.action.sprint_chance) {
            return Err(ConfigError::Invalid(
                "action.sprintChance must be within 0.0-1.0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RuntimeConfigStore {
        RuntimeConfigStore::new(RuntimeConfig::new("mc.example.com", 25565, "Bot1"))
    }

    #[test]
    fn test_update_host_only() {
        let store = store();
        let updated = store.update(&ConfigUpdate::host("a")).unwrap();

        assert_eq!(updated.host, "a");
        assert_eq!(updated.port, 25565);
        assert_eq!(updated.username, "Bot1");
        assert_eq!(store.get(), updated);
    }

    #[test]
    fn test_update_ignores_empty_fields() {
        let store = store();
        let update = ConfigUpdate {
            host: Some(String::new()),
            port: Some(PortValue::Text(String::new())),
            username: Some("Bot2".into()),
        };
        let updated = store.update(&update).unwrap();

        assert_eq!(updated, RuntimeConfig::new("mc.example.com", 25565, "Bot2"));
    }

    #[test]
    fn test_update_port_from_string() {
        let store = store();
        let updated = store
            .update(&ConfigUpdate::port(PortValue::Text(" 25566 ".into())))
            .unwrap();
        assert_eq!(updated.port, 25566);
    }

    #[test]
    fn test_invalid_port_leaves_store_untouched() {
        let store = store();
        let update = ConfigUpdate {
            host: Some("other.example.com".into()),
            port: Some(PortValue::Text("abc".into())),
            username: None,
        };

        assert!(matches!(
            store.update(&update),
            Err(ConfigError::InvalidPort(_))
        ));
        assert_eq!(store.get().host, "mc.example.com");
    }

    #[test]
    fn test_port_coercion_bounds() {
        assert_eq!(PortValue::Number(1).coerce().unwrap(), 1);
        assert_eq!(PortValue::Number(65535).coerce().unwrap(), 65535);
        assert!(PortValue::Number(0).coerce().is_err());
        assert!(PortValue::Number(70000).coerce().is_err());
        assert!(PortValue::Text("-1".into()).coerce().is_err());
    }

    #[test]
    fn test_get_returns_snapshot() {
        let store = store();
        let mut snapshot = store.get();
        snapshot.host = "mutated".into();
        assert_eq!(store.get().host, "mc.example.com");
    }

    #[test]
    fn test_config_update_json() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"host":"h","port":"25570","username":null}"#).unwrap();
        assert_eq!(update.host.as_deref(), Some("h"));
        assert_eq!(update.port, Some(PortValue::Text("25570".into())));
        assert_eq!(update.username, None);
    }

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.client.port, 25565);
        assert_eq!(settings.action.interval(), settings.action.hold_duration());
        assert_eq!(
            settings.action.reconnect_policy().initial_delay,
            Duration::from_secs(60)
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_document() {
        let json = r#"{
            "client": { "host": "play.example.net", "port": "25570", "username": "Walker" },
            "action": { "commands": ["forward", "jump"], "holdDuration": 1500, "retryDelay": 5000 }
        }"#;
        let settings: BotSettings = serde_json::from_str(json).unwrap();

        assert_eq!(
            settings.client,
            RuntimeConfig::new("play.example.net", 25570, "Walker")
        );
        assert_eq!(
            settings.action.commands,
            vec![ControlState::Forward, ControlState::Jump]
        );
        assert_eq!(settings.action.hold_duration(), Duration::from_millis(1500));
        assert_eq!(
            settings.action.reconnect_policy(),
            ReconnectPolicy {
                initial_delay: Duration::from_secs(60),
                retry_delay: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn test_overrides_win() {
        let overrides = SettingsOverrides {
            host: Some("env.example.net".into()),
            port: Some("25600".into()),
            username: Some(String::new()),
            retry_delay_ms: Some(1000),
            initial_retry_delay_ms: Some(2000),
        };
        let settings = BotSettings::load(None, &overrides).unwrap();

        assert_eq!(settings.client.host, "env.example.net");
        assert_eq!(settings.client.port, 25600);
        assert_eq!(settings.client.username, "AlterBot");
        assert_eq!(settings.action.retry_delay_ms, 1000);
        assert_eq!(settings.action.initial_retry_delay_ms, 2000);
    }

    #[test]
    fn test_override_bad_port() {
        let overrides = SettingsOverrides {
            port: Some("none".into()),
            ..Default::default()
        };
        assert!(BotSettings::load(None, &overrides).is_err());
    }

    #[test]
    fn test_validation_zero_hold() {
        let mut settings = BotSettings::default();
        settings.action.hold_duration_ms = 0;
        assert!(settings.validate().is_err());

        settings.action.hold_duration_ms = 100;
        settings.action.interval_ms = Some(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut settings = BotSettings::default();
        settings.client.host = "saved.example.net".into();
        settings.to_file(&path).unwrap();

        let loaded = BotSettings::from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BotSettings::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_example_document_is_valid() {
        let settings: BotSettings =
            serde_json::from_str(include_str!("../../../config.example.json")).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.action.interval(), Duration::from_secs(2));
        assert_eq!(settings.action.reconnect_policy().initial_delay, Duration::from_secs(60));
    }
}
