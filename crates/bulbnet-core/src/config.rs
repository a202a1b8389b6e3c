//! Discovery configuration.
//!
//! Stored as a JSON file. Every field has a default, so a partial file (or no
//! file at all) is valid.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::ConfigError;

/// UDP port devices listen on for discovery probes.
pub const DEVICE_PORT: u16 = 56700;

/// Devices silent for longer than this are considered lost.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

const CONFIG_FILE_NAME: &str = "discovery.json";

/// Tunables for the discovery loop and its transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscoveryConfig {
    /// Destination port for probes.
    pub device_port: u16,
    /// Local port to bind; 0 picks an ephemeral port.
    pub bind_port: u16,
    /// Delay before the first probe of a session.
    pub settle_delay_ms: u64,
    /// Time between probe cycles.
    pub probe_interval_ms: u64,
    /// Silence after which a device is evicted.
    pub stale_after_secs: u64,
    /// Per-send timeout applied by the transport.
    pub send_timeout_ms: u64,
    /// Fixed probe targets. When unset, targets are derived from local interfaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_targets: Option<Vec<Ipv4Addr>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            device_port: DEVICE_PORT,
            bind_port: 0,
            settle_delay_ms: 200,
            probe_interval_ms: 5_000,
            stale_after_secs: DEFAULT_STALE_AFTER.as_secs(),
            send_timeout_ms: 1_000,
            broadcast_targets: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Reject values that would stall or spin the discovery loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_port == 0 {
            return Err(invalid("devicePort", "must not be 0"));
        }
        if self.probe_interval_ms == 0 {
            return Err(invalid("probeIntervalMs", "must be greater than zero"));
        }
        if self.stale_after_secs == 0 {
            return Err(invalid("staleAfterSecs", "must be greater than zero"));
        }
        if self.send_timeout_ms == 0 {
            return Err(invalid("sendTimeoutMs", "must be greater than zero"));
        }
        if matches!(&self.broadcast_targets, Some(targets) if targets.is_empty()) {
            return Err(invalid("broadcastTargets", "must list at least one address"));
        }
        Ok(())
    }

    /// Read and validate a config file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path).await;
        }

        match default_config_path() {
            Some(path) if fs::try_exists(&path).await.unwrap_or(false) => {
                tracing::debug!(path = %path.display(), "loading default config");
                Self::load(&path).await
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Platform config file location, e.g. `~/.config/bulbnet/discovery.json`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "bulbnet", "bulbnet")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiscoveryConfig::default();

        assert_eq!(config.device_port, 56700);
        assert_eq!(config.probe_interval(), Duration::from_secs(5));
        assert_eq!(config.stale_after(), Duration::from_secs(300));
        assert_eq!(config.settle_delay(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DiscoveryConfig =
            serde_json::from_str(r#"{"probeIntervalMs": 1000, "broadcastTargets": ["10.0.0.255"]}"#)
                .unwrap();

        assert_eq!(config.probe_interval_ms, 1000);
        assert_eq!(config.device_port, DEVICE_PORT);
        assert_eq!(
            config.broadcast_targets,
            Some(vec![Ipv4Addr::new(10, 0, 0, 255)])
        );
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = DiscoveryConfig {
            probe_interval_ms: 0,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("probeIntervalMs"));
    }

    #[test]
    fn test_validate_rejects_empty_target_list() {
        let config = DiscoveryConfig {
            broadcast_targets: Some(Vec::new()),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("discovery.json");

        let config = DiscoveryConfig {
            stale_after_secs: 120,
            broadcast_targets: Some(vec![Ipv4Addr::new(192, 168, 1, 255)]),
            ..Default::default()
        };
        config.save(&path).await.unwrap();

        let loaded = DiscoveryConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("discovery.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = DiscoveryConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = DiscoveryConfig::load(&temp_dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
