//! Configuration management for hashward.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted for the reputation API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["HASHWARD_API_KEY", "VIRUSTOTAL_API_KEY"];

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory traversal settings
    pub scan: ScanConfig,
    /// Classification settings
    pub detection: DetectionConfig,
    /// External reputation service settings
    pub reputation: ReputationConfig,
    /// Quarantine settings
    pub quarantine: QuarantineConfig,
    /// Monitor mode settings
    pub monitor: MonitorConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryAccess {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path, contents).map_err(Error::from)
    }

    /// Load configuration from `path` (or the default location), falling back
    /// to defaults when the file is absent or unreadable. Environment
    /// overrides are applied afterwards.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let (config, error) = Self::load_with_fallback(path);
        if let Some(e) = error {
            log::warn!("Failed to load config, using defaults: {}", e);
        }
        config
    }

    /// Like [`Config::load_or_default`], but hands back the load error
    /// instead of logging it, for callers that set up logging afterwards.
    pub fn load_with_fallback(path: Option<&Path>) -> (Self, Option<Error>) {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let (mut config, error) = if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            }
        } else {
            (Self::default(), None)
        };

        config.apply_env();
        (config, error)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        if let Some(key) = key {
            self.reputation.api_key = Some(key.trim().to_string());
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hashward")
            .join("config.json")
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.reputation.timeout_secs == 0 {
            return Err(Error::config_invalid(
                "reputation.timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.monitor.queue_capacity == 0 {
            return Err(Error::config_invalid(
                "monitor.queue_capacity",
                "Must be greater than 0",
            ));
        }

        if self.detection.heuristic_window_secs == 0 {
            return Err(Error::config_invalid(
                "detection.heuristic_window_secs",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Directory traversal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Path fragments to exclude from scanning
    pub exclude_paths: Vec<String>,
}

/// Classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Additional JSON signature file to load
    pub signature_file: Option<PathBuf>,
    /// Include the built-in EICAR test signature
    pub include_test_signature: bool,
    /// Extensions (without dot) considered risky by the heuristic
    pub suspicious_extensions: Vec<String>,
    /// How recently a file must have been created to be flagged (seconds)
    pub heuristic_window_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            signature_file: None,
            include_test_signature: true,
            suspicious_extensions: ["exe", "dll", "bat", "cmd", "ps1", "vbs", "js", "scr"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            heuristic_window_secs: 3600,
        }
    }
}

/// Reputation service configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// API key; absent disables the reputation tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the service
    pub base_url: String,
    /// Upper bound on a single lookup (seconds)
    pub timeout_secs: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ReputationConfig {
    /// Whether a usable API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

impl std::fmt::Debug for ReputationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Quarantine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    /// Quarantine root directory
    pub dir: PathBuf,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("quarantine"),
        }
    }
}

/// Monitor mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Capacity of the queue between the watcher and the engine
    pub queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Append-only log file; `None` logs to the console only
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("hashward.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.reputation.is_enabled());
        assert_eq!(config.quarantine.dir, PathBuf::from("quarantine"));
        assert_eq!(config.detection.heuristic_window_secs, 3600);
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let mut config = Config::default();
        config.monitor.queue_capacity = 8;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.monitor.queue_capacity, 8);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "quarantine": { "dir": "/var/vault" } }"#).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.quarantine.dir, PathBuf::from("/var/vault"));
        assert_eq!(loaded.reputation.timeout_secs, 10);
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load(&path).is_err());
        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.monitor.queue_capacity, 256);

        let (config, error) = Config::load_with_fallback(Some(&path));
        assert_eq!(config.monitor.queue_capacity, 256);
        assert!(matches!(error, Some(Error::ConfigLoad(_))));
    }

    #[test]
    fn test_missing_config_is_silent_default() {
        let dir = tempdir().unwrap();
        let (config, error) = Config::load_with_fallback(Some(&dir.path().join("absent.json")));
        assert!(error.is_none());
        assert_eq!(config.quarantine.dir, PathBuf::from("quarantine"));
    }

    #[test]
    fn test_env_api_key() {
        let mut config = Config::default();
        config.apply_env_from(|name| match name {
            "HASHWARD_API_KEY" => Some("   ".to_string()),
            "VIRUSTOTAL_API_KEY" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.reputation.api_key.as_deref(), Some("secret"));
        assert!(config.reputation.is_enabled());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let mut config = Config::default();
        config.reputation.api_key = Some("top-secret".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = Config::default();
        config.reputation.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitor.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
