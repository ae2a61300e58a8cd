//! Configuration loading and persistence.
//!
//! Precedence, lowest first: built-in defaults, `config.json` in the config
//! directory, `GODOT_MCP_*` environment variables, command-line flags (applied
//! by the binary).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_GODOT_URL};

/// Configuration for the bridge.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// WebSocket URL of the Godot editor plugin.
    pub godot_url: String,
    /// Seconds to wait for the editor connection to come up.
    pub connect_timeout_secs: u64,
    /// Write logs here instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Run without an editor; every editor call fails.
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            godot_url: DEFAULT_GODOT_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_file: None,
            offline: false,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `GODOT_MCP_CONFIG_DIR` overrides the platform config dir
    /// (`~/.config/godot-mcp` on Linux).
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("GODOT_MCP_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("godot-mcp")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_dir(&Self::config_dir()?)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `config.json` from `dir`; defaults when the file does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))
    }

    /// Apply `GODOT_MCP_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers and booleans are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("GODOT_MCP_URL") {
            self.godot_url = url;
        }

        if let Some(timeout) = lookup("GODOT_MCP_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Some(log_file) = lookup("GODOT_MCP_LOG_FILE") {
            self.log_file = (!log_file.is_empty()).then(|| PathBuf::from(log_file));
        }

        if let Some(offline) = lookup("GODOT_MCP_OFFLINE") {
            match offline.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.offline = true,
                "0" | "false" | "no" => self.offline = false,
                _ => {}
            }
        }
    }

    /// Apply command-line flags, which win over everything else.
    pub fn apply_cli_overrides(&mut self, url: Option<&str>, offline: bool) {
        if let Some(url) = url {
            self.godot_url = url.to_string();
        }
        if offline {
            self.offline = true;
        }
    }

    /// Current value of `key` as text.
    pub fn get(&self, key: &str) -> Result<String> {
        Ok(match key {
            "godot_url" => self.godot_url.clone(),
            "connect_timeout_secs" => self.connect_timeout_secs.to_string(),
            "log_file" => self
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "offline" => self.offline.to_string(),
            _ => bail!("Unknown config key '{key}'"),
        })
    }

    /// Set `key` from its text form. An empty `log_file` clears it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "godot_url" => self.godot_url = value.to_string(),
            "connect_timeout_secs" => {
                self.connect_timeout_secs = value
                    .parse()
                    .with_context(|| format!("connect_timeout_secs must be a whole number, got '{value}'"))?;
            }
            "log_file" => self.log_file = (!value.is_empty()).then(|| PathBuf::from(value)),
            "offline" => {
                self.offline = value
                    .parse()
                    .with_context(|| format!("offline must be true or false, got '{value}'"))?;
            }
            _ => bail!("Unknown config key '{key}'"),
        }
        Ok(())
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to_dir(&Self::config_dir()?)
    }

    /// Write `config.json` into `dir`.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        // Owner read/write only
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.godot_url, "ws://127.0.0.1:9080");
        assert_eq!(config.connect_timeout_secs, 5);
        assert!(!config.offline);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from_dir(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{"godot_url": "ws://10.0.0.2:9080"}"#).unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.godot_url, "ws://10.0.0.2:9080");
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            godot_url: "ws://editor:9999".into(),
            connect_timeout_secs: 12,
            log_file: Some(PathBuf::from("/tmp/godot-mcp.log")),
            offline: true,
        };
        config.save_to_dir(dir.path()).unwrap();
        assert_eq!(Config::load_from_dir(dir.path()).unwrap(), config);

        #[cfg(unix)]
        {
            let mode = fs::metadata(dir.path().join("config.json"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_precedence_defaults_file_env_cli() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"godot_url": "ws://from-file:1", "connect_timeout_secs": 9}"#,
        )
        .unwrap();

        let mut config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.godot_url, "ws://from-file:1");

        config.apply_env_overrides(env(&[
            ("GODOT_MCP_URL", "ws://from-env:2"),
            ("GODOT_MCP_OFFLINE", "yes"),
        ]));
        assert_eq!(config.godot_url, "ws://from-env:2");
        assert_eq!(config.connect_timeout_secs, 9);
        assert!(config.offline);

        config.apply_cli_overrides(Some("ws://from-cli:3"), false);
        assert_eq!(config.godot_url, "ws://from-cli:3");
        assert!(config.offline);
    }

    #[test]
    fn test_set_then_get_each_key() {
        let mut config = Config::default();
        config.set("godot_url", "ws://10.0.0.5:9080").unwrap();
        config.set("connect_timeout_secs", "20").unwrap();
        config.set("log_file", "/tmp/bridge.log").unwrap();
        config.set("offline", "true").unwrap();

        assert_eq!(config.get("godot_url").unwrap(), "ws://10.0.0.5:9080");
        assert_eq!(config.get("connect_timeout_secs").unwrap(), "20");
        assert_eq!(config.get("log_file").unwrap(), "/tmp/bridge.log");
        assert_eq!(config.get("offline").unwrap(), "true");

        config.set("log_file", "").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(config.set("server_url", "x").is_err());
        assert!(config.set("connect_timeout_secs", "soon").is_err());
        assert!(config.set("offline", "maybe").is_err());
        assert!(config.get("server_url").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("GODOT_MCP_CONNECT_TIMEOUT", "soon"),
            ("GODOT_MCP_OFFLINE", "maybe"),
        ]));
        assert_eq!(config, Config::default());

        config.apply_env_overrides(env(&[
            ("GODOT_MCP_CONNECT_TIMEOUT", "30"),
            ("GODOT_MCP_LOG_FILE", "/var/log/godot-mcp.log"),
        ]));
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/godot-mcp.log")));
    }
}
