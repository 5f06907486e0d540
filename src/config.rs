//! Relay configuration.
//!
//! Settings are layered: built-in defaults, then `.kanban/relay.toml` (or the
//! file given with `--config`), then environment variables, then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3001
//! dev_mode = false
//!
//! [board]
//! seed_demo = true
//!
//! [broadcast]
//! capacity = 256
//!
//! [websocket]
//! ping_interval_secs = 30
//! pong_timeout_secs = 60
//!
//! [logging]
//! format = "pretty"
//! file = ".kanban/relay.log"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::relay::ws::Keepalive;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".kanban/relay.toml";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a browser UI served from another origin
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

/// Initial board contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSection {
    /// Start with the three-column demo board instead of an empty one
    #[serde(default = "default_seed_demo")]
    pub seed_demo: bool,
}

fn default_seed_demo() -> bool {
    true
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            seed_demo: default_seed_demo(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastSection {
    /// Frames buffered per subscriber before a slow client starts skipping
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    256
}

impl Default for BroadcastSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketSection {
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_pong_timeout_secs() -> u64 {
    60
}

impl Default for WebSocketSection {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// Also append logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// The complete relay.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub broadcast: BroadcastSection,
    #[serde(default)]
    pub websocket: WebSocketSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse relay.toml")
    }

    /// Load an explicitly requested file, or the default location if it
    /// exists, or fall back to built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// `PORT` is honored for compatibility with hosting platforms that
    /// assign the port that way.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(host) = lookup("KANBAN_HOST") {
            self.server.host = host;
        }
        if let Some(format) = lookup("KANBAN_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.broadcast.capacity == 0 {
            anyhow::bail!("broadcast.capacity must be greater than zero");
        }
        if self.websocket.ping_interval_secs == 0 {
            anyhow::bail!("websocket.ping_interval_secs must be greater than zero");
        }
        if self.websocket.pong_timeout_secs <= self.websocket.ping_interval_secs {
            anyhow::bail!(
                "websocket.pong_timeout_secs ({}) must exceed ping_interval_secs ({})",
                self.websocket.pong_timeout_secs,
                self.websocket.ping_interval_secs
            );
        }
        Ok(())
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            ping_interval: Duration::from_secs(self.websocket.ping_interval_secs),
            pong_timeout: Duration::from_secs(self.websocket.pong_timeout_secs),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize relay.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.board.seed_demo);
        assert_eq!(config.broadcast.capacity, 256);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.keepalive(), Keepalive::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = RelayConfig::parse(
            r#"
[server]
port = 8080

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.websocket.pong_timeout_secs, 60);
    }

    #[test]
    fn test_parse_rejects_unknown_log_format() {
        assert!(RelayConfig::parse("[logging]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[board]\nseed_demo = false\n").unwrap();

        let config = RelayConfig::load_or_default(Some(&path)).unwrap();
        assert!(!config.board.seed_demo);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = RelayConfig::load_or_default(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RelayConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "4000"),
                ("KANBAN_HOST", "0.0.0.0"),
                ("KANBAN_LOG_FORMAT", "JSON"),
            ]))
            .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:4000");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_invalid_port() {
        let mut config = RelayConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid PORT value"));
    }

    #[test]
    fn test_validate_rejects_bad_keepalive() {
        let mut config = RelayConfig::default();
        config.websocket.pong_timeout_secs = 30;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.broadcast.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_effective_config() {
        let mut config = RelayConfig::default();
        config.server.dev_mode = true;
        config.logging.file = Some(PathBuf::from("relay.log"));
        let text = config.to_toml().unwrap();
        assert!(text.contains("[server]"));
        assert_eq!(RelayConfig::parse(&text).unwrap(), config);
    }
}
