//! Configuration file handling for chat-cli

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chat_client::SessionConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://localhost:8080";

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default server URL
    pub server: Option<String>,
    /// Path questions are posted to
    pub chat_path: Option<String>,
    /// Route whose reveal strategy is used
    pub route: Option<String>,
    /// Delay between typed steps, in milliseconds
    pub typing_interval_ms: Option<u64>,
    /// Delay before the second connection status check, in seconds
    pub liveness_delay_secs: Option<u64>,
    /// How long error notices stay up, in seconds
    pub notice_delay_secs: Option<u64>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("chat-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        server: Option<&str>,
        route: Option<&str>,
        no_color: bool,
    ) -> MergedConfig {
        let defaults = SessionConfig::default();
        let mut session = SessionConfig {
            chat_path: self.chat_path.clone().unwrap_or(defaults.chat_path),
            route: defaults.route,
            typing_interval: self
                .typing_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.typing_interval),
            liveness_delay: self
                .liveness_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.liveness_delay),
            notice_ttl: self
                .notice_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.notice_ttl),
        };
        if let Some(route) = route.map(String::from).or_else(|| self.route.clone()) {
            session.route = route;
        }

        MergedConfig {
            server: server
                .map(String::from)
                .or_else(|| self.server.clone())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            no_color: no_color || self.no_color.unwrap_or(false),
            session,
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub server: String,
    pub no_color: bool,
    pub session: SessionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::RevealStrategy;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server = "http://chat.local:9000"
route = "/aidb"
typing_interval_ms = 20
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.as_deref(), Some("http://chat.local:9000"));
        assert_eq!(config.typing_interval_ms, Some(20));
        assert!(config.chat_path.is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = [").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_args_override_file() {
        let config = Config {
            server: Some("http://from-file".into()),
            route: Some("/aidb".into()),
            typing_interval_ms: Some(20),
            ..Default::default()
        };

        let merged = config.merge_with_args(Some("http://from-args"), None, false);
        assert_eq!(merged.server, "http://from-args");
        assert_eq!(merged.session.route, "/aidb");
        assert_eq!(merged.session.strategy(), RevealStrategy::Chunked);
        assert_eq!(merged.session.typing_interval, Duration::from_millis(20));
        assert_eq!(merged.session.chat_path, "/chatgpt");

        let merged = config.merge_with_args(None, Some("/ai"), true);
        assert_eq!(merged.server, "http://from-file");
        assert_eq!(merged.session.strategy(), RevealStrategy::Typewriter);
        assert!(merged.no_color);
    }

    #[test]
    fn test_defaults_without_file() {
        let merged = Config::default().merge_with_args(None, None, false);
        assert_eq!(merged.server, "http://localhost:8080");
        assert_eq!(merged.session.route, "/ai");
        assert_eq!(merged.session.notice_ttl, Duration::from_secs(3));
    }
}
