use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_initial_batch")]
    pub initial_batch: usize,
    #[serde(default = "default_reputation")]
    pub starting_reputation: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            initial_batch: default_initial_batch(),
            starting_reputation: default_reputation(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Simulated,
    Gamma,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub kind: FeedKind,
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::default(),
            base_url: default_feed_url(),
            request_timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_path(),
        }
    }
}

fn default_page_size() -> usize { 5 }
fn default_initial_batch() -> usize { 10 }
fn default_reputation() -> u32 { 1000 }
fn default_feed_url() -> String { "https://gamma-api.polymarket.com".to_string() }
fn default_timeout() -> u64 { 10 }
fn default_database_path() -> String { "swipe_predict.db".to_string() }
fn default_csv_path() -> String { "swipes.csv".to_string() }

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub market_feed_url: Option<String>,
    pub database_path: Option<String>,
    pub wallet_connected: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment values win over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.market_feed_url {
            self.feed.base_url = url.clone();
        }
        if let Some(path) = &env.database_path {
            self.storage.database_path = path.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            market_feed_url: std::env::var("MARKET_FEED_URL").ok(),
            database_path: std::env::var("DATABASE_PATH").ok(),
            wallet_connected: std::env::var("WALLET_CONNECTED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.session.page_size, 5);
        assert_eq!(config.session.initial_batch, 10);
        assert_eq!(config.session.starting_reputation, 1000);
        assert_eq!(config.feed.kind, FeedKind::Simulated);
        assert!(!config.storage.enabled);
        assert!(!config.monitoring.csv_logging);
        assert_eq!(config.monitoring.csv_log_path, "swipes.csv");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[session]
page_size = 3

[feed]
kind = "gamma"
base_url = "http://localhost:9000"

[storage]
enabled = true
database_path = "test.db"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.session.page_size, 3);
        assert_eq!(config.feed.kind, FeedKind::Gamma);
        assert_eq!(config.feed.base_url, "http://localhost:9000");
        assert_eq!(config.feed.request_timeout_secs, 10);
        assert!(config.storage.enabled);
        assert_eq!(config.storage.database_path, "test.db");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::parse("").unwrap();
        let env = EnvConfig {
            market_feed_url: Some("http://feed".to_string()),
            database_path: None,
            wallet_connected: true,
        };
        config.apply_env(&env);
        assert_eq!(config.feed.base_url, "http://feed");
        assert_eq!(config.storage.database_path, "swipe_predict.db");
    }
}
