//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub track: TrackConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Keywords to search for
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// The bot's own author identifier on the platform
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    #[serde(default = "default_publish_base_url")]
    pub publish_base_url: String,

    /// Env var holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_delay_base_secs")]
    pub delay_base_secs: u64,

    #[serde(default = "default_delay_jitter")]
    pub delay_jitter: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

// Default value functions
fn default_history_path() -> PathBuf {
    PathBuf::from("./relay_history.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_search_base_url() -> String {
    "https://search.twitter.com".to_string()
}

fn default_publish_base_url() -> String {
    "https://api.twitter.com/1.1".to_string()
}

fn default_token_env() -> String {
    "RELAY_API_TOKEN".to_string()
}

fn default_max_chars() -> usize {
    140
}

fn default_page_size() -> u32 {
    100
}

fn default_delay_base_secs() -> u64 {
    2
}

fn default_delay_jitter() -> u32 {
    6
}

fn default_poll_interval() -> u64 {
    300
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            log_level: default_log_level(),
            dry_run: default_true(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            search_base_url: default_search_base_url(),
            publish_base_url: default_publish_base_url(),
            token_env: default_token_env(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            page_size: default_page_size(),
            delay_base_secs: default_delay_base_secs(),
            delay_jitter: default_delay_jitter(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("KEYWORD_RELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check the preconditions the relay core assumes
    pub fn validate(&self) -> Result<()> {
        if self.track.keywords.is_empty() {
            anyhow::bail!("No keywords configured; set [track] keywords in the config file");
        }

        if self.bot.user_id.trim().is_empty() {
            anyhow::bail!("No bot user id configured; set [bot] user_id in the config file");
        }

        Ok(())
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r##"# keyword-relay configuration

[general]
history_path = "./relay_history.json"
log_level = "info"
dry_run = true

[track]
keywords = ["#civicmedia", "civic paths"]

[bot]
# The bot's own user id, used to skip its own posts
user_id = ""

[api]
search_base_url = "https://search.twitter.com"
publish_base_url = "https://api.twitter.com/1.1"
token_env = "RELAY_API_TOKEN"

[relay]
max_chars = 140
page_size = 100
# Pause delay_base_secs * random(1..=delay_jitter) between publishes
delay_base_secs = 2
delay_jitter = 6
# Used with `run --watch`
poll_interval_secs = 300
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_toml_parses_back_into_config() {
        let config: AppConfig = toml_from_str(&AppConfig::example_toml());

        assert_eq!(config.relay.max_chars, 140);
        assert_eq!(config.track.keywords.len(), 2);
        assert!(config.general.dry_run);
    }

    fn toml_from_str(raw: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .expect("build config")
            .try_deserialize()
            .expect("deserialize config")
    }

    #[test]
    fn validate_rejects_empty_keywords() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        let mut config = AppConfig::default();
        config.track.keywords = vec!["civic".to_string()];
        config.bot.user_id = "42".to_string();

        assert!(config.validate().is_ok());
    }
}
