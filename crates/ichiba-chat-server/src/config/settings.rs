use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MarketplaceConfig {
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub affiliate_id: String,
    #[serde(default = "default_marketplace_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_hits")]
    pub hits: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// How many comment prompts may be in flight at once (1 = strictly sequential)
    #[serde(default = "default_comment_concurrency")]
    pub comment_concurrency: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "default_caption_max_chars")]
    pub caption_max_chars: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,  // pretty | json
    /// Daily rolling log files are written here when set
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_marketplace_endpoint() -> String {
    "https://app.rakuten.co.jp/services/api/IchibaItem/Search/20220601".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_hits() -> u32 {
    3
}

fn default_sort() -> String {
    "standard".to_string()
}

fn default_comment_concurrency() -> usize {
    1
}

fn default_title_max_chars() -> usize {
    30
}

fn default_caption_max_chars() -> usize {
    100
}

fn default_session_ttl() -> u64 {
    6 * 60 * 60
}

fn default_cleanup_interval() -> u64 {
    5 * 60
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            comment_concurrency: default_comment_concurrency(),
            title_max_chars: default_title_max_chars(),
            caption_max_chars: default_caption_max_chars(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            directory: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Credentials are fatal at startup: the server never runs half-configured.
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            bail!("gemini.api_key is not set (APP__GEMINI__API_KEY)");
        }
        if self.marketplace.application_id.trim().is_empty() {
            bail!("marketplace.application_id is not set (APP__MARKETPLACE__APPLICATION_ID)");
        }
        if self.marketplace.affiliate_id.trim().is_empty() {
            bail!("marketplace.affiliate_id is not set (APP__MARKETPLACE__AFFILIATE_ID)");
        }
        if self.marketplace.hits == 0 {
            bail!("marketplace.hits must be at least 1");
        }
        if self.chat.comment_concurrency == 0 {
            bail!("chat.comment_concurrency must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [gemini]
            api_key = "gm-key"

            [marketplace]
            application_id = "app-id"
            affiliate_id = "aff-id"
        "#;

        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let settings = sample();
        assert_eq!(settings.gemini.model, "gemini-2.5-flash");
        assert_eq!(settings.marketplace.hits, 3);
        assert_eq!(settings.marketplace.sort, "standard");
        assert_eq!(settings.chat.comment_concurrency, 1);
        assert_eq!(settings.chat.title_max_chars, 30);
        assert_eq!(settings.chat.caption_max_chars, 100);
        assert_eq!(settings.session.ttl_seconds, 21_600);
        assert_eq!(settings.logging.format, "pretty");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut settings = sample();
        settings.gemini.api_key = "  ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = sample();
        settings.marketplace.affiliate_id.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut settings = sample();
        settings.chat.comment_concurrency = 0;
        assert!(settings.validate().is_err());
    }
}
