use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::{PrinterError, Result};
use crate::signing::ApiCredentials;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Wait between decision cycles in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Log orders instead of sending them
    #[serde(default)]
    pub dry_run: bool,
    /// Attach kline history to the advice prompt
    #[serde(default)]
    pub include_history: bool,
    /// Kline interval, e.g. "15m"
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,
    /// Klines per symbol (max 1000)
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u16,
}

fn default_interval_secs() -> u64 {
    1800
}

fn default_kline_interval() -> String {
    "15m".to_string()
}

fn default_kline_limit() -> u16 {
    100
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            dry_run: false,
            include_history: false,
            kline_interval: default_kline_interval(),
            kline_limit: default_kline_limit(),
        }
    }
}

impl TradingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// REST API endpoint
    #[serde(default = "default_venue_url")]
    pub rest_url: String,
    /// Validity window for signed requests
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
    #[serde(default = "default_venue_timeout")]
    pub timeout_secs: u64,
}

fn default_venue_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

fn default_venue_timeout() -> u64 {
    10
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            rest_url: default_venue_url(),
            recv_window_ms: default_recv_window(),
            timeout_secs: default_venue_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Chat completions base URL
    #[serde(default = "default_advisor_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_advisor_timeout")]
    pub timeout_secs: u64,
}

fn default_advisor_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_advisor_timeout() -> u64 {
    60
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            base_url: default_advisor_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_advisor_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_url")]
    pub base_url: String,
    /// Headlines kept per symbol
    #[serde(default = "default_max_headlines")]
    pub max_headlines: usize,
    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,
}

fn default_news_url() -> String {
    "https://newsapi.org/v2".to_string()
}

fn default_max_headlines() -> usize {
    3
}

fn default_news_timeout() -> u64 {
    10
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_news_url(),
            max_headlines: default_max_headlines(),
            timeout_secs: default_news_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory of the append-only log file
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file() -> String {
    "trades.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: default_log_dir(),
            file_name: default_log_file(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PRINTER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PRINTER__TRADING__DRY_RUN, etc.)
            .add_source(
                Environment::with_prefix("PRINTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.trading.interval_secs == 0 {
            errors.push("trading.interval_secs must be positive".to_string());
        }

        if self.trading.include_history
            && (self.trading.kline_limit == 0 || self.trading.kline_limit > 1000)
        {
            errors.push("trading.kline_limit must be between 1 and 1000".to_string());
        }

        if !(0.0..=2.0).contains(&self.advisor.temperature) {
            errors.push("advisor.temperature must be between 0 and 2".to_string());
        }

        for (name, url) in [
            ("venue.rest_url", &self.venue.rest_url),
            ("advisor.base_url", &self.advisor.base_url),
            ("news.base_url", &self.news.base_url),
        ] {
            if url.trim().is_empty() {
                errors.push(format!("{} must not be empty", name));
            }
        }

        if self.news.max_headlines == 0 {
            errors.push("news.max_headlines must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Secrets read from the process environment, never from config files
pub struct Credentials {
    pub advisor_api_key: Zeroizing<String>,
    pub venue: ApiCredentials,
    /// Empty when news is disabled
    pub news_api_key: Zeroizing<String>,
}

impl Credentials {
    pub const ADVISOR_KEY_VAR: &'static str = "OPENAI_API_KEY";
    pub const VENUE_KEY_VAR: &'static str = "BINANCE_API_KEY";
    pub const VENUE_SECRET_VAR: &'static str = "BINANCE_API_SECRET";
    pub const NEWS_KEY_VAR: &'static str = "NEWSAPI_KEY";

    /// Load from environment variables. The advisor and venue keys are required.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PrinterError::MissingCredential(name.to_string()))
        };

        Ok(Self {
            advisor_api_key: Zeroizing::new(required(Self::ADVISOR_KEY_VAR)?),
            venue: ApiCredentials::new(
                required(Self::VENUE_KEY_VAR)?,
                required(Self::VENUE_SECRET_VAR)?,
            ),
            news_api_key: Zeroizing::new(std::env::var(Self::NEWS_KEY_VAR).unwrap_or_default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.trading.interval_secs, 1800);
        assert_eq!(config.advisor.model, "gpt-4o");
        assert_eq!(config.news.max_headlines, 3);
        assert_eq!(config.logging.file_name, "trades.log");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = AppConfig::default();
        config.trading.interval_secs = 0;
        config.advisor.temperature = 3.5;
        config.venue.rest_url = " ".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.venue.rest_url, "https://api.binance.com");
        assert_eq!(config.trading.kline_interval, "15m");
    }

    #[test]
    fn test_load_from_malformed_file_is_config_error() {
        let dir = std::env::temp_dir().join(format!("cryptoprinter-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("default.toml"), "[trading]\ninterval_secs = \"soon\"\n").unwrap();

        let result = AppConfig::load_from(&dir);

        assert!(matches!(result, Err(PrinterError::Config(_))), "{result:?}");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
