//! Runtime configuration, read from environment variables.
//!
//! `main` loads a `.env` file first, so every setting below may live there.
//! Tests build a [`Config`] from a plain map through [`Config::from_lookup`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use aqi::Category;

use crate::error::{AerisError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openaq.org/v3";
const PLACEHOLDER_API_KEY: &str = "your_api_key_here";
const DATA_STORAGE_DIR: &str = "data_storage";

#[derive(Debug, Clone)]
pub struct OpenAqConfig {
    api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl OpenAqConfig {
    /// The configured API key. A missing key, or the placeholder from the
    /// sample `.env`, is a configuration error.
    pub fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() && key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(AerisError::Config(
                "OpenAQ API key not configured; get a free key at \
                 https://explore.openaq.org/register and set OPENAQ_API_KEY"
                    .to_string(),
            )),
        }
    }
}

impl Default for OpenAqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub retention_days: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// `None` disables the log file.
    pub log_file: Option<PathBuf>,
    /// Lowest category that raises an alert.
    pub alert_min_category: Category,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openaq: OpenAqConfig,
    pub database: DatabaseConfig,
    pub app: AppConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let retry_backoff: f64 = parse_or(&lookup, "OPENAQ_RETRY_BACKOFF", 1.0)?;
        if !retry_backoff.is_finite() || retry_backoff < 0.0 {
            return Err(AerisError::InvalidSetting {
                name: "OPENAQ_RETRY_BACKOFF",
                value: retry_backoff.to_string(),
            });
        }

        let openaq = OpenAqConfig {
            api_key: lookup("OPENAQ_API_KEY"),
            base_url: lookup("OPENAQ_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "OPENAQ_TIMEOUT", 10)?),
            max_retries: parse_or(&lookup, "OPENAQ_MAX_RETRIES", 3)?,
            retry_backoff: Duration::from_secs_f64(retry_backoff),
        };

        let database = DatabaseConfig {
            path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DATA_STORAGE_DIR).join("aeris.db")),
            retention_days: parse_or(&lookup, "RAW_DATA_RETENTION_DAYS", 90)?,
        };

        let alert_min_category = match lookup("ALERT_MIN_CATEGORY") {
            Some(level) => {
                Category::from_level(level.trim()).ok_or(AerisError::InvalidSetting {
                    name: "ALERT_MIN_CATEGORY",
                    value: level,
                })?
            }
            None => Category::UnhealthySensitive,
        };

        let log_file = match lookup("LOG_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DATA_STORAGE_DIR).join("aeris.log")),
        };

        let app = AppConfig {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_file,
            alert_min_category,
        };

        Ok(Self {
            openaq,
            database,
            app,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AerisError::InvalidSetting { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.openaq.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.openaq.timeout, Duration::from_secs(10));
        assert_eq!(config.openaq.max_retries, 3);
        assert_eq!(config.openaq.retry_backoff, Duration::from_secs(1));
        assert_eq!(config.database.path, PathBuf::from("data_storage/aeris.db"));
        assert_eq!(config.database.retention_days, 90);
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.app.log_file, Some(PathBuf::from("data_storage/aeris.log")));
        assert_eq!(config.app.alert_min_category, Category::UnhealthySensitive);
        assert!(config.openaq.api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OPENAQ_API_KEY", "abc123"),
            ("OPENAQ_API_BASE_URL", "http://localhost:8080/v3/"),
            ("OPENAQ_TIMEOUT", "5"),
            ("OPENAQ_MAX_RETRIES", "0"),
            ("OPENAQ_RETRY_BACKOFF", "0.25"),
            ("DATABASE_PATH", "/tmp/aeris-test.db"),
            ("RAW_DATA_RETENTION_DAYS", " 30 "),
            ("LOG_FILE", ""),
            ("ALERT_MIN_CATEGORY", "unhealthy"),
        ])
        .unwrap();
        assert_eq!(config.openaq.api_key().unwrap(), "abc123");
        assert_eq!(config.openaq.base_url, "http://localhost:8080/v3");
        assert_eq!(config.openaq.timeout, Duration::from_secs(5));
        assert_eq!(config.openaq.max_retries, 0);
        assert_eq!(config.openaq.retry_backoff, Duration::from_millis(250));
        assert_eq!(config.database.path, PathBuf::from("/tmp/aeris-test.db"));
        assert_eq!(config.database.retention_days, 30);
        assert_eq!(config.app.log_file, None);
        assert_eq!(config.app.alert_min_category, Category::Unhealthy);
    }

    #[test]
    fn test_placeholder_api_key_is_rejected() {
        let config = config_from(&[("OPENAQ_API_KEY", "your_api_key_here")]).unwrap();
        assert!(matches!(config.openaq.api_key(), Err(AerisError::Config(_))));
        let config = config_from(&[("OPENAQ_API_KEY", "   ")]).unwrap();
        assert!(config.openaq.api_key().is_err());
    }

    #[test]
    fn test_malformed_numbers_name_the_variable() {
        let err = config_from(&[("OPENAQ_TIMEOUT", "ten")]).unwrap_err();
        assert!(matches!(
            err,
            AerisError::InvalidSetting { name: "OPENAQ_TIMEOUT", .. }
        ));
        assert!(config_from(&[("OPENAQ_RETRY_BACKOFF", "-1")]).is_err());
        assert!(config_from(&[("ALERT_MIN_CATEGORY", "awful")]).is_err());
    }
}
