//! Application configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use xrate_bus::Dispatch;
use xrate_common::{constants, CurrencyPair, EmailAddress, ProviderConfig};
use xrate_rate::ProviderKind;

/// Configuration problems found by [`AppConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data directory cannot be empty")]
    EmptyDataDir,

    #[error("{0} cannot be zero")]
    ZeroTimeout(&'static str),

    #[error("HTTP timeout cannot exceed request timeout")]
    HttpTimeoutTooLong,

    #[error("no rate provider has an endpoint")]
    NoProviders,

    #[error("invalid sender address: {0}")]
    InvalidMailFrom(String),

    #[error("invalid default topic: {0}")]
    InvalidTopic(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Endpoint settings of one upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub kind: ProviderKind,
    pub config: ProviderConfig,
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory of the subscription store.
    pub data_dir: PathBuf,
    /// Deadline of one request over the event bus.
    pub request_timeout: Duration,
    /// Timeout of one outbound provider call.
    pub http_timeout: Duration,
    pub dispatch: Dispatch,
    /// Retries per provider on retryable errors.
    pub retry_max: u32,
    /// Sender of notification e-mails.
    pub mail_from: Option<String>,
    /// Topic used when a command does not name one.
    pub default_topic: CurrencyPair,
    /// Providers in chain order.
    pub providers: Vec<ProviderEntry>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            request_timeout: constants::request_timeout(),
            http_timeout: constants::http_timeout(),
            dispatch: Dispatch::default(),
            retry_max: 0,
            mail_from: None,
            default_topic: CurrencyPair::new("BTC", "UAH"),
            providers: ProviderKind::ALL
                .iter()
                .map(|kind| ProviderEntry {
                    kind: *kind,
                    config: kind.default_config(),
                })
                .collect(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("XRATE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "XRATE_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "XRATE_HTTP_TIMEOUT_MS") {
            config.http_timeout = Duration::from_millis(ms);
        }

        if let Some(dispatch) = parse_var::<Dispatch>(&lookup, "XRATE_DISPATCH") {
            config.dispatch = dispatch;
        }

        if let Some(retries) = parse_var::<u32>(&lookup, "XRATE_RETRY_MAX") {
            config.retry_max = retries;
        }

        if let Some(from) = lookup("XRATE_MAIL_FROM").filter(|s| !s.trim().is_empty()) {
            config.mail_from = Some(from);
        }

        if let Some(topic) = parse_var::<CurrencyPair>(&lookup, "XRATE_TOPIC") {
            config.default_topic = topic;
        }

        for entry in &mut config.providers {
            let prefix = format!("XRATE_{}", entry.kind.name().to_ascii_uppercase());

            if let Some(endpoint) = lookup(&format!("{prefix}_ENDPOINT")) {
                entry.config.endpoint = endpoint;
            }
            if let Some(header) = lookup(&format!("{prefix}_HEADER")) {
                entry.config.header = header;
            }
            if let Some(key) = lookup(&format!("{prefix}_KEY")) {
                entry.config.key = key;
            }
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = parse_var::<LogFormat>(&lookup, "XRATE_LOG_FORMAT") {
            config.log_format = format;
        }

        config
    }

    /// Providers with an endpoint, in chain order.
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.providers.iter().filter(|p| p.config.is_enabled())
    }

    /// Parsed sender address, if configured.
    pub fn mail_from_address(&self) -> Result<Option<EmailAddress>, ConfigError> {
        self.mail_from
            .as_deref()
            .map(|from| {
                EmailAddress::parse(from).map_err(|_| ConfigError::InvalidMailFrom(from.to_string()))
            })
            .transpose()
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("request timeout"));
        }

        if self.http_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("HTTP timeout"));
        }

        if self.http_timeout > self.request_timeout {
            return Err(ConfigError::HttpTimeoutTooLong);
        }

        if self.enabled_providers().next().is_none() {
            return Err(ConfigError::NoProviders);
        }

        if !self.default_topic.is_valid() {
            return Err(ConfigError::InvalidTopic(self.default_topic.to_string()));
        }

        self.mail_from_address()?;

        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = name, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.providers.len(), 5);
        assert_eq!(config.providers[0].kind, ProviderKind::ExchangeRateHost);
    }

    #[test]
    fn test_from_lookup() {
        let config = AppConfig::from_lookup(lookup(&[
            ("XRATE_DATA_DIR", "/var/lib/xrate"),
            ("XRATE_REQUEST_TIMEOUT_MS", "2000"),
            ("XRATE_HTTP_TIMEOUT_MS", "500"),
            ("XRATE_DISPATCH", "concurrent"),
            ("XRATE_RETRY_MAX", "2"),
            ("XRATE_TOPIC", "usd/uah"),
            ("XRATE_NINJAS_KEY", "secret"),
            ("XRATE_COINYEP_ENDPOINT", ""),
            ("XRATE_LOG_FORMAT", "json"),
        ]));

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/xrate"));
        assert_eq!(config.request_timeout, Duration::from_millis(2000));
        assert_eq!(config.http_timeout, Duration::from_millis(500));
        assert_eq!(config.dispatch, Dispatch::Concurrent);
        assert_eq!(config.retry_max, 2);
        assert_eq!(config.default_topic, CurrencyPair::new("USD", "UAH"));
        assert_eq!(config.log_format, LogFormat::Json);

        let ninjas = &config.providers[1];
        assert_eq!(ninjas.kind, ProviderKind::Ninjas);
        assert_eq!(ninjas.config.credentials(), Some(("X-Api-Key", "secret")));

        let enabled: Vec<_> = config.enabled_providers().map(|p| p.kind).collect();
        assert!(!enabled.contains(&ProviderKind::CoinYep));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("XRATE_REQUEST_TIMEOUT_MS", "soon")]));
        assert_eq!(config.request_timeout, constants::request_timeout());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.http_timeout = Duration::from_secs(30);
        assert_eq!(config.validate(), Err(ConfigError::HttpTimeoutTooLong));

        let mut config = AppConfig::default();
        for entry in &mut config.providers {
            entry.config.endpoint.clear();
        }
        assert_eq!(config.validate(), Err(ConfigError::NoProviders));

        let mut config = AppConfig::default();
        config.mail_from = Some("not an address".into());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMailFrom(_))));
    }
}
