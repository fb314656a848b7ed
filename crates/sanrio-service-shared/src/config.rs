//! Service configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sanrio_lib::{RetryPolicy, DEFAULT_CHARACTER_INDEX, DEFAULT_ELASTICSEARCH_HOST};

use crate::event_log::{DEFAULT_LOGGER_NAME, DEFAULT_LOG_PATH};

/// Default HTTP listen port.
pub const DEFAULT_SERVICE_PORT: u16 = 8000;

/// Runtime settings for the characters service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Elasticsearch base URL.
    pub elasticsearch_host: String,
    /// Startup connectivity retry policy.
    pub retry: RetryPolicy,
    /// Index holding character documents.
    pub index: String,
    /// Event log file.
    pub log_path: PathBuf,
    /// Value of the `logger` key in every event.
    pub logger_name: String,
    /// Optional upper bound on the search page size; `None` means uncapped.
    pub max_page_size: Option<u32>,
    /// HTTP listen port.
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            elasticsearch_host: DEFAULT_ELASTICSEARCH_HOST.to_string(),
            retry: RetryPolicy::default(),
            index: DEFAULT_CHARACTER_INDEX.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            logger_name: DEFAULT_LOGGER_NAME.to_string(),
            max_page_size: None,
            port: DEFAULT_SERVICE_PORT,
        }
    }
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// - `ELASTICSEARCH_HOST` (default `http://elasticsearch:9200`)
    /// - `ELASTICSEARCH_RETRIES` (default 10)
    /// - `ELASTICSEARCH_RETRY_DELAY_SECS` (default 5)
    /// - `CHARACTER_INDEX` (default `sanrio_characters`)
    /// - `API_LOG_PATH` (default `/app/logs/api.log`)
    /// - `API_LOGGER_NAME` (default `sanrio_api`)
    /// - `SEARCH_MAX_PAGE_SIZE` (default unset)
    /// - `SERVICE_PORT` (default 8000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let attempts = parse_or(&lookup, "ELASTICSEARCH_RETRIES", defaults.retry.attempts);
        let delay_secs = parse_or(
            &lookup,
            "ELASTICSEARCH_RETRY_DELAY_SECS",
            defaults.retry.delay.as_secs(),
        );

        Self {
            elasticsearch_host: lookup("ELASTICSEARCH_HOST")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.elasticsearch_host),
            retry: RetryPolicy::new(attempts.max(1), Duration::from_secs(delay_secs)),
            index: lookup("CHARACTER_INDEX")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.index),
            log_path: lookup("API_LOG_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.log_path),
            logger_name: lookup("API_LOGGER_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.logger_name),
            max_page_size: parse_optional(&lookup, "SEARCH_MAX_PAGE_SIZE"),
            port: parse_or(&lookup, "SERVICE_PORT", defaults.port),
        }
    }
}

fn parse_optional<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key).filter(|v| !v.trim().is_empty())?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    parse_optional(lookup, key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.elasticsearch_host, "http://elasticsearch:9200");
        assert_eq!(config.index, "sanrio_characters");
        assert_eq!(config.retry.attempts, 10);
        assert!(config.max_page_size.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ELASTICSEARCH_HOST", "http://localhost:9200"),
            ("ELASTICSEARCH_RETRIES", "3"),
            ("ELASTICSEARCH_RETRY_DELAY_SECS", "1"),
            ("CHARACTER_INDEX", "test_characters"),
            ("API_LOG_PATH", "/tmp/api.log"),
            ("SEARCH_MAX_PAGE_SIZE", "100"),
            ("SERVICE_PORT", "9000"),
        ]));

        assert_eq!(config.elasticsearch_host, "http://localhost:9200");
        assert_eq!(config.retry, RetryPolicy::new(3, Duration::from_secs(1)));
        assert_eq!(config.index, "test_characters");
        assert_eq!(config.log_path, PathBuf::from("/tmp/api.log"));
        assert_eq!(config.max_page_size, Some(100));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_unparseable_falls_back() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ELASTICSEARCH_RETRIES", "many"),
            ("SEARCH_MAX_PAGE_SIZE", "-1"),
        ]));
        assert_eq!(config.retry.attempts, 10);
        assert!(config.max_page_size.is_none());
    }
}
