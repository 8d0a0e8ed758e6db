use std::time::Duration;

use anyhow::{Context, Result};

use crate::fetch::source::DEFAULT_BASE_URL;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE_PATH: &str = "logs/bus_dashboards.log";

/// Runtime settings read from the environment (after `.env` is loaded).
///
/// | variable             | default                    |
/// |----------------------|----------------------------|
/// | `SOCRATA_APP_TOKEN`  | unset (anonymous requests) |
/// | `SOCRATA_BASE_URL`   | `https://data.ny.gov`      |
/// | `FETCH_TIMEOUT_SECS` | `30`                       |
/// | `LOG_FILE_PATH`      | `logs/bus_dashboards.log`  |
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub app_token: Option<String>,
    pub base_url: String,
    pub fetch_timeout: Duration,
    pub log_file_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let fetch_timeout = get("FETCH_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("FETCH_TIMEOUT_SECS must be whole seconds: {raw:?}"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        Ok(Self {
            app_token: get("SOCRATA_APP_TOKEN"),
            base_url: get("SOCRATA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            fetch_timeout: Duration::from_secs(fetch_timeout),
            log_file_path: get("LOG_FILE_PATH")
                .unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string()),
        })
    }
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
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.app_token, None);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.log_file_path, DEFAULT_LOG_FILE_PATH);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SOCRATA_APP_TOKEN", "abc123"),
            ("FETCH_TIMEOUT_SECS", " 5 "),
            ("LOG_FILE_PATH", "/tmp/dash.log"),
        ]))
        .unwrap();
        assert_eq!(config.app_token.as_deref(), Some("abc123"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.log_file_path, "/tmp/dash.log");
    }

    #[test]
    fn test_empty_token_is_unset() {
        let env = lookup(&[("SOCRATA_APP_TOKEN", "  ")]);
        let config = AppConfig::from_lookup(env).unwrap();
        assert_eq!(config.app_token, None);
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let env = lookup(&[("FETCH_TIMEOUT_SECS", "soon")]);
        let err = AppConfig::from_lookup(env).unwrap_err();
        assert!(err.to_string().contains("FETCH_TIMEOUT_SECS"));
    }
}
