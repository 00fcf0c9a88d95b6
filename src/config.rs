//! Process configuration loaded from the environment.
//!
//! Everything the server needs at startup is read once here and handed to the
//! components through their constructors.

use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;
const DEFAULT_CACHE_TIMEOUT_MS: u64 = 500;
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_BODY_LIMIT_BYTES: usize = 5 * 1024;
const DEFAULT_RATE_LIMIT_MAX: u32 = 30;
const DEFAULT_RATE_LIMIT_WINDOW: &str = "1 minute";
const DEFAULT_FONT_DIR: &str = "./fonts";
const DEFAULT_TYPST_BIN: &str = "typst";
const DEFAULT_DOCUMENT_TITLE: &str = "pdfme";

lazy_static! {
    static ref DURATION_PATTERN: Regex = Regex::new(
        r"(?i)^\s*(\d+(?:\.\d+)?)\s*(ms|msecs?|milliseconds?|s|secs?|seconds?|m|mins?|minutes?|h|hrs?|hours?|d|days?)?\s*$"
    )
    .expect("duration pattern is a valid regex");
}

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("CACHE_TIMEOUT_MS ({cache_ms} ms) must be shorter than TEMPLATE_FETCH_TIMEOUT_SECS ({fetch_ms} ms)")]
    CacheTimeoutTooLong { cache_ms: u128, fetch_ms: u128 },
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Raw `API_KEYS` value; parsed into a credential set by the auth gate.
    pub api_keys: Vec<String>,
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub fetch_timeout: Duration,
    pub body_limit_bytes: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub font_dir: String,
    pub typst_bin: String,
    pub document_title: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_keys: Vec::new(),
            redis_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            cache_timeout: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: Duration::from_secs(60),
            font_dir: DEFAULT_FONT_DIR.to_string(),
            typst_bin: DEFAULT_TYPST_BIN.to_string(),
            document_title: DEFAULT_DOCUMENT_TITLE.to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let window = get("RATE_LIMIT_TIME_WINDOW")
            .unwrap_or_else(|| DEFAULT_RATE_LIMIT_WINDOW.to_string());
        let rate_limit_window = parse_duration(&window).ok_or(ConfigError::Invalid {
            name: "RATE_LIMIT_TIME_WINDOW",
            expected: "duration (e.g. '1 minute', '30s', '500')",
            value: window.clone(),
        })?;

        let config = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_number(get("PORT"), "PORT", defaults.port)?,
            api_keys: get("API_KEYS").map(|raw| split_list(&raw)).unwrap_or_default(),
            redis_url: get("REDIS_URL"),
            cache_ttl: Duration::from_secs(parse_number(
                get("TEMPLATE_CACHE_TTL"),
                "TEMPLATE_CACHE_TTL",
                DEFAULT_CACHE_TTL_SECONDS,
            )?),
            cache_timeout: Duration::from_millis(parse_number(
                get("CACHE_TIMEOUT_MS"),
                "CACHE_TIMEOUT_MS",
                DEFAULT_CACHE_TIMEOUT_MS,
            )?),
            fetch_timeout: Duration::from_secs(parse_number(
                get("TEMPLATE_FETCH_TIMEOUT_SECS"),
                "TEMPLATE_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECONDS,
            )?),
            body_limit_bytes: parse_number(
                get("BODY_LIMIT_BYTES"),
                "BODY_LIMIT_BYTES",
                DEFAULT_BODY_LIMIT_BYTES,
            )?,
            rate_limit_max: parse_number(
                get("RATE_LIMIT_MAX"),
                "RATE_LIMIT_MAX",
                DEFAULT_RATE_LIMIT_MAX,
            )?,
            rate_limit_window,
            font_dir: get("FONT_DIR").unwrap_or(defaults.font_dir),
            typst_bin: get("TYPST_BIN").unwrap_or(defaults.typst_bin),
            document_title: get("DOCUMENT_TITLE").unwrap_or(defaults.document_title),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        };

        if config.cache_timeout >= config.fetch_timeout {
            return Err(ConfigError::CacheTimeoutTooLong {
                cache_ms: config.cache_timeout.as_millis(),
                fetch_ms: config.fetch_timeout.as_millis(),
            });
        }

        Ok(config)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

/// Parse a human duration such as `"1 minute"`, `"10s"`, `"2 hours"` or `"500"`.
///
/// A bare number is read as milliseconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let caps = DURATION_PATTERN.captures(raw)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "ms".to_string());

    let millis_per_unit = match unit.as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        _ => return None,
    };

    let millis = amount * millis_per_unit;
    if millis < 1.0 {
        return None;
    }
    Some(Duration::from_millis(millis as u64))
}

fn parse_number<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected: "number",
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.api_keys.is_empty());
        assert!(config.redis_url.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.body_limit_bytes, 5 * 1024);
        assert_eq!(config.rate_limit_max, 30);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    }

    #[test]
    fn test_api_keys_are_trimmed_and_empty_entries_dropped() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("API_KEYS", " key1, ,key2 ,,")])).unwrap();
        assert_eq!(config.api_keys, vec!["key1".to_string(), "key2".to_string()]);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("TEMPLATE_CACHE_TTL", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "TEMPLATE_CACHE_TTL", .. })
        ));
    }

    #[test]
    fn test_cache_timeout_must_be_shorter_than_fetch_timeout() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("CACHE_TIMEOUT_MS", "20000"),
            ("TEMPLATE_FETCH_TIMEOUT_SECS", "10"),
        ]));
        assert!(matches!(result, Err(ConfigError::CacheTimeoutTooLong { .. })));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("1 minute"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("2 Hours"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("500"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1.5m"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("forever"), None);
    }
}
