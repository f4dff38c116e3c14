//! Gate configuration.
//!
//! Environment variables:
//! - `DOCGATE_ENDPOINT`: registration endpoint (default [`DEFAULT_ENDPOINT`])
//! - `DOCGATE_CAPACITY`: admissions per window (default 10)
//! - `DOCGATE_WINDOW`: window length, `second`/`minute`/`hour`/`day` or `<n>ms|s|m|h` (default `second`)
//! - `DOCGATE_MAX_WAIT`: optional upper bound on the admission wait
//! - `DOCGATE_REQUEST_TIMEOUT`: per-request timeout (default 30s)

use std::num::NonZeroUsize;
use std::time::Duration;

use reqwest::Url;

use crate::gateway::GatewayConfig;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8081/api/v3/lk/documents/create";

const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("capacity must be a positive integer, got '{0}'")]
    InvalidCapacity(String),

    #[error("invalid duration '{value}' for {key}")]
    InvalidDuration { key: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub endpoint: Url,
    pub capacity: NonZeroUsize,
    pub window: Duration,
    pub max_wait: Option<Duration>,
    pub gateway: GatewayConfig,
}

impl GateConfig {
    pub fn new(endpoint: &str, window: Duration, capacity: usize) -> Result<Self, ConfigError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| ConfigError::InvalidCapacity(capacity.to_string()))?;
        if window.is_zero() {
            return Err(ConfigError::InvalidDuration {
                key: "window",
                value: format!("{window:?}"),
            });
        }

        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            capacity,
            window,
            max_wait: None,
            gateway: GatewayConfig::default(),
        })
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, CLI overrides, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("DOCGATE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let capacity = match lookup("DOCGATE_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidCapacity(raw.clone()))?,
            None => DEFAULT_CAPACITY,
        };

        let window = match lookup("DOCGATE_WINDOW") {
            Some(raw) => parse_duration("DOCGATE_WINDOW", &raw)?,
            None => Duration::from_secs(1),
        };

        let mut config = Self::new(&endpoint, window, capacity)?;

        if let Some(raw) = lookup("DOCGATE_MAX_WAIT") {
            config.max_wait = Some(parse_duration("DOCGATE_MAX_WAIT", &raw)?);
        }
        if let Some(raw) = lookup("DOCGATE_REQUEST_TIMEOUT") {
            config.gateway.request_timeout = parse_duration("DOCGATE_REQUEST_TIMEOUT", &raw)?;
        }

        Ok(config)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Parse a window-style duration: a unit name (`second`, `minute`, `hour`,
/// `day`) or a positive integer with an `ms`, `s`, `m` or `h` suffix.
pub fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        key,
        value: raw.to_string(),
    };
    let value = raw.trim().to_ascii_lowercase();

    let named = match value.as_str() {
        "second" | "seconds" => Some(Duration::from_secs(1)),
        "minute" | "minutes" => Some(Duration::from_secs(60)),
        "hour" | "hours" => Some(Duration::from_secs(60 * 60)),
        "day" | "days" => Some(Duration::from_secs(24 * 60 * 60)),
        _ => None,
    };
    if let Some(duration) = named {
        return Ok(duration);
    }

    let (digits, unit_ms) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        return Err(invalid());
    };

    match digits.trim().parse::<u64>() {
        Ok(n) if n > 0 => n
            .checked_mul(unit_ms)
            .map(Duration::from_millis)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
