use lineup_flow::{DEFAULT_MAX_UPLOAD_BYTES, FlowConfig};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must be a non-negative integer, got `{value}`")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings for the HTTP gateway and the orchestrator it feeds.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base of the backend REST API. Always ends with `/`.
    pub api_url: Url,
    /// Raw `Cookie` header value binding the backend session, if any.
    pub session_cookie: Option<String>,
    pub request_timeout: Duration,
    pub upload_delay: Duration,
    pub max_upload_bytes: usize,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_url = parse_api_url(
            "LINEUP_API_URL",
            var("LINEUP_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;

        Ok(Self {
            api_url,
            session_cookie: var("LINEUP_SESSION_COOKIE"),
            request_timeout: Duration::from_secs(number(
                "LINEUP_REQUEST_TIMEOUT_SECS",
                var("LINEUP_REQUEST_TIMEOUT_SECS"),
                60,
            )?),
            upload_delay: Duration::from_millis(number(
                "LINEUP_UPLOAD_DELAY_MS",
                var("LINEUP_UPLOAD_DELAY_MS"),
                800,
            )?),
            max_upload_bytes: number(
                "LINEUP_MAX_UPLOAD_BYTES",
                var("LINEUP_MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES as u64,
            )? as usize,
        })
    }

    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url("--api-url", raw)?;
        Ok(self)
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            upload_delay: self.upload_delay,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(&format!("{}/", DEFAULT_API_URL))
                .expect("default API URL is valid"),
            session_cookie: None,
            request_timeout: Duration::from_secs(60),
            upload_delay: Duration::from_millis(800),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Endpoint paths are joined relative to the base, so it needs a trailing slash.
fn parse_api_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn number(name: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
