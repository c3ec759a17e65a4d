use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::diagnostics::DiagnosticsMode;
use crate::retry::{DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_RETRIES};
use crate::url::is_absolute_url;

/// Default base URL for the member-directory backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_BASE_URL: &str = "BHAVYA_API_URL";
pub const ENV_MAX_RETRIES: &str = "BHAVYA_MAX_RETRIES";
pub const ENV_BACKOFF_MS: &str = "BHAVYA_RETRY_BACKOFF_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "BHAVYA_REQUEST_TIMEOUT_MS";
pub const ENV_DEADLINE_MS: &str = "BHAVYA_REQUEST_DEADLINE_MS";
pub const ENV_AUTH_TOKEN: &str = "BHAVYA_AUTH_TOKEN";
pub const ENV_USER_AGENT: &str = "BHAVYA_USER_AGENT";
pub const ENV_DIAGNOSTICS: &str = "BHAVYA_DIAGNOSTICS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("base URL must start with http:// or https://, got {value:?}")]
    InvalidBaseUrl { value: String },

    #[error("{key} must be one of tracing, warnings, errors, quiet; got {value:?}")]
    InvalidDiagnosticsMode { key: &'static str, value: String },
}

/// Transport configuration, built once at startup and passed to [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and host of the backend; canonical paths are joined onto it.
    pub base_url: String,
    /// Retries after the initial attempt; `fetch` makes at most `max_retries + 1` calls.
    pub max_retries: u32,
    /// Retry `n` waits `n` of these.
    pub backoff_unit: Duration,
    /// Per-attempt timeout applied by the HTTP client. `None` leaves the transport default.
    pub request_timeout: Option<Duration>,
    /// Overall budget for one logical request including backoff waits.
    pub deadline: Option<Duration>,
    /// Bearer token sent in `Authorization`.
    pub auth_token: Option<String>,
    /// `User-Agent` header; `bhavya-api/<version>` when unset.
    pub user_agent: Option<String>,
    /// Sent on every request. Per-request headers with the same name win.
    pub extra_headers: BTreeMap<String, String>,
    /// Sink chosen by [`crate::ApiClient::new`]. Ignored by `ApiClient::with_sink`.
    pub diagnostics: DiagnosticsMode,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            deadline: None,
            auth_token: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            diagnostics: DiagnosticsMode::default(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key).and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_owned())
                }
            })
        };

        let mut config = Self::default();

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = validate_base_url(&base_url)?;
        }
        if let Some(value) = get(ENV_MAX_RETRIES) {
            config.max_retries = parse_number(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = get(ENV_BACKOFF_MS) {
            config.backoff_unit = Duration::from_millis(parse_number(ENV_BACKOFF_MS, &value)?);
        }
        if let Some(value) = get(ENV_REQUEST_TIMEOUT_MS) {
            let millis: u64 = parse_number(ENV_REQUEST_TIMEOUT_MS, &value)?;
            config.request_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(value) = get(ENV_DEADLINE_MS) {
            let millis: u64 = parse_number(ENV_DEADLINE_MS, &value)?;
            config.deadline = (millis > 0).then(|| Duration::from_millis(millis));
        }
        config.auth_token = get(ENV_AUTH_TOKEN);
        config.user_agent = get(ENV_USER_AGENT);
        if let Some(value) = get(ENV_DIAGNOSTICS) {
            config.diagnostics =
                value
                    .parse()
                    .map_err(|value| ConfigError::InvalidDiagnosticsMode {
                        key: ENV_DIAGNOSTICS,
                        value,
                    })?;
        }

        Ok(config)
    }

    /// Stores the URL with trailing slashes trimmed. Validation happens in
    /// [`ApiConfig::validate`] and [`ApiConfig::from_lookup`].
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn without_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsMode) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url).map(|_| ())
    }
}

fn validate_base_url(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    let has_host = trimmed
        .split_once("://")
        .is_some_and(|(_, rest)| !rest.is_empty());
    if !is_absolute_url(trimmed) || !has_host {
        return Err(ConfigError::InvalidBaseUrl {
            value: value.to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_owned(),
    })
}
