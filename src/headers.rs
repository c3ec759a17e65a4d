use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::ApiConfig;
use crate::error::ApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for API requests.
///
/// Precedence, lowest first: defaults, config extra headers, per-request headers.
pub fn build_header_entries(
    config: &ApiConfig,
    request_headers: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    if let Some(token) = config
        .auth_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {token}"));
    }

    for (key, value) in config.extra_headers.iter().chain(request_headers) {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

pub fn build_headers(
    config: &ApiConfig,
    request_headers: &BTreeMap<String, String>,
) -> Result<HeaderMap, ApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in build_header_entries(config, request_headers) {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| ApiError::InvalidHeader {
            name: key.clone(),
            reason: "invalid header name",
        })?;
        let value = HeaderValue::from_str(&value).map_err(|_| ApiError::InvalidHeader {
            name: key.clone(),
            reason: "invalid header value",
        })?;
        out.insert(name, value);
    }
    Ok(out)
}

pub fn default_user_agent() -> String {
    format!("bhavya-api/{}", env!("CARGO_PKG_VERSION"))
}
