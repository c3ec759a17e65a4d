use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Transport-level failure class for a request that never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection refused, reset during connect, or DNS resolution failure.
    Connect,
    Timeout,
    /// The request could not be sent or the connection dropped mid-exchange.
    Request,
    /// The response body could not be read to completion.
    Body,
    /// Redirect policy violated, e.g. a loop or too many hops. Never retried.
    Redirect,
    /// The request could not be built locally (bad scheme, malformed parts). Never retried.
    Builder,
    Other,
}

impl TransportKind {
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_builder() {
            Self::Builder
        } else if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_redirect() {
            Self::Redirect
        } else if error.is_body() || error.is_decode() {
            Self::Body
        } else if error.is_request() {
            Self::Request
        } else {
            Self::Other
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
            Self::Redirect => "redirect",
            Self::Builder => "builder",
            Self::Other => "other",
        }
    }

    /// Whether another attempt could plausibly get a response.
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::Redirect | Self::Builder)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: &'static str },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{method} {url} failed ({kind}): {source}")]
    Transport {
        kind: TransportKind,
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}: {message}")]
    Status {
        status: StatusCode,
        method: String,
        url: String,
        message: String,
        code: Option<String>,
    },

    #[error("failed to decode response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    #[must_use]
    pub fn transport(method: impl Into<String>, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            kind: TransportKind::classify(&source),
            method: method.into(),
            url: url.into(),
            source,
        }
    }

    /// Build a status error from a non-success response body.
    #[must_use]
    pub fn from_response(
        status: StatusCode,
        method: impl Into<String>,
        url: impl Into<String>,
        body: &str,
    ) -> Self {
        let ErrorDetails { message, code } = parse_error_body(status, body);
        Self::Status {
            status,
            method: method.into(),
            url: url.into(),
            message,
            code,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Transport { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }

    /// Machine-readable code: the server's error code, or the transport class.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            Self::Transport { kind, .. } => Some(kind.code()),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Status { method, .. } | Self::Transport { method, .. } => Some(method.as_str()),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. }
            | Self::Transport { url, .. }
            | Self::InvalidUrl { url, .. }
            | Self::Decode { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }

    /// No response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// No response was received and the failure class may clear on its own.
    pub fn is_transient_transport(&self) -> bool {
        matches!(self, Self::Transport { kind, .. } if kind.is_transient())
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_server_error())
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    code: Option<CodeValue>,
    error: Option<ErrorField>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Object {
        message: Option<String>,
        code: Option<CodeValue>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Text(String),
    Number(i64),
}

impl CodeValue {
    fn into_string(self) -> Option<String> {
        match self {
            Self::Text(text) => non_empty(text),
            Self::Number(number) => Some(number.to_string()),
        }
    }
}

/// Extract a human message and optional code from an error response body.
///
/// Understands `{"message": ..}`, `{"msg": ..}`, `{"error": "..."}` and
/// `{"error": {"message": .., "code": ..}}`, with a top-level `code` taking
/// precedence. Falls back to the raw body, then the status reason phrase.
pub fn parse_error_body(status: StatusCode, body: &str) -> ErrorDetails {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        } else {
            body.to_owned()
        }
    };

    let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) else {
        return ErrorDetails {
            message: fallback(),
            code: None,
        };
    };

    let (nested_message, nested_code) = match payload.error {
        Some(ErrorField::Text(text)) => (non_empty(text), None),
        Some(ErrorField::Object { message, code }) => {
            (message.and_then(non_empty), code.and_then(CodeValue::into_string))
        }
        None => (None, None),
    };

    let message = payload
        .message
        .and_then(non_empty)
        .or(nested_message)
        .or_else(|| payload.msg.and_then(non_empty))
        .unwrap_or_else(fallback);
    let code = payload
        .code
        .and_then(CodeValue::into_string)
        .or(nested_code);

    ErrorDetails { message, code }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
