use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};

/// Returned when a caller supplies no usable path.
pub const DEFAULT_API_PATH: &str = "/api";
/// Infrastructure health endpoint; lives outside the `/api` namespace.
pub const HEALTH_PATH: &str = "/health";

const API_PREFIX: &str = "/api/";
const API_SEGMENT: &str = "api/";
const DOUBLED_API_PREFIX: &str = "/api/api/";

fn doubled_slash_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"(^|[^:])/{2,}").expect("slash regex must compile"))
}

/// Whether `path` is an absolute `http://` or `https://` URL.
pub fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Normalize an endpoint string to its canonical API path.
///
/// Normalization rules:
/// 1) empty input and the bare API root (`api`, `/api`) map to [`DEFAULT_API_PATH`]
/// 2) absolute `http(s)://` URLs are returned unchanged
/// 3) `/health` and `health` map to [`HEALTH_PATH`]
/// 4) everything else gets exactly one `/api/` prefix, with doubled slashes
///    (outside `scheme://`) and `/api/api/` runs collapsed
pub fn normalize_api_path(path: &str) -> String {
    if path.is_empty() || path == DEFAULT_API_PATH || path == &DEFAULT_API_PATH[1..] {
        return DEFAULT_API_PATH.to_owned();
    }
    if is_absolute_url(path) {
        return path.to_owned();
    }
    if path == HEALTH_PATH || path == &HEALTH_PATH[1..] {
        return HEALTH_PATH.to_owned();
    }

    let mut rest = path.strip_prefix('/').unwrap_or(path);
    while let Some(stripped) = rest.strip_prefix(API_SEGMENT) {
        rest = stripped;
    }

    let prefixed = format!("{API_PREFIX}{rest}");
    let collapsed = doubled_slash_regex().replace_all(&prefixed, "${1}/");
    collapse_api_repeats(&collapsed)
}

fn collapse_api_repeats(path: &str) -> String {
    let mut out = path.to_owned();
    while out.contains(DOUBLED_API_PREFIX) {
        out = out.replace(DOUBLED_API_PREFIX, API_PREFIX);
    }
    out
}

/// Join a base URL and a canonical path with exactly one separating slash.
///
/// Absolute paths win over the base.
pub fn join_url(base: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_owned();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_owned();
    }
    format!("{base}/{path}")
}

/// Path normalization with diagnostics for degraded input.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl PathNormalizer {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Normalize a possibly absent path. Absent and empty input degrade to `/api`.
    pub fn normalize(&self, path: Option<&str>) -> String {
        match path {
            Some(path) if !path.is_empty() => self.normalize_present(path),
            Some(_) => self.invalid("empty string"),
            None => self.invalid("none"),
        }
    }

    /// Normalize a dynamically typed value; only JSON strings are treated as paths.
    pub fn normalize_value(&self, value: &Value) -> String {
        match value {
            Value::String(path) if !path.is_empty() => self.normalize_present(path),
            Value::String(_) => self.invalid("empty string"),
            other => self.invalid(json_type_name(other)),
        }
    }

    fn normalize_present(&self, path: &str) -> String {
        let normalized = normalize_api_path(path);
        self.sink.emit(&Diagnostic::PathNormalized {
            input: path.to_owned(),
            output: normalized.clone(),
        });
        normalized
    }

    fn invalid(&self, received: &'static str) -> String {
        self.sink.emit(&Diagnostic::InvalidPath { received });
        DEFAULT_API_PATH.to_owned()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
