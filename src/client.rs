use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ApiConfig;
use crate::diagnostics::{sink_for, DiagnosticSink};
use crate::error::ApiError;
use crate::headers::build_headers;
use crate::retry::{run_with_retry, RetryPolicy, RetryTarget};
use crate::url::{join_url, PathNormalizer, HEALTH_PATH};

const METHOD_GET: &str = "GET";

/// Per-request options handed to the transport unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    /// Overrides [`ApiConfig::request_timeout`] for each attempt of this request.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Body of the backend `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "ok" | "healthy" | "up"
        )
    }
}

/// GET client for the member-directory API.
///
/// Owns one `reqwest::Client` for its lifetime; every call keeps its own attempt
/// counter, so a shared `ApiClient` can serve concurrent callers.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    sink: Arc<dyn DiagnosticSink>,
    normalizer: PathNormalizer,
}

impl ApiClient {
    /// Build a client whose diagnostics sink follows `config.diagnostics`.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let sink = sink_for(config.diagnostics);
        Self::with_sink(config, sink)
    }

    /// Build a client that reports to `sink`. Fails on an invalid base URL.
    pub fn with_sink(config: ApiConfig, sink: Arc<dyn DiagnosticSink>) -> Result<Self, ApiError> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::Client)?;
        Ok(Self {
            http,
            config,
            normalizer: PathNormalizer::new(Arc::clone(&sink)),
            sink,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Canonical path joined onto the configured base URL.
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.config.base_url, &self.normalizer.normalize(Some(path)))
    }

    pub fn build_request(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<RequestBuilder, ApiError> {
        let parsed = Url::parse(url).map_err(|error| ApiError::InvalidUrl {
            url: url.to_owned(),
            message: error.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: url.to_owned(),
                message: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        let headers = build_headers(&self.config, &options.headers)?;

        let mut request = self.http.get(parsed).headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        Ok(request)
    }

    /// GET `url` with up to `max_retries` retries after the initial attempt.
    ///
    /// Returns the parsed JSON body, `Value::Null` for an empty body, or the raw text as
    /// `Value::String` when the body is not JSON. On failure the last error is returned
    /// unwrapped.
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        options: &RequestOptions,
        max_retries: u32,
    ) -> Result<Value, ApiError> {
        let policy = RetryPolicy::from_config(&self.config).with_max_retries(max_retries);
        run_with_retry(
            &policy,
            RetryTarget::get(url),
            self.sink.as_ref(),
            |_| self.fetch_once(url, options),
        )
        .await
    }

    /// [`ApiClient::fetch_with_retry`] with the configured retry ceiling.
    pub async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<Value, ApiError> {
        self.fetch_with_retry(url, options, self.config.max_retries)
            .await
    }

    /// Normalize `path`, fetch it, and deserialize the body into `T`.
    pub async fn get_json<T>(&self, path: &str, options: &RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let body = self.fetch(&url, options).await?;
        serde_json::from_value(body).map_err(|source| ApiError::Decode { url, source })
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json(HEALTH_PATH, &RequestOptions::default()).await
    }

    async fn fetch_once(&self, url: &str, options: &RequestOptions) -> Result<Value, ApiError> {
        let response = self
            .build_request(url, options)?
            .send()
            .await
            .map_err(|error| ApiError::transport(METHOD_GET, url, error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| ApiError::transport(METHOD_GET, url, error))?;

        if !status.is_success() {
            return Err(ApiError::from_response(status, METHOD_GET, url, &body));
        }

        Ok(parse_body(&body))
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned()))
}
