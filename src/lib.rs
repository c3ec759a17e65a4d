//! Transport layer between BHAVYA callers and the member-directory API.
//!
//! Two pieces do the work:
//! - [`PathNormalizer`] turns whatever endpoint string a caller has into a canonical
//!   `/api/...` path (or the `/health` carve-out, or an untouched absolute URL).
//! - [`ApiClient::fetch_with_retry`] issues a GET with bounded linear-backoff retry,
//!   refusing to retry login requests.
//!
//! Configuration is read once into [`ApiConfig`] and passed explicitly. Diagnostics flow
//! through an injected [`DiagnosticSink`] instead of process-global logging hooks.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod headers;
pub mod retry;
pub mod url;

pub use client::{ApiClient, HealthStatus, RequestOptions};
pub use config::{ApiConfig, ConfigError};
pub use diagnostics::{
    min_level_for, sink_for, Diagnostic, DiagnosticLevel, DiagnosticSink, DiagnosticsMode,
    FilteringSink, MemorySink, NoopSink, TracingSink,
};
pub use error::{ApiError, TransportKind};
pub use retry::{run_with_retry, RetryPolicy, RetryTarget};
pub use url::{join_url, normalize_api_path, PathNormalizer};
