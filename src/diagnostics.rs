//! Injectable diagnostics.
//!
//! Library code never touches a global logger directly. Every observable event is a
//! [`Diagnostic`] handed to a [`DiagnosticSink`] chosen once at startup (see [`sink_for`]).

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The normalizer received no usable path and fell back to `/api`.
    InvalidPath { received: &'static str },
    PathNormalized { input: String, output: String },
    /// One attempt failed. `attempt` is 0 for the initial request.
    RequestFailed {
        attempt: u32,
        status: Option<u16>,
        message: String,
        code: Option<String>,
        method: String,
        url: String,
    },
    /// A retry will run after `delay`. `attempt` is 1-indexed.
    RetryScheduled {
        attempt: u32,
        max_retries: u32,
        delay: Duration,
        url: String,
    },
    RetriesExhausted { attempts: u32, url: String },
    /// The next backoff would overrun the overall deadline.
    DeadlineReached {
        attempts: u32,
        elapsed: Duration,
        deadline: Duration,
        url: String,
    },
}

impl Diagnostic {
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Self::PathNormalized { .. } => DiagnosticLevel::Debug,
            Self::InvalidPath { .. } | Self::RetryScheduled { .. } => DiagnosticLevel::Warn,
            Self::RequestFailed { .. }
            | Self::RetriesExhausted { .. }
            | Self::DeadlineReached { .. } => DiagnosticLevel::Error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { received } => {
                write!(f, "invalid API path ({received}); using /api")
            }
            Self::PathNormalized { input, output } => {
                write!(f, "normalized API path {input:?} -> {output:?}")
            }
            Self::RequestFailed {
                attempt,
                status,
                message,
                code,
                method,
                url,
            } => {
                let status = status
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                let code = code.as_deref().unwrap_or("n/a");
                write!(
                    f,
                    "{method} {url} failed on attempt {attempt} (status: {status}, code: {code}): {message}"
                )
            }
            Self::RetryScheduled {
                attempt,
                max_retries,
                delay,
                url,
            } => write!(
                f,
                "retrying {url} (attempt {attempt}/{max_retries}) in {}ms",
                delay.as_millis()
            ),
            Self::RetriesExhausted { attempts, url } => {
                write!(f, "giving up on {url} after {attempts} attempts")
            }
            Self::DeadlineReached {
                attempts,
                elapsed,
                deadline,
                url,
            } => write!(
                f,
                "giving up on {url} after {attempts} attempts: {}ms elapsed of {}ms deadline",
                elapsed.as_millis(),
                deadline.as_millis()
            ),
        }
    }
}

/// Destination for diagnostics. Implementations must be safe to share across tasks.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn debug(&self, _event: &Diagnostic) {}

    fn warn(&self, event: &Diagnostic);

    fn error(&self, event: &Diagnostic);

    fn emit(&self, event: &Diagnostic) {
        match event.level() {
            DiagnosticLevel::Debug => self.debug(event),
            DiagnosticLevel::Warn => self.warn(event),
            DiagnosticLevel::Error => self.error(event),
        }
    }
}

/// Forwards diagnostics to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn debug(&self, event: &Diagnostic) {
        match event {
            Diagnostic::PathNormalized { input, output } => {
                tracing::debug!(%input, %output, "api path normalized");
            }
            other => tracing::debug!("{other}"),
        }
    }

    fn warn(&self, event: &Diagnostic) {
        match event {
            Diagnostic::RetryScheduled {
                attempt,
                max_retries,
                delay,
                url,
            } => tracing::warn!(
                attempt,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                %url,
                "retrying request"
            ),
            other => tracing::warn!("{other}"),
        }
    }

    fn error(&self, event: &Diagnostic) {
        match event {
            Diagnostic::RequestFailed {
                attempt,
                status,
                message,
                code,
                method,
                url,
            } => tracing::error!(
                attempt,
                status = status.map(u64::from),
                code = code.as_deref(),
                %method,
                %url,
                %message,
                "request failed"
            ),
            other => tracing::error!("{other}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn warn(&self, _event: &Diagnostic) {}

    fn error(&self, _event: &Diagnostic) {}
}

/// Drops events below `min_level` before handing them to `inner`.
#[derive(Debug, Clone)]
pub struct FilteringSink<S> {
    inner: S,
    min_level: DiagnosticLevel,
}

impl<S: DiagnosticSink> FilteringSink<S> {
    pub fn new(inner: S, min_level: DiagnosticLevel) -> Self {
        Self { inner, min_level }
    }

    fn allows(&self, event: &Diagnostic) -> bool {
        event.level() >= self.min_level
    }
}

impl<S: DiagnosticSink> DiagnosticSink for FilteringSink<S> {
    fn debug(&self, event: &Diagnostic) {
        if self.allows(event) {
            self.inner.debug(event);
        }
    }

    fn warn(&self, event: &Diagnostic) {
        if self.allows(event) {
            self.inner.warn(event);
        }
    }

    fn error(&self, event: &Diagnostic) {
        if self.allows(event) {
            self.inner.error(event);
        }
    }
}

/// Records every event in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        lock_unpoisoned(&self.events).clone()
    }

    pub fn count_where(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        lock_unpoisoned(&self.events)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }

    pub fn retry_count(&self) -> usize {
        self.count_where(|event| matches!(event, Diagnostic::RetryScheduled { .. }))
    }

    pub fn clear(&self) {
        lock_unpoisoned(&self.events).clear();
    }

    fn record(&self, event: &Diagnostic) {
        lock_unpoisoned(&self.events).push(event.clone());
    }
}

impl DiagnosticSink for MemorySink {
    fn debug(&self, event: &Diagnostic) {
        self.record(event);
    }

    fn warn(&self, event: &Diagnostic) {
        self.record(event);
    }

    fn error(&self, event: &Diagnostic) {
        self.record(event);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn debug(&self, event: &Diagnostic) {
        (**self).debug(event);
    }

    fn warn(&self, event: &Diagnostic) {
        (**self).warn(event);
    }

    fn error(&self, event: &Diagnostic) {
        (**self).error(event);
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Sink selection made at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticsMode {
    /// Everything goes to `tracing`; the subscriber decides what is printed.
    #[default]
    Tracing,
    /// Warn and error events reach `tracing`, so scheduled retries stay visible.
    Warnings,
    /// Only error-level events reach `tracing`. Scheduled retries are dropped; each
    /// failed attempt still shows up as a `RequestFailed` error.
    Errors,
    Quiet,
}

impl FromStr for DiagnosticsMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tracing" | "all" => Ok(Self::Tracing),
            "warnings" | "warning" | "warn" => Ok(Self::Warnings),
            "errors" | "error" => Ok(Self::Errors),
            "quiet" | "off" | "none" => Ok(Self::Quiet),
            other => Err(other.to_owned()),
        }
    }
}

/// Lowest level forwarded in `mode`, or `None` when nothing is.
pub fn min_level_for(mode: DiagnosticsMode) -> Option<DiagnosticLevel> {
    match mode {
        DiagnosticsMode::Tracing => Some(DiagnosticLevel::Debug),
        DiagnosticsMode::Warnings => Some(DiagnosticLevel::Warn),
        DiagnosticsMode::Errors => Some(DiagnosticLevel::Error),
        DiagnosticsMode::Quiet => None,
    }
}

pub fn sink_for(mode: DiagnosticsMode) -> Arc<dyn DiagnosticSink> {
    match min_level_for(mode) {
        None => Arc::new(NoopSink),
        Some(DiagnosticLevel::Debug) => Arc::new(TracingSink),
        Some(level) => Arc::new(FilteringSink::new(TracingSink, level)),
    }
}
