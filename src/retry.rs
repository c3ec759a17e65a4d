use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::ApiConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::ApiError;

/// Maximum retry attempts after an initial request attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Delay unit; retry `n` waits `n` units.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_millis(1000);
/// URLs containing this literal are never retried, whatever the failure.
///
/// This is a plain substring match. A renamed auth route silently falls out of it.
pub const LOGIN_PATH_MARKER: &str = "/auth/login";

pub fn is_login_url(url: &str) -> bool {
    url.contains(LOGIN_PATH_MARKER)
}

/// Retry eligibility for a failed GET.
///
/// Login URLs never retry. Otherwise transient transport failures (no response at all)
/// and 5xx responses retry; client errors, redirect failures and local failures do not.
pub fn is_retryable_failure(url: &str, error: &ApiError) -> bool {
    if is_login_url(url) {
        return false;
    }
    error.is_transient_transport() || error.is_server_error()
}

/// Linear backoff for a 1-indexed retry attempt.
pub fn retry_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(attempt.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_unit: Duration,
    /// Overall budget across attempts and waits. A wait that would end past it is skipped
    /// and the last error returned instead.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_unit: config.backoff_unit,
            deadline: config.deadline,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        retry_delay(self.backoff_unit, attempt)
    }
}

/// What a retry sequence is aimed at; used for the login check and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTarget<'a> {
    pub method: &'a str,
    pub url: &'a str,
}

impl<'a> RetryTarget<'a> {
    pub fn get(url: &'a str) -> Self {
        Self { method: "GET", url }
    }
}

/// Drive `operation` until it succeeds, fails non-retryably, or runs out of retries.
///
/// `operation` receives the 0-based attempt number. Attempts run strictly one after
/// another; the last error is returned as-is.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    target: RetryTarget<'_>,
    sink: &dyn DiagnosticSink,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        sink.emit(&failure_diagnostic(attempt, target, &error));

        if !is_retryable_failure(target.url, &error) {
            return Err(error);
        }

        if attempt >= policy.max_retries {
            sink.emit(&Diagnostic::RetriesExhausted {
                attempts: attempt + 1,
                url: target.url.to_owned(),
            });
            return Err(error);
        }

        let next = attempt + 1;
        let delay = policy.delay_for(next);

        if let Some(deadline) = policy.deadline {
            let elapsed = started.elapsed();
            if elapsed.saturating_add(delay) > deadline {
                sink.emit(&Diagnostic::DeadlineReached {
                    attempts: next,
                    elapsed,
                    deadline,
                    url: target.url.to_owned(),
                });
                return Err(error);
            }
        }

        sink.emit(&Diagnostic::RetryScheduled {
            attempt: next,
            max_retries: policy.max_retries,
            delay,
            url: target.url.to_owned(),
        });
        tokio::time::sleep(delay).await;
        attempt = next;
    }
}

fn failure_diagnostic(attempt: u32, target: RetryTarget<'_>, error: &ApiError) -> Diagnostic {
    Diagnostic::RequestFailed {
        attempt,
        status: error.status().map(|status| status.as_u16()),
        message: error.message(),
        code: error.code().map(str::to_owned),
        method: error.method().unwrap_or(target.method).to_owned(),
        url: error.url().unwrap_or(target.url).to_owned(),
    }
}
