use std::time::Duration;

use bhavya_api::retry::*;
use bhavya_api::ApiError;
use reqwest::StatusCode;

fn status_error(status: u16, url: &str) -> ApiError {
    ApiError::from_response(
        StatusCode::from_u16(status).expect("valid status"),
        "GET",
        url,
        "",
    )
}

#[test]
fn retry_delay_is_linear() {
    let unit = Duration::from_millis(1000);
    assert_eq!(retry_delay(unit, 1).as_millis(), 1000);
    assert_eq!(retry_delay(unit, 2).as_millis(), 2000);
    assert_eq!(retry_delay(unit, 3).as_millis(), 3000);
}

#[test]
fn retry_server_errors_are_retryable() {
    let url = "http://localhost:5000/api/members";
    for status in [500, 502, 503, 504] {
        assert!(is_retryable_failure(url, &status_error(status, url)));
    }
}

#[test]
fn retry_client_errors_are_not_retryable() {
    let url = "http://localhost:5000/api/members";
    for status in [400, 401, 403, 404, 429] {
        assert!(!is_retryable_failure(url, &status_error(status, url)));
    }
}

#[test]
fn retry_login_urls_are_never_retryable() {
    let url = "http://localhost:5000/api/auth/login";
    assert!(is_login_url(url));
    assert!(!is_retryable_failure(url, &status_error(503, url)));
}

#[test]
fn retry_login_match_is_a_literal_substring() {
    assert!(is_login_url("https://x.com/api/auth/login?next=/home"));
    assert!(!is_login_url("https://x.com/api/auth/signin"));
    assert!(!is_login_url("https://x.com/api/login"));
}

#[test]
fn retry_policy_defaults() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.backoff_unit, Duration::from_secs(1));
    assert_eq!(policy.deadline, None);
}
