use std::sync::Arc;

use bhavya_api::{normalize_api_path, Diagnostic, MemorySink, PathNormalizer};
use pretty_assertions::assert_eq;
use serde_json::json;

fn normalizer() -> (PathNormalizer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (PathNormalizer::new(sink.clone()), sink)
}

#[test]
fn url_normalization_prefixes_relative_paths() {
    assert_eq!(normalize_api_path("api/auth/login"), "/api/auth/login");
    assert_eq!(normalize_api_path("members"), "/api/members");
    assert_eq!(normalize_api_path("/members/42"), "/api/members/42");
}

#[test]
fn url_normalization_strips_repeated_api_segments() {
    assert_eq!(normalize_api_path("/api/api/auth/login"), "/api/auth/login");
    assert_eq!(normalize_api_path("api/api/api/news"), "/api/news");
}

#[test]
fn url_normalization_reduces_bare_prefix_to_api_root() {
    assert_eq!(normalize_api_path("api/"), "/api/");
    assert_eq!(normalize_api_path("/api/"), "/api/");
    assert_eq!(normalize_api_path("/api"), "/api");
    assert_eq!(normalize_api_path("api"), "/api");
    assert_eq!(normalize_api_path(""), "/api");
}

#[test]
fn url_normalization_collapses_doubled_slashes() {
    assert_eq!(normalize_api_path("//members//search"), "/api/members/search");
    assert_eq!(normalize_api_path("/api//premium"), "/api/premium");
}

#[test]
fn url_normalization_keeps_health_outside_api() {
    assert_eq!(normalize_api_path("/health"), "/health");
    assert_eq!(normalize_api_path("health"), "/health");
    assert_eq!(normalize_api_path("/health/db"), "/api/health/db");
}

#[test]
fn url_normalization_leaves_absolute_urls_untouched() {
    assert_eq!(normalize_api_path("https://x.com/y"), "https://x.com/y");
    assert_eq!(
        normalize_api_path("http://localhost:5000//api/api/x"),
        "http://localhost:5000//api/api/x"
    );
}

#[test]
fn url_normalization_is_idempotent() {
    let samples = [
        "",
        "api",
        "/api",
        "api/",
        "/api/api/auth/login",
        "members",
        "//a//b///c",
        "api//api/x",
        "health",
        "/health",
        "https://x.com/y",
        "news?page=2",
        "/api/users/api/api/x",
        "proxy/http://upstream//a",
    ];
    for sample in samples {
        let once = normalize_api_path(sample);
        assert_eq!(normalize_api_path(&once), once, "sample {sample:?}");
    }
}

#[test]
fn url_normalization_never_doubles_api_prefix() {
    let samples = ["api/api/", "/api//api/", "api/api//api/x", "/x/api/api/y"];
    for sample in samples {
        let normalized = normalize_api_path(sample);
        assert!(normalized.starts_with("/api/"), "{normalized}");
        assert!(!normalized.contains("/api/api/"), "{normalized}");
    }
}

#[test]
fn normalizer_degrades_missing_input_with_warning() {
    let (normalizer, sink) = normalizer();

    assert_eq!(normalizer.normalize(None), "/api");
    assert_eq!(normalizer.normalize(Some("")), "/api");

    assert_eq!(
        sink.events(),
        vec![
            Diagnostic::InvalidPath { received: "none" },
            Diagnostic::InvalidPath {
                received: "empty string"
            },
        ]
    );
}

#[test]
fn normalizer_rejects_non_string_values() {
    let (normalizer, sink) = normalizer();

    assert_eq!(normalizer.normalize_value(&json!(null)), "/api");
    assert_eq!(normalizer.normalize_value(&json!(42)), "/api");
    assert_eq!(normalizer.normalize_value(&json!({"path": "x"})), "/api");
    assert_eq!(normalizer.normalize_value(&json!("members")), "/api/members");

    assert_eq!(
        sink.count_where(|event| matches!(event, Diagnostic::InvalidPath { .. })),
        3
    );
}

#[test]
fn normalizer_logs_before_and_after() {
    let (normalizer, sink) = normalizer();

    normalizer.normalize(Some("api/news"));

    assert_eq!(
        sink.events(),
        vec![Diagnostic::PathNormalized {
            input: "api/news".to_owned(),
            output: "/api/news".to_owned(),
        }]
    );
}

#[test]
fn join_url_uses_single_separator() {
    assert_eq!(
        bhavya_api::join_url("http://localhost:5000/", "/api/members"),
        "http://localhost:5000/api/members"
    );
    assert_eq!(
        bhavya_api::join_url("http://localhost:5000", "https://cdn.example.org/a.png"),
        "https://cdn.example.org/a.png"
    );
}
