use std::sync::Arc;
use std::time::Duration;

use bhavya_api::{
    min_level_for, sink_for, Diagnostic, DiagnosticLevel, DiagnosticSink, DiagnosticsMode, FilteringSink,
    MemorySink,
};

fn retry_event() -> Diagnostic {
    Diagnostic::RetryScheduled {
        attempt: 1,
        max_retries: 3,
        delay: Duration::from_millis(1000),
        url: "http://localhost:5000/api/news".to_owned(),
    }
}

#[test]
fn levels_follow_event_kind() {
    assert_eq!(
        Diagnostic::InvalidPath { received: "none" }.level(),
        DiagnosticLevel::Warn
    );
    assert_eq!(retry_event().level(), DiagnosticLevel::Warn);
    assert_eq!(
        Diagnostic::RetriesExhausted {
            attempts: 4,
            url: "u".to_owned()
        }
        .level(),
        DiagnosticLevel::Error
    );
}

#[test]
fn filtering_sink_drops_lower_levels() {
    let memory = Arc::new(MemorySink::new());
    let sink = FilteringSink::new(memory.clone(), DiagnosticLevel::Error);

    sink.emit(&retry_event());
    sink.emit(&Diagnostic::RetriesExhausted {
        attempts: 4,
        url: "u".to_owned(),
    });

    assert_eq!(memory.events().len(), 1);
    assert_eq!(memory.retry_count(), 0);
}

#[test]
fn memory_sink_clear_resets_history() {
    let memory = MemorySink::new();
    memory.emit(&retry_event());
    assert_eq!(memory.retry_count(), 1);
    memory.clear();
    assert!(memory.events().is_empty());
}

#[test]
fn display_describes_retry() {
    assert_eq!(
        retry_event().to_string(),
        "retrying http://localhost:5000/api/news (attempt 1/3) in 1000ms"
    );
}

#[test]
fn diagnostics_mode_parses_known_names() {
    assert_eq!("tracing".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::Tracing));
    assert_eq!("ERRORS".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::Errors));
    assert_eq!("warn".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::Warnings));
    assert_eq!("Warnings".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::Warnings));
    assert_eq!("quiet".parse::<DiagnosticsMode>(), Ok(DiagnosticsMode::Quiet));
    assert!("loud".parse::<DiagnosticsMode>().is_err());
}

#[test]
fn sink_for_every_mode_accepts_events() {
    for mode in [
        DiagnosticsMode::Tracing,
        DiagnosticsMode::Warnings,
        DiagnosticsMode::Errors,
        DiagnosticsMode::Quiet,
    ] {
        sink_for(mode).emit(&retry_event());
    }
}

#[test]
fn warnings_mode_keeps_scheduled_retries() {
    let level = min_level_for(DiagnosticsMode::Warnings).expect("warnings forwards events");
    let memory = Arc::new(MemorySink::new());
    let sink = FilteringSink::new(Arc::clone(&memory), level);

    sink.emit(&Diagnostic::PathNormalized {
        input: "members".to_owned(),
        output: "/api/members".to_owned(),
    });
    sink.emit(&retry_event());

    assert_eq!(memory.events(), vec![retry_event()]);
    assert_eq!(memory.retry_count(), 1);
}

#[test]
fn errors_mode_drops_scheduled_retries() {
    let level = min_level_for(DiagnosticsMode::Errors).expect("errors forwards events");
    let memory = Arc::new(MemorySink::new());
    FilteringSink::new(Arc::clone(&memory), level).emit(&retry_event());

    assert!(memory.events().is_empty());
    assert_eq!(min_level_for(DiagnosticsMode::Quiet), None);
    assert_eq!(
        min_level_for(DiagnosticsMode::Tracing),
        Some(DiagnosticLevel::Debug)
    );
}
