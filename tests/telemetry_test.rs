//! Telemetry module tests for the test runner.

use std::time::Duration;

use gg_testbed::engine::{ExecutionResult, TestStatus, Timing};
use gg_testbed::telemetry::{
    init_logging, LogConfig, LogError, LogFormat, RunSpan, SpanExt, TestSpan,
};
use tracing::Span;

fn execution(status: TestStatus, message: &str) -> ExecutionResult {
    ExecutionResult {
        name: "strlen".to_string(),
        fixture: "string".to_string(),
        case: None,
        status,
        message: message.to_string(),
        timing: Some(Timing {
            wall: Duration::from_millis(4),
            cpu: None,
        }),
        teardown_fault: None,
    }
}

// =============================================================================
// LogConfig Tests
// =============================================================================

#[test]
fn log_config_default_is_pretty_warn() {
    let config = LogConfig::default();
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level, "warn");
}

#[test]
fn log_config_deserializes_partial_table() {
    let config: LogConfig = toml::from_str("format = \"json\"").unwrap();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "warn");
}

#[test]
fn log_format_parses_case_insensitively() {
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    assert!(matches!(
        "yaml".parse::<LogFormat>(),
        Err(LogError::InvalidFormat(f)) if f == "yaml"
    ));
}

#[test]
fn log_format_display_matches_parse() {
    for format in [LogFormat::Json, LogFormat::Pretty] {
        assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
    }
}

// =============================================================================
// LogError Tests
// =============================================================================

#[test]
fn log_error_invalid_filter_display() {
    let error = LogError::InvalidFilter("bad filter".to_string());
    assert!(error.to_string().contains("Invalid log filter"));
    assert!(error.to_string().contains("bad filter"));
}

#[test]
fn log_error_already_initialized_display() {
    let error = LogError::AlreadyInitialized;
    assert!(error.to_string().contains("already initialized"));
}

#[test]
fn init_logging_rejects_bad_filter_before_installing() {
    let config = LogConfig {
        format: LogFormat::Json,
        level: "gg_testbed=loud".to_string(),
    };
    assert!(matches!(
        init_logging(&config),
        Err(LogError::InvalidFilter(_))
    ));
}

// =============================================================================
// SpanExt Tests
// =============================================================================

#[test]
fn span_ext_record_result_ok() {
    let span = Span::none();
    let result: Result<(), String> = Ok(());
    span.record_result(&result);
}

#[test]
fn span_ext_record_result_err() {
    let span = Span::none();
    let result: Result<(), String> = Err("fork failed".to_string());
    span.record_result(&result);
}

#[test]
fn span_ext_record_execution_for_each_status() {
    for (status, message) in [
        (TestStatus::Passed, ""),
        (TestStatus::Failed, "Expression is false: 1 == 2"),
        (TestStatus::Skipped, "not here"),
        (TestStatus::Crashed, "signal 11 (SIGSEGV)"),
    ] {
        let span = TestSpan::new("string", "strlen");
        span.record_execution(&execution(status, message));
    }
}

// =============================================================================
// Span Factory Tests
// =============================================================================

#[test]
fn test_span_creates_without_panic() {
    let span = TestSpan::new("simple", "assert_true_succeeds");
    let _guard = span.enter();
}

#[test]
fn run_span_nests_test_spans() {
    let run = RunSpan::new("00000000-0000-0000-0000-000000000000", 3, "inline");
    let _run = run.enter();
    for name in ["a", "b", "c"] {
        let span = TestSpan::new("fixture", name);
        let _guard = span.enter();
    }
    run.record_result::<(), String>(&Ok(()));
}
