//! Span utilities and extension traits for test-run tracing.

use tracing::{info_span, Span};

use crate::engine::ExecutionResult;

/// Extension trait for recording outcomes into spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;

    /// Record a finished test's status and wall time.
    fn record_execution(&self, result: &ExecutionResult);
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }

    fn record_execution(&self, result: &ExecutionResult) {
        self.record("status", result.status.keyword());
        if let Some(timing) = &result.timing {
            self.record("wall_ms", timing.wall.as_secs_f64() * 1000.0);
        }
        if !result.message.is_empty() {
            self.record("error.message", result.message.as_str());
        }
    }
}

/// Factory for the span wrapping one test execution.
pub struct TestSpan;

impl TestSpan {
    /// Fields `status`, `wall_ms` and `error.message` are filled in by
    /// [`SpanExt::record_execution`].
    pub fn new(fixture: &str, test: &str) -> Span {
        info_span!(
            "test",
            fixture = %fixture,
            test = %test,
            status = tracing::field::Empty,
            wall_ms = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}

/// Factory for the span wrapping a whole run.
pub struct RunSpan;

impl RunSpan {
    pub fn new(run_id: &str, tests: usize, sandbox: &str) -> Span {
        info_span!(
            "test_run",
            run_id = %run_id,
            tests,
            sandbox = %sandbox,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
