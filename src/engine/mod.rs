//! Execution engine.
//!
//! Drains a sealed [`Suite`] strictly in registration order, one test at a
//! time, and feeds every result to the [`Reporter`]. Test failures and
//! crashes are contained per test; only infrastructure errors stop a run.

mod lifecycle;
mod result;

pub use lifecycle::{LifecycleState, Runnable};
pub use result::{ExecutionResult, RunSummary, TestStatus, Timing};

pub(crate) use lifecycle::BoundTest;

use std::io::{self, Write};
use std::time::Instant;

use thiserror::Error;

use crate::config::TestbedConfig;
use crate::registry::Suite;
use crate::report::Reporter;
use crate::sandbox::{create_sandbox, DiagnosticChannel, Sandbox, SandboxError, DEFAULT_CAPACITY};
use crate::telemetry::{RunSpan, SpanExt};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("isolation failed while running {test}: {source}")]
    Sandbox {
        test: String,
        #[source]
        source: SandboxError,
    },

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

/// Results of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// One entry per registered test, in execution order.
    pub results: Vec<ExecutionResult>,
}

/// Sequential test runner.
pub struct Runner<W: Write> {
    sandbox: Box<dyn Sandbox>,
    reporter: Reporter<W>,
    channel_capacity: usize,
}

impl<W: Write> Runner<W> {
    pub fn new(sandbox: Box<dyn Sandbox>, reporter: Reporter<W>) -> Self {
        Self {
            sandbox,
            reporter,
            channel_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Build a runner from the effective configuration, reporting to `out`.
    pub fn from_config(config: &TestbedConfig, out: W) -> Self {
        Self::new(
            create_sandbox(config.sandbox.clone()),
            Reporter::new(out, config.report.clone()),
        )
        .with_channel_capacity(config.diagnostic_capacity)
    }

    /// Set the diagnostic channel capacity (clamped by the channel).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn sandbox_name(&self) -> &'static str {
        self.sandbox.name()
    }

    /// Run every test in the suite.
    ///
    /// Returns an error only for infrastructure failures; failing tests are
    /// reported in the summary.
    pub fn run(&mut self, suite: &Suite) -> Result<RunReport, RunError> {
        let mut summary = RunSummary::new();
        let span = RunSpan::new(&summary.run_id.to_string(), suite.len(), self.sandbox.name());
        let _enter = span.enter();

        tracing::info!(tests = suite.len(), "starting test run");
        let result = self.drain(suite, &mut summary);
        span.record_result(&result);

        let results = result?;
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            crashed = summary.crashed,
            skipped = summary.skipped,
            "test run complete"
        );
        Ok(RunReport { summary, results })
    }

    fn drain(
        &mut self,
        suite: &Suite,
        summary: &mut RunSummary,
    ) -> Result<Vec<ExecutionResult>, RunError> {
        let started = Instant::now();
        self.reporter.banner(suite.len())?;

        let mut results = Vec::with_capacity(suite.len());
        for test in suite.tests() {
            let mut channel = DiagnosticChannel::with_capacity(self.channel_capacity);
            let result = test
                .execute(self.sandbox.as_ref(), &mut channel)
                .map_err(|source| RunError::Sandbox {
                    test: test.display_name(),
                    source,
                })?;
            summary.record(&result);
            self.reporter.result(&result)?;
            results.push(result);
        }

        summary.finish(started.elapsed());
        self.reporter.summary(summary)?;
        Ok(results)
    }

    pub fn reporter(&self) -> &Reporter<W> {
        &self.reporter
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }
}
