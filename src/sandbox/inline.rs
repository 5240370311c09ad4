//! In-process isolation.
//!
//! Contains panics and assertion unwinds only. A hardware fault in the body
//! takes the whole process down.

use std::time::Duration;

use super::{
    contain, contain_teardown, DiagnosticChannel, IsolatedRun, Outcome, Sandbox, SandboxError,
    SandboxReport, Teardown,
};

/// Runs test bodies on the orchestrator's thread.
#[derive(Debug, Default)]
pub struct InlineSandbox;

impl InlineSandbox {
    /// Create an inline sandbox. A timeout cannot be enforced without a
    /// separate process and is ignored.
    pub fn new(timeout: Option<Duration>) -> Self {
        if let Some(limit) = timeout {
            tracing::warn!(
                timeout_ms = limit.as_millis() as u64,
                "inline isolation does not enforce per-test timeouts"
            );
        }
        Self
    }
}

impl Sandbox for InlineSandbox {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn execute(
        &self,
        run: &mut dyn IsolatedRun,
        channel: &mut DiagnosticChannel,
    ) -> Result<SandboxReport, SandboxError> {
        let before = process_cpu_time();
        let verdict = contain(&mut || run.run_body(), channel);
        // Process-wide, so other threads' work is included.
        let cpu_time = match (before, process_cpu_time()) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        };
        let fault = contain_teardown(run);
        Ok(SandboxReport {
            outcome: Outcome::Completed(verdict),
            cpu_time,
            teardown: Teardown::Done(fault),
        })
    }
}

#[cfg(unix)]
fn process_cpu_time() -> Option<Duration> {
    super::unix::self_cpu_time()
}

#[cfg(not(unix))]
fn process_cpu_time() -> Option<Duration> {
    None
}
