//! Per-test results and run-wide counters.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Final classification of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Crashed,
}

impl TestStatus {
    /// Report keyword.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Skipped => "SKIP",
            Self::Crashed => "CRASH",
        }
    }

    /// Failed and crashed tests both count against the suite.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Crashed)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Durations of a test body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    #[serde(rename = "wall_ms", serialize_with = "millis")]
    pub wall: Duration,
    /// Only measured when the body ran in its own process.
    #[serde(rename = "cpu_ms", serialize_with = "opt_millis")]
    pub cpu: Option<Duration>,
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

fn opt_millis<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => millis(d, s),
        None => s.serialize_none(),
    }
}

/// Outcome of one test execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Report name, including the case tag for parameterized tests.
    pub name: String,
    pub fixture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    pub status: TestStatus,
    /// Empty for passed tests; the diagnostic, skip reason or fault otherwise.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    /// Set when teardown itself failed. Does not change `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_fault: Option<String>,
}

/// Running counts for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub passed: u64,
    /// Includes crashed tests.
    pub failed: u64,
    pub crashed: u64,
    pub skipped: u64,
    pub teardown_faults: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            passed: 0,
            failed: 0,
            crashed: 0,
            skipped: 0,
            teardown_faults: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Count one finished test.
    pub fn record(&mut self, result: &ExecutionResult) {
        match result.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Crashed => {
                self.failed += 1;
                self.crashed += 1;
            }
            TestStatus::Skipped => self.skipped += 1,
        }
        if result.teardown_fault.is_some() {
            self.teardown_faults += 1;
        }
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Number of tests recorded.
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.skipped
    }

    /// The suite succeeds when nothing failed or crashed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
