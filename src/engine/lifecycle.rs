//! Per-test lifecycle: setup, isolated body, teardown.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crate::registry::{display_name, Body, CaseBinding, FixtureSlots};
use crate::sandbox::{
    contain, DiagnosticChannel, IsolatedRun, Outcome, Sandbox, SandboxError, Teardown, Verdict,
};
use crate::telemetry::{SpanExt, TestSpan};

use super::result::{ExecutionResult, TestStatus, Timing};

/// Lifecycle states of one test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    SettingUp,
    Running,
    TearingDown,
    Done,
}

impl LifecycleState {
    /// Whether `self -> next` is a legal transition.
    ///
    /// Setup may go straight to teardown when it halts the test.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (NotStarted, SettingUp)
                | (SettingUp, Running)
                | (SettingUp, TearingDown)
                | (Running, TearingDown)
                | (TearingDown, Done)
        )
    }
}

struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: LifecycleState::NotStarted,
        }
    }

    fn advance(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal lifecycle transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
    }
}

/// A registered test, ready to execute.
pub trait Runnable: Send + Sync {
    /// Base name, without any case tag.
    fn name(&self) -> &str;

    fn fixture(&self) -> &str;

    fn case_tag(&self) -> Option<&str>;

    /// Report name: base name plus case tag.
    fn display_name(&self) -> String {
        display_name(self.name(), self.case_tag())
    }

    /// Run the full lifecycle once.
    ///
    /// Teardown has always run by the time this returns, including when the
    /// sandbox fails.
    fn execute(
        &self,
        sandbox: &dyn Sandbox,
        channel: &mut DiagnosticChannel,
    ) -> Result<ExecutionResult, SandboxError>;
}

/// A test body bound to its fixture's hooks and data type.
pub(crate) struct BoundTest<T> {
    name: String,
    slots: Arc<FixtureSlots<T>>,
    body: Body<T>,
    case: Option<CaseBinding<T>>,
    _data: PhantomData<fn() -> T>,
}

impl<T: Default + 'static> BoundTest<T> {
    pub(crate) fn new(
        name: String,
        slots: Arc<FixtureSlots<T>>,
        body: Body<T>,
        case: Option<CaseBinding<T>>,
    ) -> Self {
        Self {
            name,
            slots,
            body,
            case,
            _data: PhantomData,
        }
    }

    /// Fixture setup, then the case initializer if any.
    fn setup(&self, data: &mut T) {
        self.slots.setup(data);
        if let Some(case) = &self.case {
            (case.init)(data);
        }
    }

    /// Run teardown, returning a description of any fault it raised.
    ///
    /// May run inside a forked child, so it neither logs nor writes to the
    /// std streams.
    fn run_teardown(&self, data: &mut T) -> Option<String> {
        let mut scratch = DiagnosticChannel::default();
        let verdict = contain(&mut || self.slots.teardown(&mut *data), &mut scratch);
        let fault = match verdict {
            Verdict::Passed => return None,
            Verdict::Failed => format!("assertion failed in teardown: {}", scratch.message()),
            Verdict::Skipped => format!("skip directive in teardown: {}", scratch.message()),
            Verdict::Panicked => format!("teardown {}", scratch.message()),
        };
        Some(fault)
    }
}

/// Body and teardown of one test over its fixture instance.
struct Execution<'a, T> {
    test: &'a BoundTest<T>,
    data: &'a mut T,
}

impl<T: Default + 'static> IsolatedRun for Execution<'_, T> {
    fn run_body(&mut self) {
        (self.test.body)(&mut *self.data);
    }

    fn teardown(&mut self) -> Option<String> {
        self.test.run_teardown(&mut *self.data)
    }
}

impl<T: Default + 'static> Runnable for BoundTest<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fixture(&self) -> &str {
        self.slots.name()
    }

    fn case_tag(&self) -> Option<&str> {
        self.case.as_ref().map(|c| c.tag.as_str())
    }

    fn execute(
        &self,
        sandbox: &dyn Sandbox,
        channel: &mut DiagnosticChannel,
    ) -> Result<ExecutionResult, SandboxError> {
        let display = self.display_name();
        let span = TestSpan::new(self.fixture(), &display);
        let _enter = span.enter();
        let mut lifecycle = Lifecycle::new();

        let mut data: Box<T> = Box::default();

        lifecycle.advance(LifecycleState::SettingUp);
        let setup = contain(&mut || self.setup(&mut *data), channel);

        let (ran, teardown) = match setup {
            Verdict::Passed => {
                lifecycle.advance(LifecycleState::Running);
                let started = Instant::now();
                let mut execution = Execution {
                    test: self,
                    data: &mut *data,
                };
                let report = sandbox.execute(&mut execution, channel);
                let wall = started.elapsed();
                lifecycle.advance(LifecycleState::TearingDown);
                match report {
                    Ok(report) => {
                        let status = classify(&report.outcome, channel);
                        let timing = Timing {
                            wall,
                            cpu: report.cpu_time,
                        };
                        (Ok((status, Some(timing))), report.teardown)
                    }
                    Err(err) => (Err(err), Teardown::Pending),
                }
            }
            halted => {
                lifecycle.advance(LifecycleState::TearingDown);
                (Ok((classify_setup(halted, channel), None)), Teardown::Pending)
            }
        };

        // Pending: setup halted, the sandbox failed, or the isolated context
        // crashed with its copy of the instance. Tear down the one we hold.
        let teardown_fault = match teardown {
            Teardown::Done(fault) => fault,
            Teardown::Pending => self.run_teardown(&mut data),
        };
        if let Some(fault) = &teardown_fault {
            let test_name = &display;
            tracing::error!(
                fixture = self.slots.name(),
                test = %test_name,
                fault = %fault,
                "teardown fault"
            );
        }
        drop(data);
        lifecycle.advance(LifecycleState::Done);

        let (status, timing) = ran?;
        let message = match status {
            TestStatus::Passed => String::new(),
            _ => channel.take(),
        };
        let result = ExecutionResult {
            name: display,
            fixture: self.fixture().to_string(),
            case: self.case_tag().map(str::to_string),
            status,
            message,
            timing,
            teardown_fault,
        };
        span.record_execution(&result);
        Ok(result)
    }
}

/// Map a sandbox outcome onto a status, making sure non-passing statuses
/// carry a message.
fn classify(outcome: &Outcome, channel: &mut DiagnosticChannel) -> TestStatus {
    match outcome {
        Outcome::Completed(Verdict::Passed) => TestStatus::Passed,
        Outcome::Completed(Verdict::Failed) => {
            ensure_message(channel, "assertion failed");
            TestStatus::Failed
        }
        Outcome::Completed(Verdict::Skipped) => {
            ensure_message(channel, "skipped");
            TestStatus::Skipped
        }
        Outcome::Completed(Verdict::Panicked) => {
            ensure_message(channel, "panicked");
            TestStatus::Crashed
        }
        Outcome::Crashed(fault) => {
            // A crashed context never finished writing; the fault is the message.
            channel.take();
            channel.write(&fault.to_string());
            TestStatus::Crashed
        }
    }
}

fn classify_setup(verdict: Verdict, channel: &mut DiagnosticChannel) -> TestStatus {
    match verdict {
        Verdict::Passed => TestStatus::Passed,
        Verdict::Failed => {
            ensure_message(channel, "assertion failed in setup");
            TestStatus::Failed
        }
        Verdict::Skipped => {
            ensure_message(channel, "skipped in setup");
            TestStatus::Skipped
        }
        Verdict::Panicked => {
            let message = channel.take();
            channel.write(&format!("setup {}", message));
            TestStatus::Crashed
        }
    }
}

fn ensure_message(channel: &mut DiagnosticChannel, fallback: &str) {
    if channel.message().is_empty() {
        channel.take();
        channel.write(fallback);
    }
}
