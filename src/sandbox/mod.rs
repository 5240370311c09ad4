//! Isolation layer for test bodies.
//!
//! A [`Sandbox`] runs one test body so that its failures, including hard
//! faults on platforms that support process isolation, never reach the
//! orchestrator. The body's diagnostic crosses the boundary through a
//! [`DiagnosticChannel`].

mod channel;
mod inline;
#[cfg(unix)]
mod unix;

pub use channel::{DiagnosticChannel, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
pub use inline::InlineSandbox;
#[cfg(unix)]
pub use unix::{ForkSandbox, EXIT_FAILED, EXIT_PANICKED, EXIT_PASSED, EXIT_SKIPPED};

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assert::Halt;

/// Isolation backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// One child process per test.
    #[default]
    Fork,
    /// Same thread as the orchestrator, panics contained by unwinding.
    Inline,
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fork => f.write_str("fork"),
            Self::Inline => f.write_str("inline"),
        }
    }
}

/// Configuration for test isolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxConfig {
    pub mode: IsolationMode,
    /// Per-test deadline. Only the fork backend enforces it.
    pub timeout: Option<Duration>,
}

/// How a body ended when it ended under its own control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// An assertion halted the body.
    Failed,
    /// A skip directive halted the body.
    Skipped,
    /// The body panicked with an ordinary panic.
    Panicked,
}

/// A fault that ended the isolated context without a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Signal { number: i32, name: &'static str },
    UnexpectedExit(i32),
    TimedOut(Duration),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal { number, name } => write!(f, "signal {} ({})", number, name),
            Self::UnexpectedExit(code) => write!(f, "unexpected exit status {}", code),
            Self::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
        }
    }
}

/// Classified end of an isolated execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Verdict),
    Crashed(Fault),
}

/// Where teardown stands when the isolated context ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// Teardown ran on the instance the body used; carries its fault, if any.
    Done(Option<String>),
    /// The context ended before teardown ran. The caller tears down its own
    /// copy of the instance.
    Pending,
}

/// Result of one isolated execution.
#[derive(Debug, Clone)]
pub struct SandboxReport {
    pub outcome: Outcome,
    /// CPU time consumed by the isolated context, if the backend measures it.
    pub cpu_time: Option<Duration>,
    pub teardown: Teardown,
}

/// Infrastructure failures of the isolation layer.
///
/// These are not test outcomes; the engine treats them as fatal.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create isolated context: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to wait for isolated context: {0}")]
    Wait(#[source] io::Error),

    #[error("diagnostic channel I/O failed: {0}")]
    Channel(#[source] io::Error),
}

/// The part of a test that runs inside the isolation boundary.
///
/// Both steps share one fixture instance, so teardown observes whatever the
/// body left behind.
pub trait IsolatedRun {
    fn run_body(&mut self);

    /// Returns a description of any fault.
    fn teardown(&mut self) -> Option<String>;
}

/// Platform-agnostic isolation backend.
pub trait Sandbox: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Run the body and then teardown in isolation, leaving any diagnostic
    /// the body produced in `channel`.
    fn execute(
        &self,
        run: &mut dyn IsolatedRun,
        channel: &mut DiagnosticChannel,
    ) -> Result<SandboxReport, SandboxError>;
}

/// Create the sandbox for the current platform and configured mode.
pub fn create_sandbox(config: SandboxConfig) -> Box<dyn Sandbox> {
    #[cfg(unix)]
    {
        match config.mode {
            IsolationMode::Fork => Box::new(ForkSandbox::new(config.timeout)),
            IsolationMode::Inline => Box::new(InlineSandbox::new(config.timeout)),
        }
    }
    #[cfg(not(unix))]
    {
        if config.mode == IsolationMode::Fork {
            tracing::warn!("process isolation unavailable on this platform, running tests inline");
        }
        Box::new(InlineSandbox::new(config.timeout))
    }
}

/// Run `body` on the current thread, catching the halt and panic unwinds.
pub(crate) fn contain(body: &mut dyn FnMut(), channel: &mut DiagnosticChannel) -> Verdict {
    let payload = match panic::catch_unwind(AssertUnwindSafe(|| body())) {
        Ok(()) => return Verdict::Passed,
        Err(payload) => payload,
    };
    match payload.downcast::<Halt>() {
        Ok(halt) => match *halt {
            Halt::Failed(message) => {
                channel.write(&message);
                Verdict::Failed
            }
            Halt::Skipped(reason) => {
                channel.write(&reason);
                Verdict::Skipped
            }
        },
        Err(payload) => {
            channel.write(&format!("panicked: {}", panic_message(payload.as_ref())));
            Verdict::Panicked
        }
    }
}

/// Run `run.teardown()`, reporting an unwind out of it as a fault.
pub(crate) fn contain_teardown(run: &mut dyn IsolatedRun) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(|| run.teardown())).unwrap_or_else(|payload| {
        Some(format!("teardown panicked: {}", panic_message(payload.as_ref())))
    })
}

/// Extract the message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Flush buffered standard output so a forked child cannot repeat it.
///
/// Parent side only: the child must not touch the std stream locks.
#[cfg(unix)]
pub(crate) fn flush_std_streams() {
    use std::io::Write;

    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}
