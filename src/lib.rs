//! GG-TESTBED
//!
//! A unit-test execution engine: fixtures with per-test data, fail-fast
//! assertions with type-directed diagnostics, parameterized tests, and
//! per-test crash isolation.
//!
//! # Design Principles
//!
//! - **Isolated**: Each test body runs in its own child process by default;
//!   a crash is a result, not the end of the run
//! - **Fresh**: Every test gets a new fixture instance; nothing leaks between tests
//! - **Ordered**: Tests run one at a time, in registration order
//! - **Explained**: Every failure carries both operand values and the expression
//!
//! # Quick Start
//!
//! ```no_run
//! use gg_testbed::config::TestbedConfig;
//! use gg_testbed::engine::Runner;
//! use gg_testbed::registry::Registry;
//! use gg_testbed::{require_eq, skip_if};
//!
//! let mut registry = Registry::new();
//! let numbers = registry.register_fixture::<Vec<u32>>("numbers")?;
//! registry.override_setup(numbers, |data| data.extend([1, 2, 3]))?;
//! registry.test(numbers, "sum", |data| require_eq!(data.iter().sum::<u32>(), 6))?;
//! registry.test(numbers, "windows_only", |_| skip_if!(!cfg!(windows), "needs Windows"))?;
//!
//! let suite = registry.seal();
//! let mut runner = Runner::from_config(&TestbedConfig::default(), std::io::stdout());
//! let report = runner.run(&suite)?;
//! assert!(report.summary.is_success());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assert;
pub mod cli;
pub mod config;
pub mod demo;
pub mod engine;
pub mod registry;
pub mod report;
pub mod sandbox;
pub mod telemetry;

pub use assert::{CmpOp, Halt};
pub use config::TestbedConfig;
pub use engine::{ExecutionResult, RunReport, RunSummary, Runner, TestStatus};
pub use registry::{FixtureId, ParamCase, Registry, RegistryError, Suite, TestDescriptor};
pub use report::{ReportConfig, ReportFormat, Reporter};
pub use sandbox::{IsolationMode, SandboxConfig};
