//! Telemetry for test runs.
//!
//! Structured logging through `tracing`, plus span factories for runs and
//! individual tests. Nothing here writes to the report stream.

mod logging;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use spans::{RunSpan, SpanExt, TestSpan};
