// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! `run` and `list` subcommands over the bundled demonstration suite.

use std::io;

use super::{CliError, RunArgs};
use crate::demo;
use crate::engine::Runner;
use crate::sandbox::IsolationMode;
use crate::telemetry::{init_logging, LogError};

/// Run the suite and return the process exit code.
///
/// 0 when no test failed or crashed, 1 otherwise, 2 for configuration or
/// infrastructure errors.
pub fn run_suite(args: &RunArgs) -> i32 {
    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    match init_logging(&config.log) {
        Ok(()) | Err(LogError::AlreadyInitialized) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    }

    let suite = match demo::suite(config.sandbox.mode) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            return 2;
        }
    };

    let mut runner = Runner::from_config(&config, io::stdout());
    match runner.run(&suite) {
        Ok(report) if report.summary.is_success() => 0,
        Ok(_) => 1,
        Err(e) => {
            tracing::error!(error = %e, "test run aborted");
            eprintln!("Error: {}", e);
            2
        }
    }
}

/// Print `fixture.test` names in execution order.
pub fn run_list() -> i32 {
    match demo::suite(IsolationMode::default()) {
        Ok(suite) => {
            for (fixture, test) in suite.listing() {
                println!("{}.{}", fixture, test);
            }
            println!("{} test(s)", suite.len());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            2
        }
    }
}
