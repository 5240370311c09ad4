// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read the same layers as `run` (file, environment, flags)
//! without running anything.

use tracing_subscriber::EnvFilter;

use super::RunArgs;
use crate::config::{EffectiveConfig, TestbedConfig};
use crate::sandbox::{IsolationMode, MAX_CAPACITY, MIN_CAPACITY};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(args: &RunArgs) -> i32 {
    match args.resolve() {
        Ok(cfg) => {
            print_config(&cfg.effective_config());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}

/// Print default config values (no file, env or flag overrides).
pub fn run_defaults() {
    print_config(&TestbedConfig::default().effective_config());
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found, 2 if the config file
/// cannot be loaded.
pub fn run_validate(args: &RunArgs) -> i32 {
    let cfg = match args.resolve() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };
    let warnings = validate(&cfg);
    for warning in &warnings {
        eprintln!("WARNING: {}", warning);
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

/// Collect warnings about the effective config and the raw environment.
///
/// Invalid environment values never fail a run (they fall back), so this is
/// the place where they become visible.
pub fn validate(cfg: &TestbedConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if cfg.sandbox.mode == IsolationMode::Inline && cfg.sandbox.timeout.is_some() {
        warnings.push(
            "GG_TESTBED_TIMEOUT_MS is set but inline isolation cannot enforce it".to_string(),
        );
    }

    if EnvFilter::try_new(&cfg.log.level).is_err() {
        warnings.push(format!("GG_TESTBED_LOG is not a valid filter: {}", cfg.log.level));
    }

    for key in [
        "GG_TESTBED_MONOCHROME",
        "GG_TESTBED_OMIT_RUNTIME",
        "GG_TESTBED_OMIT_SUCCESSES",
    ] {
        if let Ok(val) = std::env::var(key) {
            let val = val.trim().to_ascii_lowercase();
            if !matches!(
                val.as_str(),
                "1" | "0" | "true" | "false" | "yes" | "no" | "on" | "off"
            ) {
                warnings.push(format!("{} is not a boolean: {}", key, val));
            }
        }
    }

    check_choice(&mut warnings, "GG_TESTBED_FORMAT", &["text", "json"]);
    check_choice(&mut warnings, "GG_TESTBED_ISOLATION", &["fork", "inline"]);
    check_choice(&mut warnings, "GG_TESTBED_LOG_FORMAT", &["pretty", "json"]);

    if let Ok(val) = std::env::var("GG_TESTBED_DIAGNOSTIC_CAPACITY") {
        match val.trim().parse::<usize>() {
            Ok(n) if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&n) => warnings.push(format!(
                "GG_TESTBED_DIAGNOSTIC_CAPACITY ({}) clamped to {}",
                n, cfg.diagnostic_capacity
            )),
            Ok(_) => {}
            Err(_) => warnings.push(format!(
                "GG_TESTBED_DIAGNOSTIC_CAPACITY is not a number: {}",
                val
            )),
        }
    }

    if let Ok(val) = std::env::var("GG_TESTBED_TIMEOUT_MS") {
        if val.trim().parse::<u64>().is_err() {
            warnings.push(format!("GG_TESTBED_TIMEOUT_MS is not a number: {}", val));
        }
    }

    warnings
}

fn check_choice(warnings: &mut Vec<String>, key: &str, choices: &[&str]) {
    if let Ok(val) = std::env::var(key) {
        let normalized = val.trim().to_ascii_lowercase();
        if !choices.contains(&normalized.as_str()) {
            warnings.push(format!(
                "{} must be one of {}: {}",
                key,
                choices.join("|"),
                val
            ));
        }
    }
}

fn print_config(cfg: &EffectiveConfig) {
    println!("GG_TESTBED_MONOCHROME={}", cfg.monochrome);
    println!("GG_TESTBED_OMIT_RUNTIME={}", cfg.omit_runtime);
    println!("GG_TESTBED_OMIT_SUCCESSES={}", cfg.omit_successes);
    println!("GG_TESTBED_FORMAT={}", cfg.format);
    println!("GG_TESTBED_ISOLATION={}", cfg.isolation);
    println!("GG_TESTBED_DIAGNOSTIC_CAPACITY={}", cfg.diagnostic_capacity);
    println!("GG_TESTBED_TIMEOUT_MS={}", cfg.timeout_ms);
    println!("GG_TESTBED_LOG={}", cfg.log);
    println!("GG_TESTBED_LOG_FORMAT={}", cfg.log_format);
}
