// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for gg-testbed commands.
//!
//! ## Usage
//!
//! ```bash
//! gg-testbed run [FLAGS]       # Run the bundled suite, exits 0 when nothing failed
//! gg-testbed list              # List registered tests in execution order
//! gg-testbed config show       # Show effective configuration
//! ```

pub mod config_cmd;
pub mod run_cmd;

pub use run_cmd::{run_list, run_suite};

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{self, ConfigError, FileConfig, TestbedConfig};
use crate::registry::RegistryError;
use crate::report::ReportFormat;
use crate::sandbox::IsolationMode;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("flag {0} requires a value")]
    MissingValue(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to register suite: {0}")]
    Registry(#[from] RegistryError),
}

/// Flags shared by `run`, `list` and `config`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    pub monochrome: bool,
    pub omit_runtime: bool,
    pub omit_successes: bool,
    pub json: bool,
    pub inline: bool,
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Parse flags following the subcommand.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut parsed = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--monochrome" | "--no-color" => parsed.monochrome = true,
                "--omit-runtime" => parsed.omit_runtime = true,
                "--omit-successes" => parsed.omit_successes = true,
                "--json" => parsed.json = true,
                "--inline" => parsed.inline = true,
                "--config" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                    parsed.config = Some(PathBuf::from(path));
                }
                other => return Err(CliError::UnknownFlag(other.to_string())),
            }
        }
        Ok(parsed)
    }

    /// Effective configuration: flags over env over file over defaults.
    pub fn resolve(&self) -> Result<TestbedConfig, CliError> {
        let file = match &self.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        let mut cfg = config::load_layered(&file);
        if self.monochrome {
            cfg.report.monochrome = true;
        }
        if self.omit_runtime {
            cfg.report.omit_runtime = true;
        }
        if self.omit_successes {
            cfg.report.omit_successes = true;
        }
        if self.json {
            cfg.report.format = ReportFormat::Json;
        }
        if self.inline {
            cfg.sandbox.mode = IsolationMode::Inline;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        let parsed = RunArgs::parse(&args(&["--monochrome", "--json", "--inline"])).unwrap();
        assert!(parsed.monochrome);
        assert!(parsed.json);
        assert!(parsed.inline);
        assert!(!parsed.omit_runtime);
        assert_eq!(parsed.config, None);
    }

    #[test]
    fn test_parse_config_path() {
        let parsed = RunArgs::parse(&args(&["--config", "testbed.toml"])).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("testbed.toml")));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(matches!(
            RunArgs::parse(&args(&["--colour"])),
            Err(CliError::UnknownFlag(flag)) if flag == "--colour"
        ));
    }

    #[test]
    fn test_parse_config_requires_value() {
        assert!(matches!(
            RunArgs::parse(&args(&["--config"])),
            Err(CliError::MissingValue(_))
        ));
    }

    #[test]
    fn test_flags_override_file() {
        let _lock = crate::config::ENV_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testbed.toml");
        std::fs::write(&path, "format = \"text\"\nisolation = \"fork\"\n").unwrap();
        let parsed = RunArgs {
            json: true,
            inline: true,
            config: Some(path),
            ..Default::default()
        };
        let cfg = parsed.resolve().unwrap();
        assert_eq!(cfg.report.format, ReportFormat::Json);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Inline);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let parsed = RunArgs {
            config: Some(PathBuf::from("/nonexistent/testbed.toml")),
            ..Default::default()
        };
        assert!(matches!(
            parsed.resolve(),
            Err(CliError::Config(ConfigError::Read { .. }))
        ));
    }
}
