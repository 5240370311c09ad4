//! Test-run configuration.
//!
//! Values come from, in rising precedence: built-in defaults, an optional
//! TOML file, `GG_TESTBED_*` environment variables, and CLI flags. Invalid
//! environment values fall back to the lower layer without failing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GG_TESTBED_MONOCHROME` | false | Disable color styling (`NO_COLOR` also honored) |
//! | `GG_TESTBED_OMIT_RUNTIME` | false | Hide timing fields |
//! | `GG_TESTBED_OMIT_SUCCESSES` | false | Hide lines for passed tests |
//! | `GG_TESTBED_FORMAT` | text | Report format (`text` or `json`) |
//! | `GG_TESTBED_ISOLATION` | fork | Isolation backend (`fork` or `inline`) |
//! | `GG_TESTBED_DIAGNOSTIC_CAPACITY` | 1024 | Diagnostic bytes, clamped to [64, 8192] |
//! | `GG_TESTBED_TIMEOUT_MS` | 0 | Per-test timeout in ms (0 disables) |
//! | `GG_TESTBED_LOG` | warn | `tracing` env-filter directive |
//! | `GG_TESTBED_LOG_FORMAT` | pretty | Log format (`pretty` or `json`) |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::{ReportConfig, ReportFormat};
use crate::sandbox::{IsolationMode, SandboxConfig, DEFAULT_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
use crate::telemetry::{LogConfig, LogFormat};

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Effective configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestbedConfig {
    pub report: ReportConfig,
    pub sandbox: SandboxConfig,
    pub diagnostic_capacity: usize,
    pub log: LogConfig,
}

impl Default for TestbedConfig {
    fn default() -> Self {
        Self {
            report: ReportConfig::default(),
            sandbox: SandboxConfig::default(),
            diagnostic_capacity: DEFAULT_CAPACITY,
            log: LogConfig::default(),
        }
    }
}

/// Serializable summary of all effective values.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub monochrome: bool,
    pub omit_runtime: bool,
    pub omit_successes: bool,
    pub format: ReportFormat,
    pub isolation: IsolationMode,
    pub diagnostic_capacity: usize,
    pub timeout_ms: u64,
    pub log: String,
    pub log_format: LogFormat,
}

/// On-disk configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub monochrome: Option<bool>,
    pub omit_runtime: Option<bool>,
    pub omit_successes: Option<bool>,
    pub format: Option<ReportFormat>,
    pub isolation: Option<IsolationMode>,
    pub diagnostic_capacity: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub log: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var (`1/0`, `true/false`, `yes/no`, `on/off`).
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn parse_format(key: &str, default: ReportFormat) -> ReportFormat {
    match std::env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if v == "text" => ReportFormat::Text,
        Ok(v) if v == "json" => ReportFormat::Json,
        _ => default,
    }
}

fn parse_isolation(key: &str, default: IsolationMode) -> IsolationMode {
    match std::env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if v == "fork" => IsolationMode::Fork,
        Ok(v) if v == "inline" => IsolationMode::Inline,
        _ => default,
    }
}

fn parse_log_format(key: &str, default: LogFormat) -> LogFormat {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Load configuration from environment variables over defaults.
pub fn load() -> TestbedConfig {
    load_layered(&FileConfig::default())
}

/// Load configuration from environment variables over `file` over defaults.
///
/// Missing or invalid environment values fall back without panicking.
pub fn load_layered(file: &FileConfig) -> TestbedConfig {
    let base = TestbedConfig::default();

    let monochrome = parse_bool(
        "GG_TESTBED_MONOCHROME",
        file.monochrome.unwrap_or(base.report.monochrome),
    ) || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    let report = ReportConfig {
        monochrome,
        omit_runtime: parse_bool(
            "GG_TESTBED_OMIT_RUNTIME",
            file.omit_runtime.unwrap_or(base.report.omit_runtime),
        ),
        omit_successes: parse_bool(
            "GG_TESTBED_OMIT_SUCCESSES",
            file.omit_successes.unwrap_or(base.report.omit_successes),
        ),
        format: parse_format(
            "GG_TESTBED_FORMAT",
            file.format.unwrap_or(base.report.format),
        ),
    };

    let timeout_ms = parse_u64("GG_TESTBED_TIMEOUT_MS", file.timeout_ms.unwrap_or(0));
    let sandbox = SandboxConfig {
        mode: parse_isolation(
            "GG_TESTBED_ISOLATION",
            file.isolation.unwrap_or(base.sandbox.mode),
        ),
        timeout: timeout_from_ms(timeout_ms),
    };

    let capacity = parse_usize(
        "GG_TESTBED_DIAGNOSTIC_CAPACITY",
        file.diagnostic_capacity.unwrap_or(base.diagnostic_capacity),
    );
    let diagnostic_capacity = capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);

    let log = LogConfig {
        level: std::env::var("GG_TESTBED_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| file.log.clone())
            .unwrap_or(base.log.level),
        format: parse_log_format(
            "GG_TESTBED_LOG_FORMAT",
            file.log_format.unwrap_or(base.log.format),
        ),
    };

    TestbedConfig {
        report,
        sandbox,
        diagnostic_capacity,
        log,
    }
}

impl TestbedConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            monochrome: self.report.monochrome,
            omit_runtime: self.report.omit_runtime,
            omit_successes: self.report.omit_successes,
            format: self.report.format,
            isolation: self.sandbox.mode,
            diagnostic_capacity: self.diagnostic_capacity,
            timeout_ms: self
                .sandbox
                .timeout
                .map_or(0, |t| t.as_millis() as u64),
            log: self.log.level.clone(),
            log_format: self.log.format,
        }
    }
}

// Serializes env-mutating tests across modules.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: &[&str] = &[
        "GG_TESTBED_MONOCHROME",
        "GG_TESTBED_OMIT_RUNTIME",
        "GG_TESTBED_OMIT_SUCCESSES",
        "GG_TESTBED_FORMAT",
        "GG_TESTBED_ISOLATION",
        "GG_TESTBED_DIAGNOSTIC_CAPACITY",
        "GG_TESTBED_TIMEOUT_MS",
        "GG_TESTBED_LOG",
        "GG_TESTBED_LOG_FORMAT",
        "NO_COLOR",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        let cfg = load();
        assert!(!cfg.report.monochrome);
        assert!(!cfg.report.omit_runtime);
        assert!(!cfg.report.omit_successes);
        assert_eq!(cfg.report.format, ReportFormat::Text);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Fork);
        assert_eq!(cfg.sandbox.timeout, None);
        assert_eq!(cfg.diagnostic_capacity, 1024);
        assert_eq!(cfg.log.level, "warn");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("GG_TESTBED_MONOCHROME", "1");
        std::env::set_var("GG_TESTBED_OMIT_SUCCESSES", "true");
        std::env::set_var("GG_TESTBED_FORMAT", "json");
        std::env::set_var("GG_TESTBED_ISOLATION", "inline");
        std::env::set_var("GG_TESTBED_TIMEOUT_MS", "2500");
        std::env::set_var("GG_TESTBED_LOG_FORMAT", "json");
        let cfg = load();
        assert!(cfg.report.monochrome);
        assert!(cfg.report.omit_successes);
        assert_eq!(cfg.report.format, ReportFormat::Json);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Inline);
        assert_eq!(cfg.sandbox.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(cfg.log.format, LogFormat::Json);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("GG_TESTBED_DIAGNOSTIC_CAPACITY", "lots");
        std::env::set_var("GG_TESTBED_ISOLATION", "container");
        std::env::set_var("GG_TESTBED_MONOCHROME", "maybe");
        let cfg = load();
        assert_eq!(cfg.diagnostic_capacity, 1024);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Fork);
        assert!(!cfg.report.monochrome);
        clear_env_vars();
    }

    #[test]
    fn test_capacity_is_clamped() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("GG_TESTBED_DIAGNOSTIC_CAPACITY", "1");
        assert_eq!(load().diagnostic_capacity, MIN_CAPACITY);
        std::env::set_var("GG_TESTBED_DIAGNOSTIC_CAPACITY", "999999");
        assert_eq!(load().diagnostic_capacity, MAX_CAPACITY);
        clear_env_vars();
    }

    #[test]
    fn test_no_color_forces_monochrome() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("NO_COLOR", "1");
        assert!(load().report.monochrome);
        clear_env_vars();
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        let file = FileConfig::parse(
            "format = \"json\"\nisolation = \"inline\"\ntimeout_ms = 100\n",
        )
        .unwrap();
        let cfg = load_layered(&file);
        assert_eq!(cfg.report.format, ReportFormat::Json);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Inline);
        assert_eq!(cfg.sandbox.timeout, Some(Duration::from_millis(100)));

        std::env::set_var("GG_TESTBED_ISOLATION", "fork");
        std::env::set_var("GG_TESTBED_TIMEOUT_MS", "0");
        let cfg = load_layered(&file);
        assert_eq!(cfg.sandbox.mode, IsolationMode::Fork);
        assert_eq!(cfg.sandbox.timeout, None);
        clear_env_vars();
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        assert!(matches!(
            FileConfig::parse("colour = true\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_effective_config_round_trips_timeout() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("GG_TESTBED_TIMEOUT_MS", "750");
        let eff = load().effective_config();
        assert_eq!(eff.timeout_ms, 750);
        assert_eq!(eff.isolation, IsolationMode::Fork);
        clear_env_vars();
    }
}
