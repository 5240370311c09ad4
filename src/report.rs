//! Console and JSON test reports.

use std::fmt;
use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

use crate::engine::{ExecutionResult, RunSummary, TestStatus, Timing};

const BANNER: &str =
    "================================ BEGIN TEST RUN ================================";
const SUMMARY_HEADER: &str =
    "================================= TEST SUMMARY =================================";

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    /// One JSON object per line: a start event, one per result, a summary.
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Output-only report options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Plain text without color styling.
    pub monochrome: bool,
    /// Hide timing fields.
    pub omit_runtime: bool,
    /// Hide lines for passed tests.
    pub omit_successes: bool,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Header,
    Pass,
    Fail,
    Skip,
    Mute,
    Runtime,
    Value,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JsonEvent<'a> {
    Start { total: usize },
    Result(&'a ExecutionResult),
    Summary(&'a RunSummary),
}

/// Writes run banner, per-test lines and the final summary.
pub struct Reporter<W: Write> {
    out: W,
    config: ReportConfig,
}

impl Reporter<io::Stdout> {
    pub fn stdout(config: ReportConfig) -> Self {
        Self::new(io::stdout(), config)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, config: ReportConfig) -> Self {
        Self { out, config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Start-of-run banner.
    pub fn banner(&mut self, total: usize) -> io::Result<()> {
        match self.config.format {
            ReportFormat::Json => self.json(&JsonEvent::Start { total }),
            ReportFormat::Text => {
                let line = self.paint(BANNER, Style::Header);
                writeln!(self.out, "{}", line)?;
                self.out.flush()
            }
        }
    }

    /// One line (plus diagnostic block) for a finished test.
    pub fn result(&mut self, result: &ExecutionResult) -> io::Result<()> {
        if self.config.omit_successes && result.status == TestStatus::Passed {
            return self.teardown_fault(result);
        }
        if self.config.format == ReportFormat::Json {
            return self.json(&JsonEvent::Result(result));
        }

        let tag = status_tag(result.status);
        match result.status {
            TestStatus::Passed => {
                let line = format!(
                    "{}{} {}",
                    self.paint(tag, Style::Pass),
                    self.timing(result.timing.as_ref()),
                    result.name
                );
                writeln!(self.out, "{}", line)?;
            }
            TestStatus::Skipped => {
                let line = format!(
                    "{} {}",
                    self.paint(tag, Style::Skip),
                    self.paint(&format!("{}: {}", result.name, result.message), Style::Mute)
                );
                writeln!(self.out, "{}", line)?;
            }
            TestStatus::Failed | TestStatus::Crashed => {
                let line = format!(
                    "{}{} {}",
                    self.paint(tag, Style::Fail),
                    self.timing(result.timing.as_ref()),
                    result.name
                );
                writeln!(self.out, "{}", line)?;
                for detail in result.message.lines() {
                    writeln!(self.out, "    {}", detail)?;
                }
            }
        }
        self.teardown_fault(result)?;
        self.out.flush()
    }

    /// End-of-run summary.
    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        if self.config.format == ReportFormat::Json {
            return self.json(&JsonEvent::Summary(summary));
        }

        let mut lines = vec![String::new(), self.paint(SUMMARY_HEADER, Style::Header)];
        if summary.failed == 0 {
            lines.push(self.paint(&format!("All {} tests passed!", summary.passed), Style::Pass));
        } else {
            lines.push(format!(
                "{} {}",
                self.paint("Test(s) passed:", Style::Pass),
                summary.passed
            ));
            let mut failed = format!("{} {}", self.paint("Test(s) failed:", Style::Fail), summary.failed);
            if summary.crashed > 0 {
                failed.push_str(&format!(" ({} crashed)", summary.crashed));
            }
            lines.push(failed);
        }
        if summary.skipped > 0 {
            lines.push(format!(
                "{} {}",
                self.paint("Test(s) skipped:", Style::Value),
                summary.skipped
            ));
        }
        if summary.teardown_faults > 0 {
            lines.push(format!(
                "{} {}",
                self.paint("Teardown fault(s):", Style::Fail),
                summary.teardown_faults
            ));
        }
        if !self.config.omit_runtime {
            lines.push(self.paint(
                &format!("Elapsed: {:.3}s", summary.elapsed.as_secs_f64()),
                Style::Runtime,
            ));
        }

        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }

    fn teardown_fault(&mut self, result: &ExecutionResult) -> io::Result<()> {
        let Some(fault) = &result.teardown_fault else {
            return Ok(());
        };
        if self.config.format == ReportFormat::Json {
            // Already part of the result object unless the result was omitted.
            if self.config.omit_successes && result.status == TestStatus::Passed {
                return self.json(&JsonEvent::Result(result));
            }
            return Ok(());
        }
        let line = format!(
            "{} {}: {}",
            self.paint("[   TEARDOWN ]", Style::Fail),
            result.name,
            fault
        );
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    fn timing(&self, timing: Option<&Timing>) -> String {
        if self.config.omit_runtime {
            return String::new();
        }
        let Some(timing) = timing else {
            return String::new();
        };
        let cpu = match timing.cpu {
            Some(cpu) => format!("{:.3}s", cpu.as_secs_f64()),
            None => "--".to_string(),
        };
        let text = format!(" ({:.3}s/{})", timing.wall.as_secs_f64(), cpu);
        self.paint(&text, Style::Runtime)
    }

    fn json(&mut self, event: &JsonEvent<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.config.monochrome {
            return text.to_string();
        }
        let styled: ColoredString = match style {
            Style::Header => text.bold(),
            Style::Pass => text.green().bold(),
            Style::Fail => text.red().bold(),
            Style::Skip => text.bright_black().bold(),
            Style::Mute => text.bright_black(),
            Style::Runtime => text.cyan(),
            Style::Value => text.yellow(),
        };
        styled.to_string()
    }
}

/// Fixed-width status tag for a status.
pub fn status_tag(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Passed => "[       PASS ]",
        TestStatus::Failed => "[       FAIL ]",
        TestStatus::Skipped => "[       SKIP ]",
        TestStatus::Crashed => "[      CRASH ]",
    }
}
