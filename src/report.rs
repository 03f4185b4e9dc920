//! Turning an intercepted failure into a diagnostic report.
//!
//! A report has a version section and an error section. Both go to the
//! console and to `<store>/<tool>.log`; the console gets a one-line summary
//! and a pointer to the log, the log gets the full trace.

use crate::console::Console;
use crate::error::{Failure, ReportError};
use crate::store::StorageDirectory;
use std::env;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Exit status for every intercepted failure, whatever its kind.
pub const EXIT_FAILURE: i32 = 1;

/// Name and version of the tool that owns the guarded region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// This crate's own name and version.
    pub fn current() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.name)
    }
}

/// The compiler and executable behind the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub version: String,
    pub executable: String,
}

impl RuntimeInfo {
    pub fn current() -> Self {
        let executable = env::current_exe()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|err| format!("<unknown: {err}>"));

        Self {
            version: env!("FAILGUARD_RUNTIME_VERSION").to_string(),
            executable,
        }
    }
}

/// One intercepted failure, rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub version_section: Vec<String>,
    pub summary: String,
    pub trace: String,
    pub log_path: PathBuf,
}

impl DiagnosticReport {
    pub fn new(
        tool: &ToolInfo,
        runtime: &RuntimeInfo,
        header: &str,
        failure: &Failure,
        trace: &str,
        log_path: PathBuf,
    ) -> Self {
        let version_section = vec![
            "### version information".to_string(),
            format!("{}.version={}", tool.name, tool.version),
            format!("sys.version={}", runtime.version),
            format!("sys.executable={}", runtime.executable),
        ];

        Self {
            version_section,
            summary: summary_line(header, failure.kind(), &failure.message()),
            trace: trace.trim_end_matches(['\r', '\n']).to_string(),
            log_path,
        }
    }

    /// What the user sees: versions, the summary, and where to look next.
    pub fn console_lines(&self) -> Vec<String> {
        let mut lines = self.version_section.clone();
        lines.push("### error information".to_string());
        lines.push(self.summary.clone());
        lines.push(format!("Check the log at {}", self.log_path.display()));
        lines
    }

    /// What the log keeps: versions, the summary, and the full trace.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = self.version_section.clone();
        lines.push("### error information".to_string());
        lines.push(self.summary.clone());
        lines.extend(self.trace.lines().map(str::to_string));
        lines
    }
}

/// `<header>: <kind>: <message>`
pub fn summary_line(header: &str, kind: &str, message: &str) -> String {
    format!("{header}: {kind}: {message}")
}

/// Splits a summary line back into header, kind and message. Only the first two
/// delimiters are significant, so the message may itself contain `": "`.
pub fn parse_summary_line(line: &str) -> Option<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ": ");
    Some((parts.next()?, parts.next()?, parts.next()?))
}

/// Writes diagnostic reports and ends the process.
pub struct Reporter<S, C> {
    tool: ToolInfo,
    runtime: RuntimeInfo,
    store: S,
    console: C,
}

impl<S, C> Reporter<S, C>
where
    S: StorageDirectory,
    C: Console,
{
    pub fn new(tool: ToolInfo, store: S, console: C) -> Self {
        Self {
            tool,
            runtime: RuntimeInfo::current(),
            store,
            console,
        }
    }

    /// Replaces the compiler and executable lines of every report, for hosts
    /// that ship their own build metadata or need reproducible reports.
    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = runtime;
        self
    }

    /// Emits the report for one failure to the console and the log file and
    /// returns the log path. The log is opened for append, so earlier reports
    /// survive.
    pub fn report(
        &mut self,
        header: &str,
        failure: &Failure,
        trace: &str,
    ) -> Result<PathBuf, ReportError> {
        let log_path = self.store.directory()?.join(self.tool.log_file_name());
        let report =
            DiagnosticReport::new(&self.tool, &self.runtime, header, failure, trace, log_path);

        for line in report.console_lines() {
            self.console.write_line(&line);
        }

        append_lines(&report.log_path, &report.log_lines())?;
        tracing::debug!(path = %report.log_path.display(), kind = failure.kind(), "wrote diagnostic report");

        Ok(report.log_path)
    }

    /// Reports the failure and exits with [`EXIT_FAILURE`]. Never returns.
    ///
    /// If the report itself cannot be written, that error goes to the console
    /// and the process exits with the same status.
    pub fn log_and_exit(mut self, header: &str, failure: &Failure, trace: &str) -> ! {
        if let Err(err) = self.report(header, failure, trace) {
            let err = anyhow::Error::new(err);
            self.console.write_line(&format!("{}: {err:#}", self.tool.name));
        }
        process::exit(EXIT_FAILURE)
    }
}

fn append_lines(path: &Path, lines: &[String]) -> Result<(), ReportError> {
    let log_error = |source| ReportError::Log {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_error)?;

    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}").map_err(log_error)?;
    }
    writer.flush().map_err(log_error)
}
