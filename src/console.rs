//! Console output for diagnostic reports.
//!
//! Writing to the console must never fail the report: text that the terminal
//! may not be able to show is escaped, and write errors are dropped. The log
//! file, not the console, is the record of what happened.

use std::env;
use std::fmt::Write as _;
use std::io::{self, Write};

/// A line-oriented sink that cannot fail.
pub trait Console {
    fn write_line(&mut self, line: &str);
}

/// What the console can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConsoleEncoding {
    Utf8,
    Ascii,
}

impl ConsoleEncoding {
    /// Reads the locale the way the C library does: the first of `LC_ALL`,
    /// `LC_CTYPE`, `LANG` that is set decides.
    pub fn detect() -> Self {
        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.is_empty());

        match locale {
            Some(locale) => Self::from_locale(&locale),
            None => ConsoleEncoding::Utf8,
        }
    }

    pub fn from_locale(locale: &str) -> Self {
        if locale == "C" || locale == "POSIX" {
            return ConsoleEncoding::Ascii;
        }
        let codeset = locale
            .split('.')
            .nth(1)
            .map(|rest| rest.split('@').next().unwrap_or(rest))
            .map(|codeset| codeset.to_ascii_lowercase().replace('-', ""));
        match codeset.as_deref() {
            // No codeset given; assume UTF-8.
            None | Some("utf8") => ConsoleEncoding::Utf8,
            Some(_) => ConsoleEncoding::Ascii,
        }
    }
}

/// Makes `text` safe to print as a single line in `encoding`.
///
/// Control characters are always escaped; in ASCII mode every non-ASCII
/// character is escaped as `\u{XXXX}`.
pub fn render_line(text: &str, encoding: ConsoleEncoding) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => push_escaped(&mut out, c),
            c if !c.is_ascii() && encoding == ConsoleEncoding::Ascii => push_escaped(&mut out, c),
            c => out.push(c),
        }
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    let _ = write!(out, "\\u{{{:04x}}}", ch as u32);
}

/// The process's standard error stream.
pub struct StderrConsole {
    encoding: ConsoleEncoding,
}

impl StderrConsole {
    pub fn new(encoding: ConsoleEncoding) -> Self {
        Self { encoding }
    }
}

impl Default for StderrConsole {
    fn default() -> Self {
        Self::new(ConsoleEncoding::detect())
    }
}

impl Console for StderrConsole {
    fn write_line(&mut self, line: &str) {
        let rendered = render_line(line, self.encoding);
        let mut stderr = io::stderr().lock();
        if let Err(err) = writeln!(stderr, "{rendered}") {
            tracing::debug!(error = %err, "dropped console line");
        }
    }
}

/// Collects lines in memory; used where the output is inspected rather than shown.
#[derive(Debug, Clone)]
pub struct BufferConsole {
    pub encoding: ConsoleEncoding,
    pub lines: Vec<String>,
}

impl BufferConsole {
    pub fn new(encoding: ConsoleEncoding) -> Self {
        Self {
            encoding,
            lines: Vec::new(),
        }
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, line: &str) {
        self.lines.push(render_line(line, self.encoding));
    }
}

impl<C: Console + ?Sized> Console for &mut C {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line);
    }
}
