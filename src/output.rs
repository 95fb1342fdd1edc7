//! Output: the reporter notified while keywords run
//!
//! The engine calls [`Output::start_keyword`] and [`Output::end_keyword`]
//! exactly once per executed step, and logs messages in between.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;

use tracing::debug;

use crate::keywords::{KeywordKind, KeywordResult, Status};

/// Message level, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Fail,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Fail => "FAIL",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "FAIL" => Ok(LogLevel::Fail),
            other => Err(format!("Invalid log level '{}'", other)),
        }
    }
}

/// What a reporter gets to see of a step when it starts or ends
#[derive(Debug, Clone, Copy)]
pub struct KeywordEvent<'a> {
    pub kind: KeywordKind,
    pub name: &'a str,
    pub args: &'a [String],
    pub result: &'a KeywordResult,
}

/// Receiver of execution notifications
pub trait Output {
    fn start_suite(&mut self, _name: &str) {}

    fn end_suite(&mut self, _name: &str, _status: Status, _message: &str) {}

    fn start_test(&mut self, _name: &str) {}

    fn end_test(&mut self, _name: &str, _status: Status, _message: &str) {}

    fn start_keyword(&mut self, kw: &KeywordEvent<'_>);

    fn end_keyword(&mut self, kw: &KeywordEvent<'_>);

    /// Log a message at `level`
    fn message(&mut self, level: LogLevel, text: &str);

    fn fail(&mut self, text: &str) {
        self.message(LogLevel::Fail, text);
    }

    fn warn(&mut self, text: &str) {
        self.message(LogLevel::Warn, text);
    }

    fn info(&mut self, text: &str) {
        self.message(LogLevel::Info, text);
    }

    fn debug(&mut self, text: &str) {
        self.message(LogLevel::Debug, text);
    }

    fn trace(&mut self, text: &str) {
        self.message(LogLevel::Trace, text);
    }
}

/// Output that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl Output for NullOutput {
    fn start_keyword(&mut self, _kw: &KeywordEvent<'_>) {}
    fn end_keyword(&mut self, _kw: &KeywordEvent<'_>) {}
    fn message(&mut self, _level: LogLevel, _text: &str) {}
}

/// In-memory textual log of an execution
#[derive(Debug, Clone)]
pub struct LogOutput {
    /// Messages below this level are not recorded
    pub level: LogLevel,
    /// The log text
    pub log: String,
    depth: usize,
}

impl Default for LogOutput {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LogOutput {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            log: String::new(),
            depth: 0,
        }
    }

    /// Append `msg` at the current indentation, one line per line
    pub fn logf(&mut self, msg: &str) {
        for line in msg.lines() {
            self.log.push_str(&"  ".repeat(self.depth));
            self.log.push_str(line);
            self.log.push('\n');
        }
        if msg.is_empty() {
            self.log.push('\n');
        }
    }
}

impl Output for LogOutput {
    fn start_suite(&mut self, name: &str) {
        self.logf(&format!("# {}", name));
    }

    fn start_test(&mut self, name: &str) {
        self.logf(&format!("## {}", name));
        self.depth += 1;
    }

    fn end_test(&mut self, name: &str, status: Status, message: &str) {
        self.depth = self.depth.saturating_sub(1);
        if message.is_empty() {
            self.logf(&format!("[{}: {}]", name, status));
        } else {
            self.logf(&format!("[{}: {}] {}", name, status, message));
        }
    }

    fn start_keyword(&mut self, kw: &KeywordEvent<'_>) {
        let line = if kw.args.is_empty() {
            format!("> {}", kw.name)
        } else {
            format!("> {}    {}", kw.name, kw.args.join("    "))
        };
        self.logf(&line);
        self.depth += 1;
    }

    fn end_keyword(&mut self, kw: &KeywordEvent<'_>) {
        self.depth = self.depth.saturating_sub(1);
        if kw.result.status == Status::Fail {
            self.logf(&format!("[{}: FAIL]", kw.name));
        }
    }

    fn message(&mut self, level: LogLevel, text: &str) {
        if level >= self.level {
            self.logf(&format!("[{}] {}", level, text));
        }
    }
}

/// Plain-text debug file written while the run proceeds
pub struct DebugFile {
    writer: BufWriter<File>,
    depth: usize,
}

impl DebugFile {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            depth: 0,
        })
    }

    fn write_line(&mut self, line: &str) {
        let stamp = timestamp(SystemTime::now());
        let indent = "  ".repeat(self.depth);
        let result = writeln!(self.writer, "{} - {}{}", stamp, indent, line).and_then(|_| self.writer.flush());
        if let Err(e) = result {
            debug!("writing debug file failed: {}", e);
        }
    }
}

impl Output for DebugFile {
    fn start_suite(&mut self, name: &str) {
        self.write_line(&format!("+{} START SUITE: {}", "-".repeat(self.depth + 1), name));
        self.depth += 1;
    }

    fn end_suite(&mut self, name: &str, status: Status, message: &str) {
        self.depth = self.depth.saturating_sub(1);
        let line = format!("+{} END SUITE: {} {} {}", "-".repeat(self.depth + 1), name, status, message);
        self.write_line(line.trim_end());
    }

    fn start_test(&mut self, name: &str) {
        self.write_line(&format!("+{} START TEST: {}", "-".repeat(self.depth + 1), name));
        self.depth += 1;
    }

    fn end_test(&mut self, name: &str, status: Status, message: &str) {
        self.depth = self.depth.saturating_sub(1);
        let line = format!("+{} END TEST: {} {} {}", "-".repeat(self.depth + 1), name, status, message);
        self.write_line(line.trim_end());
    }

    fn start_keyword(&mut self, kw: &KeywordEvent<'_>) {
        let line = format!("+{} START {}: {}    {}", "-".repeat(self.depth + 1), kw.kind, kw.name, kw.args.join("    "));
        self.write_line(line.trim_end());
        self.depth += 1;
    }

    fn end_keyword(&mut self, kw: &KeywordEvent<'_>) {
        self.depth = self.depth.saturating_sub(1);
        let elapsed = kw.result.elapsed.map(|d| d.as_millis()).unwrap_or_default();
        let line = format!("+{} END {}: {} ({} ms) {}", "-".repeat(self.depth + 1), kw.kind, kw.name, elapsed, kw.result.status);
        self.write_line(&line);
    }

    fn message(&mut self, level: LogLevel, text: &str) {
        self.write_line(&format!("{} - {}", level, text));
    }
}

/// Seconds.millis since the Unix epoch
pub fn timestamp(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => format!("{}.{:03}", d.as_secs(), d.subsec_millis()),
        Err(_) => "N/A".to_string(),
    }
}
