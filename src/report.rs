//! Step logging for the fixture executables and the harness.
//!
//! Each successful step emits one line and each fatal error one final
//! line. Lines go to **stderr** so that stdout stays free for tools that
//! capture it. Two formats are available: human text prefixed with a UTC
//! timestamp, and one JSON object per line.

use clap::ValueEnum;
use std::io::Write;

/// Severity of a log event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Info,
    Fatal,
}

/// A single log event.
#[derive(Clone, Debug)]
pub struct LogEvent {
    pub level: Level,
    /// Short tag for the step, e.g. `predict` or `storage`.
    pub scope: String,
    pub message: String,
}

/// Sink for log events. Implementations write to stderr (human or JSON).
pub trait Reporter: Send + Sync {
    fn report(&self, event: LogEvent);

    fn info(&self, scope: &str, message: String) {
        self.report(LogEvent {
            level: Level::Info,
            scope: scope.to_string(),
            message,
        });
    }

    fn fatal(&self, message: String) {
        self.report(LogEvent {
            level: Level::Fatal,
            scope: String::new(),
            message,
        });
    }
}

/// `2026/10/18 09:14:02 [predict] Successfully predicted on data a.h5`
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&self, event: LogEvent) {
        let line = format_human(&event, &timestamp());
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, event: LogEvent) {
        let level = match event.level {
            Level::Info => "info",
            Level::Fatal => "fatal",
        };
        let obj = serde_json::json!({
            "ts": chrono::Utc::now().timestamp(),
            "level": level,
            "scope": event.scope,
            "msg": event.message,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// Discards everything.
pub struct NoReporter;

impl Reporter for NoReporter {
    fn report(&self, _event: LogEvent) {}
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y/%m/%d %H:%M:%S").to_string()
}

fn format_human(event: &LogEvent, ts: &str) -> String {
    match event.level {
        Level::Fatal => format!("{} [FATAL ERROR] {}\n", ts, event.message),
        Level::Info if event.scope.is_empty() => format!("{} {}\n", ts, event.message),
        Level::Info => format!("{} [{}] {}\n", ts, event.scope, event.message),
    }
}

/// Log format selected on the command line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn reporter(&self) -> Box<dyn Reporter> {
        match self {
            LogFormat::Human => Box::new(StderrReporter),
            LogFormat::Json => Box::new(JsonReporter),
        }
    }
}
