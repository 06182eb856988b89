// src/supervisor/log.rs

//! Append-only run log with timestamps relative to the run start.

use std::fmt;
use std::time::{Duration, Instant};

/// Color of the timestamp prefix in rendered output.
pub const TIMESTAMP_COLOR: &str = "#0000FF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogColor {
    Default,
    Error,
}

impl LogColor {
    pub fn hex(self) -> &'static str {
        match self {
            LogColor::Default => "#000000",
            LogColor::Error => "#FF0000",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Time since the run started.
    pub elapsed: Duration,
    pub color: LogColor,
    pub text: String,
}

impl LogEntry {
    /// One line of HTML-ish markup for rich text widgets.
    pub fn render_html(&self) -> String {
        format!(
            "<font color=\"{}\">{:4.1}:</font> <font color=\"{}\">{}</font><br>",
            TIMESTAMP_COLOR,
            self.elapsed.as_secs_f64(),
            self.color.hex(),
            escape_html(&self.text)
        )
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4.1}: {}", self.elapsed.as_secs_f64(), self.text)
    }
}

/// The log of the current (or most recent) run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    started_at: Option<Instant>,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all entries and restart the clock at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.entries.clear();
    }

    /// Append an entry stamped at `now`.
    ///
    /// Stamps never go backwards, even if `now` does.
    pub fn append(&mut self, now: Instant, color: LogColor, text: impl Into<String>) -> &LogEntry {
        let floor = self.entries.last().map(|e| e.elapsed).unwrap_or_default();
        let elapsed = self.elapsed(now).max(floor);
        self.entries.push(LogEntry {
            elapsed,
            color,
            text: text.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render_html(&self) -> String {
        self.entries.iter().map(LogEntry::render_html).collect()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
