// Parser and formatter for project log lines
//
// Entry format: - **<timestamp>**: <message>
// Example:      - **2025-08-01 09:30**: /plan executed – parsed plan and created 3 stories
//
// Older writers emitted U+2011 (non-breaking hyphen) in the date. Both forms
// are read; only ASCII hyphens are written.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Regex for log entry lines
/// Captures: (timestamp)(message)
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*([0-9\x{2011}: -]+)\*\*: (.+)$").unwrap());

/// Timestamp format written to the log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

const NON_BREAKING_HYPHEN: char = '\u{2011}';

/// A parsed log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp text with any non-breaking hyphens replaced by `-`
    pub timestamp: String,
    pub message: String,
    /// Date portion of the timestamp (`YYYY-MM-DD` for well-formed entries)
    pub date: String,
    /// Parsed timestamp, if the text is a valid `YYYY-MM-DD HH:MM`
    #[serde(skip)]
    pub at: Option<NaiveDateTime>,
}

impl LogEntry {
    pub fn new(timestamp: &str, message: &str) -> Self {
        let timestamp = normalize_hyphens(timestamp.trim());
        let date = timestamp
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        let at = parse_timestamp(&timestamp);

        Self {
            timestamp,
            message: message.to_string(),
            date,
            at,
        }
    }

    /// Parsed calendar date, if any
    pub fn day(&self) -> Option<NaiveDate> {
        self.at
            .map(|at| at.date())
            .or_else(|| NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok())
    }
}

/// Replace U+2011 with ASCII hyphen
pub fn normalize_hyphens(s: &str) -> String {
    s.replace(NON_BREAKING_HYPHEN, "-")
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Parse a single line as a log entry
pub fn parse_entry_line(line: &str) -> Option<LogEntry> {
    let caps = ENTRY_RE.captures(line.trim_end_matches('\r'))?;
    let timestamp = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let message = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some(LogEntry::new(timestamp, message))
}

/// Parse every entry in file order; other lines are skipped
pub fn parse_entries(content: &str) -> Vec<LogEntry> {
    content.lines().filter_map(parse_entry_line).collect()
}

/// Format an entry line (without trailing newline)
pub fn format_entry(at: NaiveDateTime, message: &str) -> String {
    format!("- **{}**: {}", at.format(TIMESTAMP_FORMAT), message)
}

/// Collapse a message onto one line; `None` if nothing is left
pub fn flatten_message(message: &str) -> Option<String> {
    let flat = message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if flat.is_empty() {
        None
    } else {
        Some(flat)
    }
}
