// Log filtering: keyword, inclusive date range, category and limit

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entry::LogEntry;

/// Default number of entries returned by a filter request
pub const DEFAULT_LIMIT: i64 = 50;

fn default_limit() -> Option<i64> {
    Some(DEFAULT_LIMIT)
}

/// Activity categories used by the dashboard's log view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Plans,
    Risk,
    Alerts,
    Meetings,
    Digests,
    System,
}

impl LogCategory {
    /// Lowercase keywords; an entry belongs to the category if its message
    /// contains any of them
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            LogCategory::Plans => &["/plan", "plan generated", "board created", "parsed plan"],
            LogCategory::Risk => &["/risk", "blocker", "risk check-in", "team lead"],
            LogCategory::Alerts => &["/alerts", "overdue", "notification", "alert sent"],
            LogCategory::Meetings => &["/schedule", "meeting", "triage"],
            LogCategory::Digests => &["/digest", "report", "stakeholder", "pdf"],
            LogCategory::System => &["loaded", "created", "updated", "initialized", "migrated"],
        }
    }

    pub fn matches(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.keywords().iter().any(|kw| message.contains(kw))
    }
}

/// Filter parameters for log queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub keyword: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`; invalid values are ignored
    #[serde(default)]
    pub date_from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`; invalid values are ignored
    #[serde(default)]
    pub date_to: Option<String>,
    /// Maximum entries kept (oldest first); `None`, zero or negative is unlimited
    #[serde(default = "default_limit")]
    pub limit: Option<i64>,
    #[serde(default)]
    pub category: Option<LogCategory>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            date_from: None,
            date_to: None,
            limit: default_limit(),
            category: None,
        }
    }
}

/// Parse a filter bound; blank or invalid input disables the bound
fn parse_bound(raw: Option<&str>, name: &str) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::debug!("Ignoring invalid {} '{}'", name, raw);
            None
        }
    }
}

impl LogFilter {
    /// Apply the filter, preserving file order
    pub fn apply(&self, entries: Vec<LogEntry>) -> Vec<LogEntry> {
        let keyword = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);
        let from = parse_bound(self.date_from.as_deref(), "date_from");
        let to = parse_bound(self.date_to.as_deref(), "date_to");

        let filtered = entries.into_iter().filter(|entry| {
            if let Some(keyword) = &keyword {
                if !entry.message.to_lowercase().contains(keyword) {
                    return false;
                }
            }

            if let Some(category) = self.category {
                if !category.matches(&entry.message) {
                    return false;
                }
            }

            if from.is_some() || to.is_some() {
                // Entries without a readable date cannot satisfy a date bound
                let Some(day) = entry.day() else {
                    return false;
                };
                if from.is_some_and(|from| day < from) || to.is_some_and(|to| day > to) {
                    return false;
                }
            }

            true
        });

        match self.limit {
            Some(limit) if limit > 0 => filtered.take(limit as usize).collect(),
            _ => filtered.collect(),
        }
    }
}
