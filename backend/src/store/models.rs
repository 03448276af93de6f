//! Task record types
//!
//! JSON keys match the legacy `task.json` layout ("Task ID", "Title", ...)
//! so existing files load unchanged. Structured fields added on top of the
//! legacy layout (`Owner`, `Due Date`, `Blocked`, `Blocker Description`)
//! are omitted from the output when unset.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TaskStatus {
    #[default]
    Todo,
    Backlog,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::Backlog,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "Todo"),
            TaskStatus::Backlog => write!(f, "Backlog"),
            TaskStatus::InProgress => write!(f, "InProgress"),
            TaskStatus::Blocked => write!(f, "Blocked"),
            TaskStatus::Done => write!(f, "Done"),
        }
    }
}

/// Lowercase and drop separators so "In Progress", "in_progress" and
/// "InProgress" compare equal
fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "backlog" => Ok(TaskStatus::Backlog),
            "inprogress" => Ok(TaskStatus::InProgress),
            "blocked" => Ok(TaskStatus::Blocked),
            "done" => Ok(TaskStatus::Done),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown task status '{}' in task store, treating as Todo", raw);
            TaskStatus::Todo
        }))
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_key(s).as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown priority '{}' in task store, treating as Medium", raw);
            Priority::Medium
        }))
    }
}

/// A task record as stored in `task.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Task ID", default)]
    pub id: String,
    #[serde(rename = "Title", default = "default_title")]
    pub title: String,
    #[serde(rename = "Status", default)]
    pub status: TaskStatus,
    #[serde(rename = "Dependencies", default)]
    pub dependencies: String,
    #[serde(rename = "Priority", default)]
    pub priority: Priority,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Details", default)]
    pub details: String,
    #[serde(rename = "Test Strategy", default)]
    pub test_strategy: String,
    #[serde(rename = "Owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(
        rename = "Due Date",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "Blocked", default, skip_serializing_if = "is_false")]
    pub blocked: bool,
    #[serde(
        rename = "Blocker Description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub blocker_description: Option<String>,
}

fn default_title() -> String {
    "Untitled Task".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Accept `YYYY-MM-DD` or a full ISO datetime; anything else loads as no date
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let date_part = s.trim().get(..10).unwrap_or(s.trim()).to_string();
        match NaiveDate::parse_from_str(&date_part, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                tracing::warn!("Ignoring unparseable due date '{}' in task store", s);
                None
            }
        }
    }))
}

impl Task {
    /// Create a task with defaults for every optional field
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Todo,
            dependencies: String::new(),
            priority: Priority::Medium,
            description: String::new(),
            details: String::new(),
            test_strategy: String::new(),
            owner: None,
            due_date: None,
            blocked: false,
            blocker_description: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Blocked by status or by an explicit blocker flag
    pub fn is_blocked(&self) -> bool {
        self.status == TaskStatus::Blocked || self.blocked
    }

    pub fn owner_or_unassigned(&self) -> &str {
        self.owner
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or("Unassigned")
    }

    /// Mark the task blocked, recording the reason if one is given
    pub fn mark_blocked(&mut self, reason: Option<&str>) {
        self.blocked = true;
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            self.blocker_description = Some(reason.to_string());
        }
    }
}
