// Derived views over the task list: overdue, blocked, at-risk and counts

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::{Priority, Task, TaskStatus};

/// An overdue task as reported by alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueTask {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
}

/// Tasks due strictly before `today`, most overdue first
///
/// Done tasks are excluded unless `include_pending` is set.
pub fn overdue(tasks: &[Task], today: NaiveDate, include_pending: bool) -> Vec<OverdueTask> {
    let mut result: Vec<OverdueTask> = tasks
        .iter()
        .filter(|task| include_pending || !task.is_done())
        .filter_map(|task| {
            let due = task.due_date?;
            if due >= today {
                return None;
            }
            Some(OverdueTask {
                id: task.id.clone(),
                title: task.title.clone(),
                owner: task.owner_or_unassigned().to_string(),
                due_date: due,
                days_overdue: (today - due).num_days(),
            })
        })
        .collect();

    result.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| a.id.cmp(&b.id))
    });
    result
}

pub fn blocked(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_blocked()).collect()
}

/// Whether a risk reason asks for a discussion
pub fn needs_discussion(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    reason.contains("need discussion") || reason.contains("missing estimated completion")
}

/// High-priority work that is not done
pub fn at_risk(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.priority == Priority::High && !task.is_done())
        .collect()
}

/// Triage candidates: open tasks that are high priority or blocked
pub fn critical(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| !task.is_done() && (task.priority == Priority::High || task.is_blocked()))
        .collect()
}

/// Number of tasks per status; every status is present
pub fn status_counts(tasks: &[Task]) -> BTreeMap<TaskStatus, usize> {
    let mut counts: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.iter().map(|status| (*status, 0)).collect();
    for task in tasks {
        *counts.entry(task.status).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str, status: TaskStatus, due: Option<&str>) -> Task {
        let mut task = Task::new(id, format!("Task {}", id));
        task.status = status;
        task.due_date = due.map(date);
        task
    }

    #[test]
    fn test_overdue_excludes_done_unless_pending() {
        let tasks = vec![
            task("TSK-001", TaskStatus::Todo, Some("2025-08-01")),
            task("TSK-002", TaskStatus::Done, Some("2025-08-01")),
            task("TSK-003", TaskStatus::InProgress, Some("2025-08-10")),
            task("TSK-004", TaskStatus::Todo, None),
        ];
        let today = date("2025-08-10");

        let result = overdue(&tasks, today, false);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "TSK-001");
        assert_eq!(result[0].days_overdue, 9);
        assert_eq!(result[0].owner, "Unassigned");

        let result = overdue(&tasks, today, true);
        let ids: Vec<_> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["TSK-001", "TSK-002"]);
    }

    #[test]
    fn test_overdue_orders_by_days_then_id() {
        let tasks = vec![
            task("TSK-003", TaskStatus::Todo, Some("2025-08-05")),
            task("TSK-002", TaskStatus::Todo, Some("2025-08-01")),
            task("TSK-001", TaskStatus::Todo, Some("2025-08-05")),
        ];

        let result = overdue(&tasks, date("2025-08-10"), false);
        let ids: Vec<_> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["TSK-002", "TSK-001", "TSK-003"]);
    }

    #[test]
    fn test_blocked_uses_flag_and_status() {
        let mut flagged = task("TSK-001", TaskStatus::InProgress, None);
        flagged.blocked = true;
        let tasks = vec![
            flagged,
            task("TSK-002", TaskStatus::Blocked, None),
            task("TSK-003", TaskStatus::Todo, None),
        ];

        assert_eq!(blocked(&tasks).len(), 2);
    }

    #[test]
    fn test_needs_discussion() {
        assert!(needs_discussion("We NEED DISCUSSION on scope"));
        assert!(needs_discussion("Missing estimated completion date"));
        assert!(!needs_discussion("waiting on vendor"));
    }

    #[test]
    fn test_at_risk_and_critical() {
        let mut high = task("TSK-001", TaskStatus::Todo, None);
        high.priority = Priority::High;
        let mut high_done = task("TSK-002", TaskStatus::Done, None);
        high_done.priority = Priority::High;
        let blocked_low = task("TSK-003", TaskStatus::Blocked, None);
        let plain = task("TSK-004", TaskStatus::Todo, None);
        let tasks = vec![high, high_done, blocked_low, plain];

        let ids = |v: Vec<&Task>| v.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(at_risk(&tasks)), vec!["TSK-001"]);
        assert_eq!(ids(critical(&tasks)), vec!["TSK-001", "TSK-003"]);
    }

    #[test]
    fn test_status_counts_include_zeroes() {
        let tasks = vec![
            task("TSK-001", TaskStatus::Done, None),
            task("TSK-002", TaskStatus::Done, None),
            task("TSK-003", TaskStatus::Todo, None),
        ];
        let counts = status_counts(&tasks);
        assert_eq!(counts[&TaskStatus::Done], 2);
        assert_eq!(counts[&TaskStatus::Todo], 1);
        assert_eq!(counts[&TaskStatus::Blocked], 0);
        assert_eq!(counts.len(), 5);
    }
}
