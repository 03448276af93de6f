// One-time migration of the legacy free-text blocker convention
//
// Older task files marked a task blocked by writing "blocker" or "blocked"
// somewhere in Details. The structured Blocked flag replaces that; this pass
// sets the flag once at startup and the text is not consulted afterwards.
// A marker file records that the pass has run.

use std::path::Path;

use super::models::Task;
use super::task_store::{StoreError, TaskStore};
use crate::persistence::atomic_write;
use crate::project_log::ProjectLog;

/// Set the blocked flag on tasks whose details use the legacy convention
///
/// Returns the ids of tasks that changed. Done tasks and tasks already
/// flagged are left alone.
pub fn migrate_legacy_blockers(tasks: &mut [Task]) -> Vec<String> {
    let mut changed = Vec::new();

    for task in tasks.iter_mut() {
        if task.is_done() || task.blocked {
            continue;
        }

        let details = task.details.to_lowercase();
        if !(details.contains("blocker") || details.contains("blocked")) {
            continue;
        }

        task.blocked = true;
        if task.blocker_description.is_none() {
            let reason = task.details.trim();
            if !reason.is_empty() {
                task.blocker_description = Some(reason.to_string());
            }
        }
        changed.push(task.id.clone());
    }

    changed
}

/// Run the migration against a store unless `marker` exists
///
/// Saves and logs only on change, then writes `marker` so later startups
/// skip the pass. A missing store counts as migrated.
pub fn migrate_store(
    store: &dyn TaskStore,
    log: &ProjectLog,
    marker: &Path,
) -> Result<usize, StoreError> {
    if marker.exists() {
        tracing::debug!("Blocker migration already applied");
        return Ok(0);
    }

    let mut tasks = store.load_for_update()?;
    let changed = migrate_legacy_blockers(&mut tasks);
    if !changed.is_empty() {
        store.save(&tasks)?;
        tracing::info!("Migrated legacy blockers on {} task(s)", changed.len());

        let message = format!(
            "Task store migrated: flagged {} legacy blocked task(s) ({})",
            changed.len(),
            changed.join(", ")
        );
        if let Err(e) = log.append(&message) {
            tracing::warn!("Failed to log blocker migration: {}", e);
        }
    }

    atomic_write(marker, b"1\n").map_err(|source| StoreError::Io {
        path: marker.to_path_buf(),
        source,
    })?;

    Ok(changed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTaskStore, TaskStatus};
    use tempfile::TempDir;

    fn task(id: &str, details: &str) -> Task {
        let mut task = Task::new(id, "t");
        task.details = details.to_string();
        task
    }

    #[test]
    fn test_flags_legacy_blockers() {
        let mut tasks = vec![
            task("TSK-001", "Blocked on vendor API"),
            task("TSK-002", "all good"),
            task("TSK-003", "BLOCKER: no staging env"),
        ];

        let changed = migrate_legacy_blockers(&mut tasks);

        assert_eq!(changed, vec!["TSK-001", "TSK-003"]);
        assert!(tasks[0].blocked);
        assert_eq!(
            tasks[0].blocker_description.as_deref(),
            Some("Blocked on vendor API")
        );
        assert!(!tasks[1].blocked);
    }

    #[test]
    fn test_skips_done_and_already_flagged() {
        let mut done = task("TSK-001", "was blocked");
        done.status = TaskStatus::Done;
        let mut flagged = task("TSK-002", "blocked");
        flagged.blocked = true;
        flagged.blocker_description = Some("kept".to_string());

        let mut tasks = vec![done, flagged];
        assert!(migrate_legacy_blockers(&mut tasks).is_empty());
        assert!(!tasks[0].blocked);
        assert_eq!(tasks[1].blocker_description.as_deref(), Some("kept"));
    }

    #[test]
    fn test_migrate_store_logs_once() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join(".blockers_migrated");
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));
        let store = MemoryTaskStore::new(vec![task("TSK-001", "blocked by review")]);

        assert_eq!(migrate_store(&store, &log, &marker).unwrap(), 1);
        assert!(store.load().unwrap()[0].blocked);
        assert_eq!(log.entries().len(), 1);
        assert!(marker.exists());

        // Second run is a no-op
        assert_eq!(migrate_store(&store, &log, &marker).unwrap(), 0);
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn test_later_startups_ignore_details_text() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join(".blockers_migrated");
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));
        let store = MemoryTaskStore::new(Vec::new());

        assert_eq!(migrate_store(&store, &log, &marker).unwrap(), 0);
        assert!(marker.exists());

        // Task written after the first startup mentions "blocked" in passing
        store
            .save(&[task("TSK-001", "Previously blocked by vendor, now unblocked")])
            .unwrap();

        assert_eq!(migrate_store(&store, &log, &marker).unwrap(), 0);
        let tasks = store.load().unwrap();
        assert!(!tasks[0].blocked);
        assert_eq!(tasks[0].blocker_description, None);
        assert!(log.entries().is_empty());
    }
}
