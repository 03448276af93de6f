//! Smoke test for the pm-agent-server binary

mod helpers;

use helpers::start_server_process;
use pm_agent_lib::project_log::ProjectLog;
use pm_agent_lib::store::{JsonTaskStore, Task, TaskStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_server_starts_migrates_and_writes_pid() {
    let temp_dir = TempDir::new().unwrap();

    // Legacy free-text blocker convention in an existing task file
    let mut legacy = Task::new("TSK-001", "Vendor integration");
    legacy.details = "Blocked by vendor contract".to_string();
    JsonTaskStore::new(temp_dir.path().join("task.json"))
        .save(&[legacy, Task::new("TSK-002", "Docs")])
        .unwrap();

    let server = start_server_process(temp_dir.path()).await.unwrap();

    let pid: u32 = std::fs::read_to_string(server.pid_file())
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(pid, server.pid());

    let tasks = server.client.tasks().await.unwrap();
    assert!(tasks[0].blocked);
    assert_eq!(
        tasks[0].blocker_description.as_deref(),
        Some("Blocked by vendor contract")
    );
    assert!(!tasks[1].blocked);

    let blocked = server.client.blocked().await.unwrap();
    assert_eq!(blocked.blocked_count, 1);

    let log = ProjectLog::new(temp_dir.path().join("project_log.md"));
    let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
    assert_eq!(
        messages,
        vec!["Task store migrated: flagged 1 legacy blocked task(s) (TSK-001)".to_string()]
    );
}
