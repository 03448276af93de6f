//! Concurrent writers must not lose project-log lines or task records

mod helpers;

use helpers::TestServer;
use pm_agent_lib::api::CreateTaskRequest;
use pm_agent_lib::project_log::ProjectLog;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_log_entries_are_all_recorded() {
    let server = TestServer::start().await;

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let client = server.client.clone();
            tokio::spawn(async move { client.add_log_entry(&format!("note {}", i)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let content = server.state.log.read().unwrap();
    assert!(content.starts_with("# Project Log\n\n"));
    assert_eq!(server.log_messages().len(), 25);
    for i in 0..25 {
        assert!(content.contains(&format!(": note {}\n", i)), "missing note {}", i);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_task_creation_assigns_unique_ids() {
    let server = TestServer::start().await;

    let handles: Vec<_> = (0..15)
        .map(|i| {
            let client = server.client.clone();
            tokio::spawn(async move {
                client
                    .create_task(&CreateTaskRequest {
                        title: Some(format!("Task {}", i)),
                        ..Default::default()
                    })
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut ids: Vec<String> = server.tasks().into_iter().map(|t| t.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 15);
    assert_eq!(ids.first().map(String::as_str), Some("TSK-001"));
    assert_eq!(ids.last().map(String::as_str), Some("TSK-015"));
    assert_eq!(server.log_messages().len(), 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_direct_appends_interleave_with_api_writes() {
    let server = TestServer::start().await;
    let log = ProjectLog::new(server.state.config.log_file());

    let writer = tokio::task::spawn_blocking(move || {
        for i in 0..20 {
            log.append(&format!("direct {}", i)).unwrap();
        }
    });
    for i in 0..20 {
        server.client.add_log_entry(&format!("api {}", i)).await.unwrap();
    }
    writer.await.unwrap();

    assert_eq!(server.log_messages().len(), 40);
}
