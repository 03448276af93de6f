use std::sync::Arc;

use chrono::NaiveDateTime;
use pm_agent_lib::{
    api::{router, AppState},
    client::ApiClient,
    clock::FixedClock,
    config::Config,
    store::Task,
    test_utils::{FailingPlanParser, FixedCalendar, RecordingNotifier},
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Instant every in-process test server sees as "now"
pub fn test_now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-08-10 09:00", "%Y-%m-%d %H:%M").unwrap()
}

/// RAII wrapper around an in-process API server on an ephemeral port.
///
/// Data lives in a temp directory; calendar, notifier, plan parser and clock
/// are test doubles. The server task is aborted on drop.
pub struct TestServer {
    pub dir: TempDir,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
    pub client: ApiClient,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|state| state).await
    }

    /// Start with a hook to swap collaborators before serving
    pub async fn start_with(customize: impl FnOnce(AppState) -> AppState) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(dir.path().to_path_buf());
        config.ensure_dirs().unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::from_config(config)
            .unwrap()
            .with_planner(Arc::new(FailingPlanParser))
            .with_calendar(Arc::new(FixedCalendar::default()))
            .with_notifier(notifier.clone())
            .with_clock(Arc::new(FixedClock(test_now())));
        let state = Arc::new(customize(state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        let base_url = format!("http://{}", addr);
        let client = ApiClient::new(base_url.clone()).unwrap();

        Self {
            dir,
            state,
            notifier,
            client,
            base_url,
            handle,
        }
    }

    /// Replace the task store contents directly
    pub fn seed_tasks(&self, tasks: &[Task]) {
        self.state.store.save(tasks).unwrap();
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.store.load().unwrap()
    }

    pub fn log_messages(&self) -> Vec<String> {
        self.state
            .log
            .entries()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
