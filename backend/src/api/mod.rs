//! HTTP API
//!
//! One axum router over shared [`AppState`]. Every mutating handler holds
//! `AppState::write_lock` for its whole read-modify-write of the task store
//! and project log. Errors are returned as `{"detail": "<message>"}`.

mod alerts;
mod digest;
mod log;
mod plan;
mod risk;
mod schedule;
mod tasks;

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::clock::{Clock, LocalClock};
use crate::config::Config;
use crate::notify::{LogNotifier, Notifier};
use crate::planner::{GeminiPlanParser, PlanError, PlanParser};
use crate::project_log::{LogEntry, LogError, ProjectLog};
use crate::schedule::{Calendar, StubCalendar};
use crate::store::{JsonTaskStore, StoreError, TaskStore};

pub use alerts::{AlertRequest, AlertResponse};
pub use digest::{DigestResponse, ReportList};
pub use log::{LogEntryRequest, LogEntryResponse, LogResponse};
pub use plan::{PlanRequest, PlanResponse, Story};
pub use risk::{LeadStory, RiskCheckInput, RiskCheckOutput, RiskItem, StoriesResponse};
pub use schedule::{BlockedStoriesResponse, BlockedStory};
pub use tasks::{CreateTaskRequest, StatusUpdateRequest};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state for all handlers
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TaskStore>,
    pub log: ProjectLog,
    pub planner: Arc<dyn PlanParser>,
    pub calendar: Arc<dyn Calendar>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    /// Serializes every task-store and project-log write
    pub write_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Production wiring: JSON store, Gemini parser, stub calendar, log notifier
    pub fn from_config(config: Config) -> Result<Self, PlanError> {
        let planner = GeminiPlanParser::new(config.gemini.clone())?;
        Ok(Self {
            store: Arc::new(JsonTaskStore::new(config.task_file())),
            log: ProjectLog::new(config.log_file()),
            planner: Arc::new(planner),
            calendar: Arc::new(StubCalendar),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(LocalClock),
            write_lock: tokio::sync::Mutex::new(()),
            config,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn PlanParser>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append a project-log entry stamped by the state's clock
    ///
    /// Callers hold `write_lock`.
    pub(crate) fn record(&self, message: &str) -> Result<LogEntry, ApiError> {
        Ok(self.log.append_at(message, self.clock.now())?)
    }

    /// Like `record`, for entries written after the main change was saved:
    /// a failure is logged instead of failing the request
    pub(crate) fn record_best_effort(&self, message: &str) {
        if let Err(e) = self.log.append_at(message, self.clock.now()) {
            tracing::warn!("Failed to update project log: {}", e);
        }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/plan", post(plan::create_plan))
        .route("/api/risk", post(risk::check_risk))
        .route("/api/risk/stories/:team_lead", get(risk::stories_for_lead))
        .route("/api/alerts", post(alerts::send_alerts))
        .route("/api/alerts/check", get(alerts::check_alerts))
        .route("/api/log", get(log::get_log))
        .route("/api/log/filter", post(log::filter_log))
        .route("/api/log/entry", post(log::add_entry))
        .route("/api/digest", post(digest::generate))
        .route("/api/digest/reports", get(digest::list))
        .route("/api/digest/download/:filename", get(digest::download))
        .route("/api/schedule", post(schedule::schedule))
        .route("/api/schedule/blocked", get(schedule::blocked))
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/:id", get(tasks::get))
        .route("/api/tasks/:id/status", post(tasks::update_status))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to PM Agent API",
        "status": "operational",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": iso(chrono::Local::now().naive_local()),
        "version": API_VERSION,
    }))
}

/// Errors returned to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(msg) => {
                tracing::error!("{}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<LogError> for ApiError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::EmptyMessage => ApiError::BadRequest(e.to_string()),
            LogError::Io { .. } => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Unwrap a JSON body, turning extractor rejections into `{"detail"}` errors
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// ISO-8601 local time without offset
pub(crate) fn iso(at: chrono::NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}
