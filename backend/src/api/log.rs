// Project log endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{body, ApiError, AppState};
use crate::project_log::{LogEntry, LogFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogResponse {
    /// Newest first
    pub entries: Vec<LogEntry>,
    pub total_entries: usize,
}

impl LogResponse {
    fn new(entries: Vec<LogEntry>) -> Self {
        Self {
            total_entries: entries.len(),
            entries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntryRequest {
    #[serde(default)]
    pub entry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntryResponse {
    pub message: String,
    pub entry: LogEntry,
}

pub(super) async fn get_log(State(state): State<Arc<AppState>>) -> Json<LogResponse> {
    let mut entries = state.log.entries();
    entries.reverse();
    Json(LogResponse::new(entries))
}

pub(super) async fn filter_log(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogFilter>, JsonRejection>,
) -> Result<Json<LogResponse>, ApiError> {
    let filter = body(payload)?;
    Ok(Json(LogResponse::new(state.log.query(&filter))))
}

pub(super) async fn add_entry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogEntryRequest>, JsonRejection>,
) -> Result<Json<LogEntryResponse>, ApiError> {
    let request = body(payload)?;

    let _guard = state.write_lock.lock().await;
    let entry = state.record(&request.entry)?;

    Ok(Json(LogEntryResponse {
        message: "Log entry added".to_string(),
        entry,
    }))
}
