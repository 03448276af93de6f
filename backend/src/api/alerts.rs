// Overdue task alerts

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{body, ApiError, AppState};
use crate::notify::Notification;
use crate::views::{overdue, OverdueTask};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    #[serde(default = "default_true")]
    pub send_notifications: bool,
    /// Include tasks already marked Done
    #[serde(default)]
    pub include_pending: bool,
}

impl Default for AlertRequest {
    fn default() -> Self {
        Self {
            send_notifications: true,
            include_pending: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertResponse {
    pub message: String,
    pub alerts_sent: usize,
    pub overdue_tasks: Vec<OverdueTask>,
}

pub(super) async fn send_alerts(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let request = body(payload)?;
    let today = state.clock.now().date();
    let overdue_tasks = overdue(&state.store.load_or_empty(), today, request.include_pending);

    if overdue_tasks.is_empty() {
        return Ok(Json(AlertResponse {
            message: "No overdue tasks found.".to_string(),
            alerts_sent: 0,
            overdue_tasks,
        }));
    }

    let mut sent = 0;
    if request.send_notifications {
        let _guard = state.write_lock.lock().await;
        for task in &overdue_tasks {
            match state.notifier.send(&Notification::overdue(task)).await {
                Ok(()) => {
                    sent += 1;
                    state.record_best_effort(&format!(
                        "Alert sent to {} for overdue task '{}' ({} days late)",
                        task.owner, task.title, task.days_overdue
                    ));
                }
                Err(e) => tracing::error!("Failed to send notification for task {}: {}", task.id, e),
            }
        }
    }

    Ok(Json(AlertResponse {
        message: format!(
            "Found {} overdue tasks. Sent {} notifications.",
            overdue_tasks.len(),
            sent
        ),
        alerts_sent: sent,
        overdue_tasks,
    }))
}

/// Report overdue tasks without notifying anyone
pub(super) async fn check_alerts(State(state): State<Arc<AppState>>) -> Json<AlertResponse> {
    let today = state.clock.now().date();
    let overdue_tasks = overdue(&state.store.load_or_empty(), today, false);

    Json(AlertResponse {
        message: format!("Found {} overdue tasks.", overdue_tasks.len()),
        alerts_sent: 0,
        overdue_tasks,
    })
}
