// Task CRUD endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{body, ApiError, AppState};
use crate::store::{find_task, find_task_mut, next_id, Priority, Task, TaskStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub dependencies: Option<String>,
    pub test_strategy: Option<String>,
    pub owner: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CreateTaskRequest {
    /// Build the task record, applying defaults for anything left out
    fn into_task(self, id: String) -> Result<Task, ApiError> {
        let mut task = Task::new(id, "Untitled Task");
        if let Some(title) = non_blank(self.title) {
            task.title = title;
        }
        if let Some(status) = non_blank(self.status) {
            task.status = status.parse().map_err(ApiError::BadRequest)?;
        }
        if let Some(priority) = non_blank(self.priority) {
            task.priority = priority.parse::<Priority>().map_err(ApiError::BadRequest)?;
        }
        if let Some(due) = non_blank(self.due_date) {
            let date = NaiveDate::parse_from_str(&due, "%Y-%m-%d").map_err(|_| {
                ApiError::BadRequest(format!("Invalid due_date '{}', expected YYYY-MM-DD", due))
            })?;
            task.due_date = Some(date);
        }
        task.description = self.description.unwrap_or_default();
        task.details = self.details.unwrap_or_default();
        task.dependencies = self.dependencies.unwrap_or_default();
        task.test_strategy = self.test_strategy.unwrap_or_default();
        task.owner = non_blank(self.owner);
        Ok(task)
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Task {} not found", id))
}

pub(super) async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.store.load_or_empty())
}

pub(super) async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let tasks = state.store.load_or_empty();
    find_task(&tasks, &id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

pub(super) async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let request = body(payload)?;

    let _guard = state.write_lock.lock().await;
    let mut tasks = state.store.load_for_update()?;
    let task = request.into_task(next_id(&tasks))?;
    tasks.push(task.clone());
    state.store.save(&tasks)?;

    state.record_best_effort(&format!("Task created: {} for task {}", task.title, task.id));
    Ok(Json(task))
}

pub(super) async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let request = body(payload)?;
    let status: TaskStatus = request.status.parse().map_err(ApiError::BadRequest)?;

    let _guard = state.write_lock.lock().await;
    let mut tasks = state.store.load_for_update()?;
    let task = find_task_mut(&mut tasks, &id).ok_or_else(|| not_found(&id))?;
    task.status = status;
    if status == TaskStatus::Done {
        task.blocked = false;
        task.blocker_description = None;
    }
    let updated = task.clone();
    state.store.save(&tasks)?;

    state.record_best_effort(&format!("Status changed to {} for task {}", status, updated.id));
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let task = CreateTaskRequest::default()
            .into_task("TSK-001".to_string())
            .unwrap();
        assert_eq!(task.title, "Untitled Task");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.owner, None);
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let bad_status = CreateTaskRequest {
            status: Some("finished".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            bad_status.into_task("TSK-001".to_string()),
            Err(ApiError::BadRequest(_))
        ));

        let bad_date = CreateTaskRequest {
            due_date: Some("31/12/2025".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            bad_date.into_task("TSK-001".to_string()),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_create_request_parses_fields() {
        let request = CreateTaskRequest {
            title: Some("  Ship it ".to_string()),
            status: Some("in progress".to_string()),
            priority: Some("HIGH".to_string()),
            owner: Some("Alice".to_string()),
            due_date: Some("2025-12-31".to_string()),
            ..Default::default()
        };
        let task = request.into_task("TSK-007".to_string()).unwrap();
        assert_eq!(task.id, "TSK-007");
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.owner.as_deref(), Some("Alice"));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 12, 31));
    }
}
