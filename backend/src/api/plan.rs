// POST /api/plan: parse plan text into stories and task records

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{body, iso, ApiError, AppState};
use crate::persistence::atomic_write;
use crate::planner::parse_or_fallback;
use crate::store::{next_id, Task, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub plan_text: String,
}

/// One story per plan team member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub stories: Vec<Story>,
    pub message: String,
    pub timestamp: String,
}

/// Contents of plan.json
#[derive(Debug, Serialize)]
struct PlanDocument<'a> {
    title: &'a str,
    due_date: NaiveDate,
    stories: &'a [Story],
    created_at: String,
}

pub(super) async fn create_plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, ApiError> {
    let request = body(payload)?;
    let text = request.plan_text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("plan_text must not be empty".to_string()));
    }

    // Parser call happens before taking the write lock
    let parsed = parse_or_fallback(state.planner.as_ref(), text).await;
    let plan = parsed.plan;

    let _guard = state.write_lock.lock().await;
    let now = state.clock.now();
    let mut tasks = state.store.load_for_update()?;

    let mut stories = Vec::with_capacity(plan.team_members.len());
    for member in &plan.team_members {
        let mut task = Task::new(next_id(&tasks), plan.title.clone());
        task.status = TaskStatus::Backlog;
        task.owner = Some(member.name.clone());
        task.due_date = Some(plan.due_date);
        task.description = format!("Plan: {}", plan.title);
        task.details = format!("Role: {}; Created via /plan command", member.role);

        stories.push(Story {
            id: task.id.clone(),
            title: task.title.clone(),
            owner: member.name.clone(),
            due_date: plan.due_date,
            status: task.status,
        });
        tasks.push(task);
    }
    state.store.save(&tasks)?;

    let document = PlanDocument {
        title: &plan.title,
        due_date: plan.due_date,
        stories: &stories,
        created_at: iso(now),
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize plan: {}", e)))?;
    let plan_file = state.config.plan_file();
    atomic_write(&plan_file, json.as_bytes()).map_err(|e| {
        ApiError::Internal(format!("Failed to write {}: {}", plan_file.display(), e))
    })?;

    if !parsed.used_fallback {
        state.record_best_effort(&format!("Gemini AI parsed plan: {}", plan.title));
    }
    state.record_best_effort(&format!(
        "/plan executed – parsed plan and created {} stories",
        stories.len()
    ));

    Ok(Json(PlanResponse {
        message: format!("Plan created with {} stories", stories.len()),
        stories,
        timestamp: iso(now),
    }))
}
