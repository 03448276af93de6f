// Risk check-ins from team leads

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{body, iso, ApiError, AppState};
use crate::notify::Notification;
use crate::persistence::atomic_write;
use crate::store::{find_task_mut, TaskStatus};
use crate::views::needs_discussion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskItem {
    pub story_id: String,
    pub title: String,
    pub on_track: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RiskItem {
    fn summary(&self) -> String {
        match self.reason.as_deref().filter(|r| !r.trim().is_empty()) {
            Some(reason) => format!("{}: {} ({})", self.story_id, self.title, reason),
            None => format!("{}: {}", self.story_id, self.title),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCheckInput {
    pub team_lead: String,
    #[serde(default)]
    pub items: Vec<RiskItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCheckOutput {
    pub message: String,
    pub blockers: Vec<RiskItem>,
    pub needs_discussion: Vec<RiskItem>,
    pub timestamp: String,
    /// Ids of stored tasks flagged blocked by this check-in
    #[serde(default)]
    pub tasks_marked_blocked: Vec<String>,
}

/// Persisted check-in record
#[derive(Debug, Serialize)]
struct RiskRecord<'a> {
    team_lead: &'a str,
    blockers: &'a [RiskItem],
    needs_discussion: &'a [RiskItem],
    timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadStory {
    pub story_id: String,
    pub title: String,
    pub owner: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoriesResponse {
    pub team_lead: String,
    pub stories: Vec<LeadStory>,
}

fn risk_log_message(team_lead: &str, blockers: usize, discussion: usize) -> String {
    let mut message = format!("/risk – {} reported ", team_lead);
    if blockers > 0 {
        message.push_str(&format!("{} blocker(s)", blockers));
        if discussion > 0 {
            message.push_str(&format!(" and {} item(s) needing discussion", discussion));
        }
    } else {
        message.push_str("no blockers");
    }
    message
}

pub(super) async fn check_risk(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RiskCheckInput>, JsonRejection>,
) -> Result<Json<RiskCheckOutput>, ApiError> {
    let input = body(payload)?;
    let team_lead = input.team_lead.trim().to_string();
    if team_lead.is_empty() {
        return Err(ApiError::BadRequest("team_lead must not be empty".to_string()));
    }

    let blockers: Vec<RiskItem> = input.items.into_iter().filter(|i| !i.on_track).collect();
    let discussion: Vec<RiskItem> = blockers
        .iter()
        .filter(|i| i.reason.as_deref().is_some_and(needs_discussion))
        .cloned()
        .collect();

    let _guard = state.write_lock.lock().await;
    let now = state.clock.now();

    // Store errors fail the request before anything is written
    let tasks = if blockers.is_empty() {
        None
    } else {
        Some(state.store.load_for_update()?)
    };

    let record = RiskRecord {
        team_lead: &team_lead,
        blockers: &blockers,
        needs_discussion: &discussion,
        timestamp: iso(now),
    };
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize risk check-in: {}", e)))?;
    let risk_dir = state.config.risk_dir();
    let mut path = risk_dir.join(format!("risk_{}.json", now.format("%Y%m%d_%H%M%S")));
    let mut n = 1;
    while path.exists() {
        path = risk_dir.join(format!("risk_{}_{}.json", now.format("%Y%m%d_%H%M%S"), n));
        n += 1;
    }
    atomic_write(&path, json.as_bytes()).map_err(|e| {
        ApiError::Internal(format!("Failed to write {}: {}", path.display(), e))
    })?;

    let mut marked = Vec::new();
    if let Some(mut tasks) = tasks {
        for item in &blockers {
            if let Some(task) = find_task_mut(&mut tasks, item.story_id.trim()) {
                task.mark_blocked(item.reason.as_deref());
                marked.push(task.id.clone());
            }
        }
        if !marked.is_empty() {
            state.store.save(&tasks)?;
        }
    }

    state.record_best_effort(&risk_log_message(&team_lead, blockers.len(), discussion.len()));

    if !blockers.is_empty() {
        let lines: Vec<String> = blockers.iter().map(RiskItem::summary).collect();
        let notification = Notification::risk_escalation(&team_lead, &lines);
        if let Err(e) = state.notifier.send(&notification).await {
            tracing::warn!("{}", e);
        }
    }

    Ok(Json(RiskCheckOutput {
        message: format!("Risk check-in processed for {}", team_lead),
        blockers,
        needs_discussion: discussion,
        timestamp: iso(now),
        tasks_marked_blocked: marked,
    }))
}

/// Active stories owned by a team lead
pub(super) async fn stories_for_lead(
    State(state): State<Arc<AppState>>,
    Path(team_lead): Path<String>,
) -> Json<StoriesResponse> {
    let lead = team_lead.trim();
    let stories = state
        .store
        .load_or_empty()
        .into_iter()
        .filter(|t| !t.is_done())
        .filter(|t| {
            t.owner
                .as_deref()
                .is_some_and(|o| o.trim().eq_ignore_ascii_case(lead))
        })
        .map(|t| LeadStory {
            owner: t.owner_or_unassigned().to_string(),
            story_id: t.id,
            title: t.title,
            due_date: t.due_date,
            status: t.status,
        })
        .collect();

    Json(StoriesResponse {
        team_lead: lead.to_string(),
        stories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_log_message() {
        assert_eq!(risk_log_message("Alice", 0, 0), "/risk – Alice reported no blockers");
        assert_eq!(risk_log_message("Alice", 2, 0), "/risk – Alice reported 2 blocker(s)");
        assert_eq!(
            risk_log_message("Alice", 2, 1),
            "/risk – Alice reported 2 blocker(s) and 1 item(s) needing discussion"
        );
    }
}
