// Triage meeting scheduling endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{body, ApiError, AppState};
use crate::schedule::{schedule_meeting, MeetingRequest, MeetingResponse, ScheduleError};
use crate::views;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedStory {
    pub id: String,
    pub title: String,
    pub owner: String,
    pub blocker_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedStoriesResponse {
    pub blocked_count: usize,
    pub blocked_stories: Vec<BlockedStory>,
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::InvalidDuration | ScheduleError::PreferredDayOutOfRange(_) => {
                ApiError::BadRequest(e.to_string())
            }
            ScheduleError::Calendar(_) => {
                ApiError::Internal(format!("Failed to schedule meeting: {}", e))
            }
        }
    }
}

pub(super) async fn schedule(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MeetingRequest>, JsonRejection>,
) -> Result<Json<MeetingResponse>, ApiError> {
    let request = body(payload)?;
    let default_blocked: Vec<String> = views::blocked(&state.store.load_or_empty())
        .iter()
        .map(|t| format!("{}: {}", t.id, t.title))
        .collect();

    let meeting = schedule_meeting(
        &request,
        default_blocked,
        &state.config.team_leads,
        state.calendar.as_ref(),
        state.notifier.as_ref(),
        state.clock.now(),
    )
    .await?;

    if let Some(message) = &meeting.log_message {
        let _guard = state.write_lock.lock().await;
        state.record_best_effort(message);
    }

    Ok(Json(meeting.response))
}

pub(super) async fn blocked(State(state): State<Arc<AppState>>) -> Json<BlockedStoriesResponse> {
    let tasks = state.store.load_or_empty();
    let blocked_stories: Vec<BlockedStory> = views::blocked(&tasks)
        .into_iter()
        .map(|t| BlockedStory {
            id: t.id.clone(),
            title: t.title.clone(),
            owner: t.owner_or_unassigned().to_string(),
            blocker_description: t
                .blocker_description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Unknown blocker".to_string()),
        })
        .collect();

    Json(BlockedStoriesResponse {
        blocked_count: blocked_stories.len(),
        blocked_stories,
    })
}
