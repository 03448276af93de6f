//! Triage meeting scheduling
//!
//! Slot search starts from [`earliest_start`], then a [`Calendar`] picks the
//! actual slot and creates the event. [`StubCalendar`] stands in for a real
//! calendar API.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::TeamLead;
use crate::notify::{MeetingInvite, Notification, Notifier};

pub const DEFAULT_MEETING_TITLE: &str = "Project Triage Meeting";
pub const MAX_DURATION_MINUTES: u32 = 480;
/// Largest random offset the stub calendar adds to a slot
const STUB_MAX_OFFSET_MINUTES: i64 = 120;
/// Furthest a preferred day may lie from today, in either direction
pub const MAX_PREFERRED_DAY_DISTANCE_DAYS: i64 = 5 * 366;

fn default_title() -> String {
    DEFAULT_MEETING_TITLE.to_string()
}

fn default_duration() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRequest {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_true")]
    pub auto_schedule: bool,
    #[serde(default)]
    pub blocked_stories: Option<Vec<String>>,
    #[serde(default)]
    pub additional_attendees: Option<Vec<TeamLead>>,
    /// `HH:MM`, 24-hour
    #[serde(default)]
    pub preferred_start_time: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub preferred_day: Option<String>,
}

impl Default for MeetingRequest {
    fn default() -> Self {
        Self {
            title: default_title(),
            duration_minutes: default_duration(),
            auto_schedule: true,
            blocked_stories: None,
            additional_attendees: None,
            preferred_start_time: None,
            preferred_day: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingResponse {
    pub message: String,
    pub meeting_id: Option<String>,
    pub scheduled_time: Option<String>,
    pub meeting_link: Option<String>,
    pub attendees: Option<Vec<String>>,
}

/// Event to create on the calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRequest {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub attendees: Vec<TeamLead>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("duration_minutes must be between 1 and 480")]
    InvalidDuration,
    #[error("preferred_day {0} is out of range")]
    PreferredDayOutOfRange(NaiveDate),
    #[error("calendar error: {0}")]
    Calendar(String),
}

#[async_trait]
pub trait Calendar: Send + Sync {
    /// Choose a start time at or after `earliest`
    fn pick_slot(&self, earliest: NaiveDateTime, duration_minutes: u32) -> NaiveDateTime;

    async fn create_event(&self, event: &EventRequest) -> Result<CalendarEvent, ScheduleError>;
}

/// Calendar stand-in: random slot offset, synthetic event id and link
#[derive(Debug, Clone, Default)]
pub struct StubCalendar;

/// Meet-style link built from an event id
pub fn meeting_link(event_id: &str) -> String {
    let chars: Vec<char> = event_id.chars().collect();
    let part = |from: usize, to: usize| -> String {
        chars
            .get(from.min(chars.len())..to.min(chars.len()))
            .map(|s| s.iter().collect())
            .unwrap_or_default()
    };
    format!(
        "https://meet.google.com/{}-{}-{}",
        part(0, 4),
        part(4, 8),
        part(8, 12)
    )
}

#[async_trait]
impl Calendar for StubCalendar {
    fn pick_slot(&self, earliest: NaiveDateTime, _duration_minutes: u32) -> NaiveDateTime {
        let offset = rand::thread_rng().gen_range(0..=STUB_MAX_OFFSET_MINUTES);
        let slot = earliest
            .checked_add_signed(Duration::minutes(offset))
            .unwrap_or(earliest);
        round_down_15(slot)
    }

    async fn create_event(&self, event: &EventRequest) -> Result<CalendarEvent, ScheduleError> {
        let id = format!("event_{}", Utc::now().timestamp());
        let link = meeting_link(&id);
        tracing::info!("Created meeting: {} at {}", event.title, event.start);
        tracing::info!(
            "Attendees: {}",
            event
                .attendees
                .iter()
                .map(|a| a.email.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(CalendarEvent { id, link })
    }
}

/// Truncate to the quarter hour, dropping seconds
pub fn round_down_15(at: NaiveDateTime) -> NaiveDateTime {
    let minute = at.minute() / 15 * 15;
    at.date()
        .and_hms_opt(at.hour(), minute, 0)
        .unwrap_or(at)
}

fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_preferred_time(raw: Option<&str>) -> NaiveTime {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default_start_time();
    };
    let Some((h, m)) = raw.split_once(':') else {
        return default_start_time();
    };
    match (h.trim().parse::<u32>(), m.trim().parse::<u32>()) {
        (Ok(h), Ok(m)) => NaiveTime::from_hms_opt(h, m, 0).unwrap_or_else(default_start_time),
        _ => default_start_time(),
    }
}

/// Earliest acceptable start for a meeting
///
/// Invalid day means today, invalid or out-of-range time means 10:00. A
/// start in the past today moves to tomorrow; any other past start becomes
/// now + 1h rounded down to the quarter hour.
pub fn earliest_start(
    now: NaiveDateTime,
    preferred_day: Option<&str>,
    preferred_time: Option<&str>,
) -> NaiveDateTime {
    let day = preferred_day
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| now.date());
    let mut start = day.and_time(parse_preferred_time(preferred_time));

    if start < now {
        if start.date() == now.date() {
            start = start.checked_add_signed(Duration::days(1)).unwrap_or(start);
        }
        if start < now {
            start = round_down_15(now.checked_add_signed(Duration::hours(1)).unwrap_or(now));
        }
    }
    start
}

/// Reject a parseable preferred day too far from `today` to schedule
fn check_preferred_day(raw: Option<&str>, today: NaiveDate) -> Result<(), ScheduleError> {
    let Some(day) = raw.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()) else {
        return Ok(());
    };
    if (day - today).num_days().abs() > MAX_PREFERRED_DAY_DISTANCE_DAYS {
        return Err(ScheduleError::PreferredDayOutOfRange(day));
    }
    Ok(())
}

pub fn meeting_title(requested: &str, blocked_count: usize, today: NaiveDate) -> String {
    let requested = requested.trim();
    if !requested.is_empty() && requested != DEFAULT_MEETING_TITLE {
        return requested.to_string();
    }
    if blocked_count > 0 {
        format!("Triage Meeting - {} Blocked Stories", blocked_count)
    } else {
        format!("{} - {}", DEFAULT_MEETING_TITLE, today.format("%Y-%m-%d"))
    }
}

/// Team leads plus extra attendees, de-duplicated by e-mail
pub fn merge_attendees(leads: &[TeamLead], additional: &[TeamLead]) -> Vec<TeamLead> {
    let mut attendees: Vec<TeamLead> = Vec::with_capacity(leads.len() + additional.len());
    for person in leads.iter().chain(additional) {
        let email = person.email.trim();
        if email.is_empty() || attendees.iter().any(|a| a.email.eq_ignore_ascii_case(email)) {
            continue;
        }
        attendees.push(person.clone());
    }
    attendees
}

pub fn meeting_description(blocked: &[String]) -> String {
    let mut description = String::from("Triage meeting to discuss blocked stories:\n\n");
    for (i, story) in blocked.iter().enumerate() {
        description.push_str(&format!("{}. {}\n", i + 1, story));
    }
    description
}

/// Outcome of [`schedule_meeting`]
#[derive(Debug, Clone)]
pub struct ScheduledMeeting {
    pub response: MeetingResponse,
    /// Project-log line to record; `None` when only a time was proposed
    pub log_message: Option<String>,
}

/// Plan and, with `auto_schedule`, book a triage meeting
///
/// `default_blocked` is used when the request names no blocked stories.
/// Invitation failures are logged and do not fail the booking.
pub async fn schedule_meeting(
    request: &MeetingRequest,
    default_blocked: Vec<String>,
    team_leads: &[TeamLead],
    calendar: &dyn Calendar,
    notifier: &dyn Notifier,
    now: NaiveDateTime,
) -> Result<ScheduledMeeting, ScheduleError> {
    if request.duration_minutes == 0 || request.duration_minutes > MAX_DURATION_MINUTES {
        return Err(ScheduleError::InvalidDuration);
    }
    check_preferred_day(request.preferred_day.as_deref(), now.date())?;

    let blocked = match &request.blocked_stories {
        Some(stories) if !stories.is_empty() => stories.clone(),
        _ => default_blocked,
    };
    let title = meeting_title(&request.title, blocked.len(), now.date());
    let attendees = merge_attendees(
        team_leads,
        request.additional_attendees.as_deref().unwrap_or_default(),
    );
    let emails: Vec<String> = attendees.iter().map(|a| a.email.clone()).collect();

    let earliest = earliest_start(
        now,
        request.preferred_day.as_deref(),
        request.preferred_start_time.as_deref(),
    );
    let start = calendar.pick_slot(earliest, request.duration_minutes);
    let end = start
        .checked_add_signed(Duration::minutes(i64::from(request.duration_minutes)))
        .ok_or(ScheduleError::PreferredDayOutOfRange(start.date()))?;
    let when = start.format("%Y-%m-%d %H:%M").to_string();

    if !request.auto_schedule {
        return Ok(ScheduledMeeting {
            response: MeetingResponse {
                message: format!(
                    "Proposed meeting time: {}. Use auto_schedule=true to confirm.",
                    when
                ),
                meeting_id: None,
                scheduled_time: Some(start.format("%Y-%m-%dT%H:%M:%S").to_string()),
                meeting_link: None,
                attendees: Some(emails),
            },
            log_message: None,
        });
    }

    let description = meeting_description(&blocked);
    let event = calendar
        .create_event(&EventRequest {
            title: title.clone(),
            start,
            end,
            attendees: attendees.clone(),
            description: description.clone(),
        })
        .await?;

    let invite = MeetingInvite {
        title: title.clone(),
        start,
        duration_minutes: request.duration_minutes,
        link: event.link.clone(),
        description,
    };
    for attendee in &attendees {
        let notification = Notification::meeting_invitation(attendee, &invite);
        if let Err(e) = notifier.send(&notification).await {
            tracing::warn!("{}", e);
        }
    }

    let names = attendees
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(ScheduledMeeting {
        response: MeetingResponse {
            message: format!("Meeting '{}' scheduled for {}", title, when),
            meeting_id: Some(event.id),
            scheduled_time: Some(start.format("%Y-%m-%dT%H:%M:%S").to_string()),
            meeting_link: Some(event.link),
            attendees: Some(emails),
        },
        log_message: Some(format!(
            "Scheduled triage meeting: '{}' at {} with {}",
            title, when, names
        )),
    })
}
