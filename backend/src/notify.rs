//! Outbound notifications: overdue alerts, risk escalations and meeting
//! invitations.
//!
//! Delivery goes through the [`Notifier`] trait. The bundled [`LogNotifier`]
//! only records the message in the diagnostic log; a mail or chat backend
//! plugs in behind the same trait.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::config::TeamLead;
use crate::views::OverdueTask;

/// Longest body preview written to the diagnostic log
const PREVIEW_LEN: usize = 120;

/// A message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Name or e-mail address
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Details of a scheduled meeting, as sent in invitations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingInvite {
    pub title: String,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub link: String,
    pub description: String,
}

impl Notification {
    pub fn overdue(task: &OverdueTask) -> Self {
        Self {
            recipient: task.owner.clone(),
            subject: format!("Overdue: {}", task.title),
            body: format!(
                "Task {} '{}' was due {} and is {} day(s) overdue.",
                task.id, task.title, task.due_date, task.days_overdue
            ),
        }
    }

    /// Escalation sent to the project manager after a risk check-in
    pub fn risk_escalation(team_lead: &str, blockers: &[String]) -> Self {
        let mut body = format!(
            "Risk check-in from {}: {} blocker(s) reported.",
            team_lead,
            blockers.len()
        );
        for blocker in blockers {
            body.push_str("\n- ");
            body.push_str(blocker);
        }

        Self {
            recipient: "Project Manager".to_string(),
            subject: format!("Risk check-in from {}", team_lead),
            body,
        }
    }

    pub fn meeting_invitation(attendee: &TeamLead, invite: &MeetingInvite) -> Self {
        Self {
            recipient: attendee.email.clone(),
            subject: format!("Invitation: {}", invite.title),
            body: format!(
                "Hello {},\n\nYou are invited to a project triage meeting.\n\n\
                 Title: {}\nTime: {}\nDuration: {} minutes\n\nMeeting link: {}\n\n\
                 Description:\n{}\n\nThank you,\nPM Agent",
                attendee.name,
                invite.title,
                invite.start.format("%A, %B %d, %Y at %I:%M %p"),
                invite.duration_minutes,
                invite.link,
                invite.description
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to notify {recipient}: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that writes each message to the diagnostic log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %sanitize(&notification.recipient),
            subject = %sanitize(&notification.subject),
            "Sending notification: {}",
            truncate_preview(&notification.body, PREVIEW_LEN)
        );
        Ok(())
    }
}

/// Strip control characters so a message cannot forge log lines
fn sanitize(s: &str) -> String {
    s.replace(['\n', '\t'], " ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// First line of `text`, cut to `max_len` characters
fn truncate_preview(text: &str, max_len: usize) -> String {
    let first_line = sanitize(text.lines().next().unwrap_or(text));
    if first_line.chars().count() <= max_len {
        first_line
    } else {
        let head: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
