//! Test doubles and async test helpers
//!
//! Shared by unit tests and the integration tests under `tests/`.

use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::notify::{Notification, Notifier, NotifyError};
use crate::planner::{ParsedPlan, PlanError, PlanParser};
use crate::schedule::{Calendar, CalendarEvent, EventRequest, ScheduleError};

/// Assert that an async condition eventually becomes true within a timeout.
///
/// Retries `f` every `interval` until it returns `Ok` or `timeout` passes,
/// then panics with the last error.
///
/// ```rust,ignore
/// let health = assert_eventually(
///     "server to answer /health",
///     Duration::from_secs(3),
///     Duration::from_millis(50),
///     || async { client.health().await },
/// )
/// .await;
/// ```
pub async fn assert_eventually<F, Fut, T, E>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut f: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = std::time::Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return value,
            Err(e) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    panic!(
                        "Timeout waiting for {}\n\
                         Duration: {:?}\n\
                         Attempts: {}\n\
                         Last error: {}",
                        desc, elapsed, attempt, e
                    );
                }

                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Notifier that keeps every message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
        Ok(())
    }
}

/// Calendar that books exactly the earliest slot with a fixed event id
#[derive(Debug, Clone)]
pub struct FixedCalendar {
    pub event_id: String,
}

impl Default for FixedCalendar {
    fn default() -> Self {
        Self {
            event_id: "event_test".to_string(),
        }
    }
}

#[async_trait]
impl Calendar for FixedCalendar {
    fn pick_slot(&self, earliest: NaiveDateTime, _duration_minutes: u32) -> NaiveDateTime {
        earliest
    }

    async fn create_event(&self, _event: &EventRequest) -> Result<CalendarEvent, ScheduleError> {
        Ok(CalendarEvent {
            id: self.event_id.clone(),
            link: crate::schedule::meeting_link(&self.event_id),
        })
    }
}

/// Plan parser that always returns the same plan
#[derive(Debug, Clone)]
pub struct StaticPlanParser {
    plan: ParsedPlan,
}

impl StaticPlanParser {
    pub fn new(plan: ParsedPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl PlanParser for StaticPlanParser {
    async fn parse(&self, _text: &str) -> Result<ParsedPlan, PlanError> {
        Ok(self.plan.clone())
    }
}

/// Plan parser that always fails, forcing the fallback plan
#[derive(Debug, Clone, Default)]
pub struct FailingPlanParser;

#[async_trait]
impl PlanParser for FailingPlanParser {
    async fn parse(&self, _text: &str) -> Result<ParsedPlan, PlanError> {
        Err(PlanError::MissingKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_assert_eventually_succeeds_after_retries() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let result = assert_eventually(
            "counter to reach 3",
            Duration::from_secs(2),
            Duration::from_millis(20),
            move || {
                let c = Arc::clone(&counter_clone);
                async move {
                    let val = c.fetch_add(1, Ordering::SeqCst);
                    if val >= 2 {
                        Ok(val)
                    } else {
                        Err(format!("counter only at {}", val))
                    }
                }
            },
        )
        .await;

        assert!(result >= 2);
    }

    #[tokio::test]
    #[should_panic(expected = "Timeout waiting for never succeeds")]
    async fn test_assert_eventually_times_out() {
        assert_eventually(
            "never succeeds",
            Duration::from_millis(100),
            Duration::from_millis(20),
            || async { Err::<(), _>("always fails") },
        )
        .await;
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_messages() {
        let notifier = RecordingNotifier::default();
        let n = Notification {
            recipient: "Bob".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        notifier.send(&n).await.unwrap();
        assert_eq!(notifier.sent(), vec![n]);
    }
}
