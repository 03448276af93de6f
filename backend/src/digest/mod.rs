//! Digest reports: summary counts, charts and a PDF status report
//!
//! [`generate_digest`] is the whole pipeline minus persistence of the log
//! entry; the HTTP handler adds that under the write lock.

pub mod chart;
pub mod pdf;
pub mod report;

use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::project_log::LogEntry;
use crate::store::{Priority, Task, TaskStatus};
use crate::views;

pub use report::{is_safe_report_name, list_reports, report_filename, ReportError};

/// Entries shown in the Recent Activity section
pub const RECENT_ACTIVITY_LIMIT: usize = 10;
/// Default burndown window when no start date is given
const DEFAULT_WINDOW_DAYS: i64 = 7;
/// Longest burndown window drawn
const MAX_WINDOW_DAYS: i64 = 366;
/// Years accepted in digest date bounds
const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestRequest {
    /// `YYYY-MM-DD`; invalid values are ignored
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default = "default_true")]
    pub include_charts: bool,
    #[serde(default = "default_true")]
    pub include_blockers: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    "Project Status Report".to_string()
}

impl Default for DigestRequest {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            include_charts: true,
            include_blockers: true,
            title: default_title(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigestSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub high_priority: usize,
    pub completion_rate: f64,
}

pub fn summarize(tasks: &[Task]) -> DigestSummary {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_done()).count();
    let completion_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    DigestSummary {
        total,
        completed,
        in_progress: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .count(),
        blocked: views::blocked(tasks).len(),
        high_priority: tasks.iter().filter(|t| t.priority == Priority::High).count(),
        completion_rate,
    }
}

/// Newest `n` entries by parsed timestamp; unparseable timestamps sort last
pub fn recent_activity(entries: &[LogEntry], n: usize) -> Vec<LogEntry> {
    let mut sorted = entries.to_vec();
    // Stable sort keeps file order among equal timestamps
    sorted.sort_by(|a, b| match (a.at, b.at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted.truncate(n);
    sorted
}

/// Inclusive date window over log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|d| SUPPORTED_YEARS.contains(&d.year()))
        .or_else(|| {
            tracing::debug!("Ignoring invalid digest date '{}'", raw);
            None
        })
}

impl DigestWindow {
    pub fn from_request(request: &DigestRequest) -> Self {
        Self {
            start: parse_date(request.start_date.as_deref()),
            end: parse_date(request.end_date.as_deref()),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Entries inside the window; undated entries only when unbounded
    pub fn filter(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        if !self.is_bounded() {
            return entries.to_vec();
        }
        entries
            .iter()
            .filter(|e| match e.day() {
                Some(day) => {
                    self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |end| day <= end)
                }
                None => false,
            })
            .cloned()
            .collect()
    }

    /// Concrete day range for the burndown chart
    pub fn burndown_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_before = |day: NaiveDate, n: i64| {
            day.checked_sub_signed(Duration::days(n - 1)).unwrap_or(NaiveDate::MIN)
        };
        let end = self.end.unwrap_or(today);
        let start = self
            .start
            .unwrap_or_else(|| days_before(end, DEFAULT_WINDOW_DAYS));
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        (start.max(days_before(end, MAX_WINDOW_DAYS)), end)
    }
}

/// Base64-encoded SVG charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestCharts {
    pub status_chart: String,
    pub burndown_chart: String,
}

/// Output of [`generate_digest`]
#[derive(Debug, Clone)]
pub struct Digest {
    pub title: String,
    pub summary: DigestSummary,
    pub charts: Option<DigestCharts>,
    pub pdf_path: PathBuf,
    pub filename: String,
}

pub fn build_charts(tasks: &[Task], entries: &[LogEntry], range: (NaiveDate, NaiveDate)) -> DigestCharts {
    let engine = base64::engine::general_purpose::STANDARD;
    let pie = chart::status_pie_svg(&views::status_counts(tasks));
    let burndown = chart::burndown_series(entries, tasks.len(), range.0, range.1);

    DigestCharts {
        status_chart: engine.encode(pie),
        burndown_chart: engine.encode(chart::burndown_svg(&burndown)),
    }
}

/// Summarize, chart and write the PDF report into `reports_dir`
pub fn generate_digest(
    request: &DigestRequest,
    tasks: &[Task],
    entries: &[LogEntry],
    reports_dir: &Path,
    now: NaiveDateTime,
) -> Result<Digest, ReportError> {
    let window = DigestWindow::from_request(request);
    let entries = window.filter(entries);
    let summary = summarize(tasks);

    let charts = request
        .include_charts
        .then(|| build_charts(tasks, &entries, window.burndown_range(now.date())));

    let blockers = views::blocked(tasks);
    let recent = recent_activity(&entries, RECENT_ACTIVITY_LIMIT);
    let title = if request.title.trim().is_empty() {
        default_title()
    } else {
        request.title.trim().to_string()
    };

    let bytes = report::render_report(&report::ReportContent {
        title: &title,
        generated_at: now,
        summary: &summary,
        blockers: request.include_blockers.then_some(blockers.as_slice()),
        recent: &recent,
    });
    let pdf_path = report::write_report(reports_dir, now, &bytes)?;
    tracing::info!("Wrote digest report {}", pdf_path.display());
    let filename = pdf_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| report_filename(now));

    Ok(Digest {
        title,
        summary,
        charts,
        filename,
        pdf_path,
    })
}
