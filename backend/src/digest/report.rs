// PDF status report layout and the reports directory

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::pdf::{Font, PdfDocument};
use super::DigestSummary;
use crate::persistence::atomic_write;
use crate::project_log::LogEntry;
use crate::store::Task;

const REPORT_PREFIX: &str = "project_report_";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Content of one report
pub struct ReportContent<'a> {
    pub title: &'a str,
    pub generated_at: NaiveDateTime,
    pub summary: &'a DigestSummary,
    /// `None` omits the blockers section
    pub blockers: Option<&'a [&'a Task]>,
    pub recent: &'a [LogEntry],
}

/// Lay out the report as PDF bytes
pub fn render_report(content: &ReportContent<'_>) -> Vec<u8> {
    let mut doc = PdfDocument::new();

    doc.centered(content.title, Font::Bold, 16.0);
    doc.space(5.0);
    doc.paragraph(
        &format!(
            "Generated on: {}",
            content.generated_at.format("%Y-%m-%d %H:%M")
        ),
        Font::Regular,
        10.0,
    );
    doc.space(5.0);

    doc.paragraph("Project Overview", Font::Bold, 14.0);
    doc.space(2.0);
    let summary = content.summary;
    for line in [
        format!("Total Tasks: {}", summary.total),
        format!("Completed Tasks: {}", summary.completed),
        format!("In Progress: {}", summary.in_progress),
        format!("Blocked: {}", summary.blocked),
        format!("High Priority: {}", summary.high_priority),
        format!("Completion Rate: {:.1}%", summary.completion_rate),
    ] {
        doc.paragraph(&line, Font::Regular, 10.0);
    }

    if let Some(blockers) = content.blockers {
        doc.add_page();
        doc.paragraph("Blockers and Risks", Font::Bold, 14.0);
        doc.space(2.0);

        if blockers.is_empty() {
            doc.paragraph("No blockers identified at this time.", Font::Regular, 10.0);
        }
        for task in blockers {
            doc.paragraph(&format!("{}: {}", task.id, task.title), Font::Bold, 10.0);
            let reason = task
                .blocker_description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or("No details provided");
            doc.paragraph(&format!("Blocker: {}", reason), Font::Regular, 10.0);
            doc.space(2.0);
        }
    }

    doc.add_page();
    doc.paragraph("Recent Activity", Font::Bold, 14.0);
    doc.space(2.0);

    if content.recent.is_empty() {
        doc.paragraph("No recent activity logged.", Font::Regular, 10.0);
    }
    for entry in content.recent {
        doc.paragraph(&entry.timestamp, Font::Bold, 8.0);
        doc.paragraph(&entry.message, Font::Regular, 10.0);
        doc.space(2.0);
    }

    doc.to_bytes()
}

pub fn report_filename(at: NaiveDateTime) -> String {
    format!("{}{}.pdf", REPORT_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// Write report bytes into `dir`, returning the full path
///
/// A report already written in the same second keeps its file; the new one
/// gets an `_<n>` suffix.
pub fn write_report(dir: &Path, at: NaiveDateTime, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    let stamp = at.format("%Y%m%d_%H%M%S");
    let mut path = dir.join(report_filename(at));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}{}_{}.pdf", REPORT_PREFIX, stamp, n));
        n += 1;
    }
    atomic_write(&path, bytes).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// A bare file name: no separators, no parent references
pub fn is_safe_report_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && name != "."
}

/// Report file names in `dir`, newest first
pub fn list_reports(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = read_dir
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with(REPORT_PREFIX) && name.ends_with(".pdf"))
        .collect();

    // Timestamped names sort chronologically
    names.sort_unstable_by(|a, b| b.cmp(a));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn summary() -> DigestSummary {
        DigestSummary {
            total: 4,
            completed: 1,
            in_progress: 1,
            blocked: 1,
            high_priority: 2,
            completion_rate: 25.0,
        }
    }

    #[test]
    fn test_render_report_sections() {
        let mut task = Task::new("TSK-002", "Deploy");
        task.mark_blocked(None);
        let blockers = vec![&task];
        let recent = vec![LogEntry::new("2025-08-01 09:00", "Task created")];
        let summary = summary();

        let bytes = render_report(&ReportContent {
            title: "Weekly Status",
            generated_at: at("2025-08-02 10:00:00"),
            summary: &summary,
            blockers: Some(blockers.as_slice()),
            recent: &recent,
        });
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("(Weekly Status) Tj"));
        assert!(text.contains("(Completion Rate: 25.0%) Tj"));
        assert!(text.contains("(TSK-002: Deploy) Tj"));
        assert!(text.contains("(Blocker: No details provided) Tj"));
        assert!(text.contains("(Task created) Tj"));
        assert!(text.contains("/Count 3"));
    }

    #[test]
    fn test_render_report_empty_sections() {
        let summary = DigestSummary::default();
        let bytes = render_report(&ReportContent {
            title: "Empty",
            generated_at: at("2025-08-02 10:00:00"),
            summary: &summary,
            blockers: Some(&[][..]),
            recent: &[],
        });
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("No blockers identified at this time."));
        assert!(text.contains("No recent activity logged."));

        let bytes = render_report(&ReportContent {
            title: "No blockers section",
            generated_at: at("2025-08-02 10:00:00"),
            summary: &summary,
            blockers: None,
            recent: &[],
        });
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("Blockers and Risks"));
        assert!(text.contains("/Count 2"));
    }

    #[test]
    fn test_write_and_list_reports() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        write_report(dir, at("2025-08-01 09:00:00"), b"%PDF-1.4").unwrap();
        let newest = write_report(dir, at("2025-08-02 09:00:00"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        assert_eq!(
            newest.file_name().unwrap().to_str().unwrap(),
            "project_report_20250802_090000.pdf"
        );
        assert_eq!(
            list_reports(dir),
            vec![
                "project_report_20250802_090000.pdf",
                "project_report_20250801_090000.pdf"
            ]
        );
        assert!(list_reports(&dir.join("missing")).is_empty());
    }

    #[test]
    fn test_same_second_reports_do_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let at = at("2025-08-02 09:00:00");

        let first = write_report(dir, at, b"%PDF-1.4 first").unwrap();
        let second = write_report(dir, at, b"%PDF-1.4 second").unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "project_report_20250802_090000_1.pdf"
        );
        assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1.4 first");
        assert_eq!(list_reports(dir).len(), 2);
    }

    #[test]
    fn test_safe_report_names() {
        assert!(is_safe_report_name("project_report_20250802_090000.pdf"));
        assert!(!is_safe_report_name("../task.json"));
        assert!(!is_safe_report_name("reports/x.pdf"));
        assert!(!is_safe_report_name("..\\x.pdf"));
        assert!(!is_safe_report_name(""));
    }
}
