// Project log: append-only Markdown activity log
// Persisted to <data>/project_log.md; appends hold an exclusive lock on a
// sibling .project_log.md.lock file and rewrite the log atomically

pub mod entry;
pub mod filter;

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use fs2::FileExt;

pub use entry::{format_entry, parse_entries, parse_entry_line, LogEntry, TIMESTAMP_FORMAT};
pub use filter::{LogCategory, LogFilter, DEFAULT_LIMIT};

use crate::persistence::{atomic_write, read_optional};

const LOG_HEADER: &str = "# Project Log\n\n";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log message must not be empty")]
    EmptyMessage,
    #[error("I/O error on project log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to the project log file
#[derive(Debug, Clone)]
pub struct ProjectLog {
    path: PathBuf,
}

impl ProjectLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling lock file guarding appends
    pub fn lock_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project_log.md");
        self.path.with_file_name(format!(".{}.lock", name))
    }

    fn io_err(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Append an entry stamped with the current local time
    pub fn append(&self, message: &str) -> Result<LogEntry, LogError> {
        self.append_at(message, Local::now().naive_local())
    }

    /// Append an entry with an explicit timestamp
    pub fn append_at(&self, message: &str, at: NaiveDateTime) -> Result<LogEntry, LogError> {
        let message = entry::flatten_message(message).ok_or(LogError::EmptyMessage)?;
        let line = format_entry(at, &message);

        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| self.io_err(e))?;

        // Acquire exclusive lock (blocking)
        lock_file.lock_exclusive().map_err(|e| self.io_err(e))?;

        let mut content = match read_optional(&self.path).map_err(|e| self.io_err(e))? {
            Some(existing) if !existing.is_empty() => existing,
            _ => LOG_HEADER.to_string(),
        };
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&line);
        content.push('\n');

        atomic_write(&self.path, content.as_bytes()).map_err(|e| self.io_err(e))?;

        // Lock is released when lock_file is dropped
        drop(lock_file);

        tracing::debug!("Project log: {}", message);
        parse_entry_line(&line).ok_or(LogError::EmptyMessage)
    }

    /// Raw log content; a missing file reads as empty
    pub fn read(&self) -> Result<String, LogError> {
        Ok(read_optional(&self.path)
            .map_err(|e| self.io_err(e))?
            .unwrap_or_default())
    }

    /// Parsed entries in file order; read failures are logged and yield none
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.read() {
            Ok(content) => parse_entries(&content),
            Err(e) => {
                tracing::error!("Error reading project log: {}", e);
                Vec::new()
            }
        }
    }

    /// Entries matching `filter`, newest first
    pub fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let mut entries = filter.apply(self.entries());
        entries.reverse();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_append_creates_file_with_header() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));

        let entry = log.append_at("first entry", at("2025-08-01 09:30")).unwrap();
        assert_eq!(entry.message, "first entry");
        assert_eq!(entry.timestamp, "2025-08-01 09:30");

        let content = log.read().unwrap();
        assert_eq!(content, "# Project Log\n\n- **2025-08-01 09:30**: first entry\n");
    }

    #[test]
    fn test_append_adds_missing_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("project_log.md");
        std::fs::write(&path, "- **2025-08-01 09:00**: existing").unwrap();
        let log = ProjectLog::new(&path);

        log.append_at("next", at("2025-08-01 10:00")).unwrap();

        let messages: Vec<_> = log.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["existing", "next"]);
    }

    #[test]
    fn test_append_rejects_blank_and_flattens_newlines() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));

        assert!(matches!(log.append("  \n "), Err(LogError::EmptyMessage)));
        assert!(!log.path().exists());

        log.append("line one\nline two").unwrap();
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "line one line two");
    }

    #[test]
    fn test_sequential_appends_preserve_order() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));

        for i in 0..20 {
            log.append(&format!("entry {}", i)).unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 20);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.message, format!("entry {}", i));
        }
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let log = Arc::new(ProjectLog::new(temp_dir.path().join("project_log.md")));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        log.append(&format!("thread {} entry {}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.entries().len(), 80);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));

        assert_eq!(log.read().unwrap(), "");
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_query_returns_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let log = ProjectLog::new(temp_dir.path().join("project_log.md"));
        log.append_at("old", at("2025-08-01 09:00")).unwrap();
        log.append_at("new", at("2025-08-02 09:00")).unwrap();

        let entries = log.query(&LogFilter::default());
        assert_eq!(entries[0].message, "new");
        assert_eq!(entries[1].message, "old");
    }

    #[test]
    fn test_lock_path_is_sibling() {
        let log = ProjectLog::new("/data/project_log.md");
        assert_eq!(log.lock_path(), PathBuf::from("/data/.project_log.md.lock"));
    }
}
