// Task store: the JSON task list, read and written wholesale
// Persisted to <data>/task.json via temp file + rename

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use super::models::Task;
use crate::persistence::{atomic_write, read_optional};

/// Matches identifiers assigned by `next_id`
static TASK_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^TSK-(\d+)$").unwrap());

/// Errors from loading or saving the task store
///
/// `NotFound` means "empty by design"; `Parse` means the file exists but is
/// corrupt and must not be overwritten blindly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task store not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to parse task store {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on task store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Load/save access to the full task list
pub trait TaskStore: Send + Sync {
    /// Load every task in stored order
    fn load(&self) -> Result<Vec<Task>, StoreError>;

    /// Replace the stored list
    fn save(&self, tasks: &[Task]) -> Result<(), StoreError>;

    /// Load for read-only views: a missing store is empty, a broken one is
    /// logged and treated as empty
    fn load_or_empty(&self) -> Vec<Task> {
        match self.load() {
            Ok(tasks) => tasks,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => {
                tracing::error!("Error loading tasks: {}", e);
                Vec::new()
            }
        }
    }

    /// Load for read-modify-write: a missing store is empty, anything else
    /// is an error so a corrupt file is never overwritten
    fn load_for_update(&self) -> Result<Vec<Task>, StoreError> {
        match self.load() {
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }
}

/// Task store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonTaskStore {
    fn load(&self) -> Result<Vec<Task>, StoreError> {
        let contents = read_optional(&self.path)
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?
            .ok_or_else(|| StoreError::NotFound(self.path.clone()))?;

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(tasks)?;
        json.push('\n');

        atomic_write(&self.path, json.as_bytes()).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory task store
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }
}

impl TaskStore for MemoryTaskStore {
    fn load(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        *self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = tasks.to_vec();
        Ok(())
    }
}

/// Next `TSK-###` identifier: max numeric suffix of matching ids plus one
pub fn next_id(tasks: &[Task]) -> String {
    let max = tasks
        .iter()
        .filter_map(|task| TASK_ID_RE.captures(task.id.trim()))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("TSK-{:03}", max + 1)
}

/// Find a task by exact id
pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|task| task.id == id)
}

/// Find a task by exact id for mutation
pub fn find_task_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    tasks.iter_mut().find(|task| task.id == id)
}
