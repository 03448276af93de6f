// File helpers shared by the task store, project log and report writer

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Maximum files examined by one cleanup pass
const CLEANUP_SCAN_LIMIT: usize = 1000;

/// Temp files older than this are left over from an interrupted write
pub const CLEANUP_AGE_THRESHOLD: Duration = Duration::from_secs(3600);

/// Distinguishes temp files of concurrent writers within one process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Atomically replace a file using write-to-temp + fsync + rename
///
/// The temp file lives in the same directory so the rename stays on one
/// filesystem; readers see either the old content or the new, never a
/// truncated file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let temp_path = parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    let mut file = fs::File::create(&temp_path)?;
    if let Err(e) = file.write_all(contents).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

/// Read a file to a string, mapping "does not exist" to `None`
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete `*.tmp.*` files under `dir` older than `max_age`
///
/// Scans at most `CLEANUP_SCAN_LIMIT` files so startup is never blocked on a
/// large directory. Returns the number of files deleted.
pub fn cleanup_stale_temps(dir: &Path, max_age: Duration) -> usize {
    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in walkdir::WalkDir::new(dir)
        .max_depth(2) // <data>/<subdir>/<file>
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .take(CLEANUP_SCAN_LIMIT)
    {
        let path = entry.path();
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.contains(".tmp."));
        if !is_temp {
            continue;
        }

        let age = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) {
            match fs::remove_file(path) {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(
                    "Failed to delete stale temp file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }

    deleted
}
