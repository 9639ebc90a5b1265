//! JSON file-backed task store.
//!
//! The whole collection is read on every load and written on every save.
//! Saves go through a temporary file in the same directory that is synced
//! and then renamed over the destination, so readers only ever see the old
//! or the new contents. There is no locking: concurrent invocations race
//! and the last writer wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::error::Category;

use crate::error::{Error, IoStage, Result};
use crate::paths;
use crate::tasks::models::{deserialize_collection, Task};

/// Backup reason for a file that is not valid JSON.
pub const REASON_JSON_DECODE: &str = "json-decode-error";

/// Backup reason for valid JSON that is not a task collection.
pub const REASON_SCHEMA: &str = "schema-error";

/// Durable storage for the task collection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    /// Path to the backing JSON file.
    path: PathBuf,
}

impl TaskStore {
    /// Create a store backed by the given file. Nothing is read or created yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt file is moved for the given reason.
    #[must_use]
    pub fn backup_path(&self, reason: &str) -> PathBuf {
        paths::backup_path(&self.path, reason)
    }

    /// Load the collection.
    ///
    /// A missing or blank file is an empty collection. A file that does not
    /// parse is moved to [`Self::backup_path`] and an empty collection is
    /// returned; the recovery is logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read, or if a
    /// corrupt file cannot be moved aside.
    pub fn load(&self) -> Result<Vec<Task>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no task file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::io(IoStage::Read, &self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match parse_collection(&bytes) {
            Ok(tasks) => {
                tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded tasks");
                Ok(tasks)
            }
            Err(e) => {
                let reason = match e.classify() {
                    Category::Data => REASON_SCHEMA,
                    Category::Syntax | Category::Eof | Category::Io => REASON_JSON_DECODE,
                };
                self.recover(reason, &e)?;
                Ok(Vec::new())
            }
        }
    }

    /// Move a corrupt file aside so the next save starts clean.
    fn recover(&self, reason: &str, cause: &serde_json::Error) -> Result<()> {
        let corrupt = Error::CorruptStore { path: self.path.clone(), reason: cause.to_string() };
        let backup = self.backup_path(reason);
        fs::rename(&self.path, &backup).map_err(|e| Error::io(IoStage::Backup, &self.path, e))?;
        tracing::warn!(
            backup = %backup.display(),
            "{corrupt}; moved it aside and starting with an empty task list"
        );
        Ok(())
    }

    /// Save the collection, renumbering every task's `id` to its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] naming the step that failed. The previously
    /// saved file is left untouched in that case.
    pub fn save(&self, tasks: &mut [Task]) -> Result<()> {
        reindex(tasks);
        let json = serde_json::to_string_pretty(&tasks)?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "saved tasks");
        Ok(())
    }

    /// Serialize the currently persisted collection, or `None` if there is
    /// no file yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn load_snapshot(&self) -> Result<Option<String>> {
        let tasks = self.load()?;
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::to_string(&tasks)?))
    }

    /// Put back a state taken by [`Self::load_snapshot`]. `None` removes the
    /// file.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not parse, cannot be saved, or
    /// the file cannot be removed.
    pub fn restore(&self, snapshot: Option<&str>) -> Result<()> {
        let Some(snapshot) = snapshot else {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::io(IoStage::Remove, &self.path, e)),
            };
        };
        let mut tasks = parse_collection(snapshot.as_bytes())?;
        self.save(&mut tasks)
    }
}

/// Set each task's `id` to its 0-based position.
pub fn reindex(tasks: &mut [Task]) {
    for (i, task) in tasks.iter_mut().enumerate() {
        task.id = i;
    }
}

fn parse_collection(bytes: &[u8]) -> std::result::Result<Vec<Task>, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let tasks = deserialize_collection(&mut de)?;
    de.end()?;
    Ok(tasks)
}

/// Write a file atomically by writing to a synced temp file and renaming it.
///
/// # Errors
///
/// Returns [`Error::Io`] tagged with the failing step. The temp file is
/// removed on failure; the destination is only touched by the final rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(IoStage::CreateDir, parent, e))?;
    }

    let temp = paths::temp_path(path);
    let result = write_temp(&temp, contents).and_then(|()| {
        fs::rename(&temp, path).map_err(|e| Error::io(IoStage::Rename, path, e))
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_temp(temp: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp).map_err(|e| Error::io(IoStage::CreateTemp, temp, e))?;
    file.write_all(contents).map_err(|e| Error::io(IoStage::Write, temp, e))?;
    file.sync_all().map_err(|e| Error::io(IoStage::Sync, temp, e))?;
    Ok(())
}
