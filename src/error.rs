//! Error types for `taskdeck`.

use std::fmt;
use std::path::PathBuf;

/// A prerequisite task that is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocker {
    /// 0-based index of the prerequisite in the collection.
    pub index: usize,
    /// The prerequisite's description.
    pub description: String,
}

/// A task referenced by an error message, by index and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    /// 0-based index of the task in the collection.
    pub index: usize,
    /// The task's description.
    pub description: String,
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} ('{}')", self.index + 1, self.description)
    }
}

/// Input rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The description was empty or whitespace only.
    #[error("task description cannot be empty")]
    EmptyDescription,

    /// The priority string is not one of Low, Medium, High.
    #[error("invalid priority '{0}' (use High, Medium, or Low)")]
    InvalidPriority(String),

    /// A task index was outside the collection.
    #[error("task id {} not found ({len} task(s) available)", .index + 1)]
    IndexOutOfRange {
        /// The offending 0-based index.
        index: usize,
        /// The collection length at the time of the check.
        len: usize,
    },

    /// An edit was requested with nothing to change.
    #[error("nothing to update")]
    EmptyUpdate,

    /// A due date could not be parsed.
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// A file format other than csv, md or ics was requested.
    #[error("unknown format '{0}' (use csv, md or ics)")]
    UnknownFormat(String),

    /// A record in an imported file could not be read. Nothing was imported.
    #[error("import row {row}: {reason}")]
    ImportRow {
        /// 1-based row (CSV record or Markdown line) in the input.
        row: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Command arguments could not be understood.
    #[error("{0}")]
    InvalidArgument(String),
}

/// The step of a store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    /// Reading the backing file.
    Read,
    /// Moving a corrupt file aside.
    Backup,
    /// Creating the store directory.
    CreateDir,
    /// Creating the temporary file.
    CreateTemp,
    /// Writing the temporary file.
    Write,
    /// Forcing the temporary file to stable storage.
    Sync,
    /// Renaming the temporary file over the destination.
    Rename,
    /// Deleting the backing file.
    Remove,
}

impl IoStage {
    /// Short description of the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Backup => "back up",
            Self::CreateDir => "create directory for",
            Self::CreateTemp => "create temporary file for",
            Self::Write => "write",
            Self::Sync => "sync",
            Self::Rename => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which history stack an operation needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    /// The undo stack.
    Undo,
    /// The redo stack.
    Redo,
}

impl fmt::Display for HistoryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

/// Classify an I/O error for user-facing messages.
#[must_use]
pub fn describe_io(err: &std::io::Error) -> &'static str {
    // ENOSPC on Linux and macOS
    const ENOSPC: i32 = 28;

    match err.kind() {
        std::io::ErrorKind::PermissionDenied => "permission denied",
        std::io::ErrorKind::NotFound => "not found",
        _ if err.raw_os_error() == Some(ENOSPC) => "disk full",
        _ => "I/O error",
    }
}

/// Errors that can occur in taskdeck.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input; nothing was changed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Adding the dependency would create a cycle.
    #[error("{task} cannot depend on {prerequisite}: this creates a circular dependency")]
    CycleDetected {
        /// The task that would gain the dependency.
        task: TaskRef,
        /// The prerequisite that would be depended on.
        prerequisite: TaskRef,
    },

    /// The task has prerequisites that are still pending.
    #[error("cannot complete {task}: {} prerequisite(s) still pending", .blockers.len())]
    BlockedCompletion {
        /// The task that was to be completed.
        task: TaskRef,
        /// Every pending direct prerequisite.
        blockers: Vec<Blocker>,
    },

    /// The backing file could not be parsed.
    #[error("corrupt task store {}: {reason}", .path.display())]
    CorruptStore {
        /// The file that failed to parse.
        path: PathBuf,
        /// Why it failed.
        reason: String,
    },

    /// A file system operation failed.
    #[error("could not {stage} {}: {} ({source})", .path.display(), describe_io(.source))]
    Io {
        /// The step that failed.
        stage: IoStage,
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Undo or redo with nothing recorded.
    #[error("nothing to {0}")]
    EmptyHistory(HistoryDirection),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings file could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The current user does not match the configured user.
    #[error("user '{0}' is not authorized")]
    Unauthorized(String),

    /// No built-in or plugin command has this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The calendar collaborator failed.
    #[error("calendar error: {0}")]
    Calendar(String),
}

impl Error {
    /// Build an [`Error::Io`] for a path and stage.
    pub fn io(stage: IoStage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { stage, path: path.into(), source }
    }

    /// Whether this error is a rejected input rather than a refused or failed operation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
