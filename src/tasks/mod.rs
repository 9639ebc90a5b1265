//! Task tracking.
//!
//! This module provides:
//! - Tasks with a description, priority, tags and an optional due date
//! - A JSON file store with atomic saves and corrupt-file recovery
//! - Dependencies between tasks (with cycle detection)
//! - Undo/redo over whole-collection snapshots
//!
//! # Example
//!
//! ```no_run
//! use taskdeck::tasks::{NewTask, Priority, Session, TaskStore};
//!
//! let mut session = Session::new(TaskStore::new("/tmp/tasks.json"));
//!
//! let deploy = session.add(NewTask::new("Deploy auth service").priority(Priority::High)).unwrap();
//! let fix = session.add(NewTask::new("Fix login bug")).unwrap();
//! session.add_dependency(fix, deploy).unwrap();
//!
//! // Blocked until the deploy is done.
//! assert!(session.complete(fix).is_err());
//! session.undo().unwrap();
//! ```

pub mod graph;
pub mod history;
pub mod models;
pub mod ops;
pub mod store;

pub use graph::{DependencyChange, DependencyState};
pub use history::History;
pub use models::{normalize_tags, parse_due, parse_timestamp, Priority, Task};
pub use ops::{
    Completion, NewTask, Session, Stats, StatusFilter, TaskEdit, TaskFilter, TaskView,
};
pub use store::TaskStore;
