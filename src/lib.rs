//! # `taskdeck`
//!
//! A personal task tracker: tasks with priorities, tags and due dates,
//! dependencies between them, and undo/redo, all kept in one JSON file.

pub mod calendar;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod paths;
pub mod plugins;
pub mod tasks;
pub mod testing;

pub use calendar::{CalendarEvent, CalendarSync, NoCalendar};
pub use config::Settings;
pub use error::{Error, Result, ValidationError};
pub use plugins::{CommandPlugin, PluginOutcome, PluginRegistry};
pub use tasks::{NewTask, Priority, Session, Task, TaskStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
