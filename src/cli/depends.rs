//! Dependency CLI subcommands.

use clap::Subcommand;

/// Dependency management commands.
///
/// A task that depends on another cannot be completed until that
/// prerequisite is. Dependencies that would form a cycle are refused.
///
/// ```bash
/// # Task 2 must wait for task 1
/// taskdeck depends add 2 1
/// ```
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DependsCommand {
    /// Make a task depend on a prerequisite.
    Add {
        /// Id of the task that waits
        task_id: usize,

        /// Id of the task it waits for
        prereq_id: usize,
    },

    /// Remove a dependency.
    Remove {
        /// Id of the task that waits
        task_id: usize,

        /// Id of the task it waits for
        prereq_id: usize,
    },
}
