//! Command-line interface for taskdeck.
//!
//! Task ids on the command line are 1-based, matching what `list` shows.

mod depends;
mod run;


pub use depends::DependsCommand;
pub use run::{run, CliOutput};

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Personal task tracker with priorities, tags, dependencies and undo.
///
/// Tasks are stored in a JSON file. Use --file or TASKDECK_FILE to pick
/// which one.
///
/// Commands not listed here are looked up among plugins (see `plugins`).
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Tasks file to use
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a new task.
    ///
    /// The description is every remaining word joined by spaces.
    Add {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,

        /// Priority: High, Medium or Low
        #[arg(short, long, default_value = "Medium")]
        priority: String,

        /// Tags to attach (space or comma separated)
        #[arg(
            short = 't',
            long = "tags",
            visible_alias = "tag",
            value_name = "TAG",
            num_args = 1..
        )]
        tags: Vec<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Add the task already completed
        #[arg(long)]
        completed: bool,
    },

    /// List tasks, pending first, each group by priority.
    List {
        /// Only pending tasks
        #[arg(long, conflicts_with = "completed")]
        pending: bool,

        /// Only completed tasks
        #[arg(long)]
        completed: bool,

        /// Only tasks with this tag
        #[arg(short = 't', long, visible_alias = "tags")]
        tag: Option<String>,

        /// Only tasks with this priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Remove a task.
    ///
    /// Later tasks move up one id. Dependencies on other tasks are not
    /// renumbered, so an edge can end up pointing at a different task, or at
    /// the task itself (it then blocks itself until `depends remove`).
    Remove {
        /// Task id
        id: usize,
    },

    /// Toggle a task between pending and completed.
    ///
    /// A task can only be completed once all of its prerequisites are.
    Complete {
        /// Task id
        id: usize,
    },

    /// Change a task's description, priority or tags.
    ///
    /// Only specified fields are updated; others remain unchanged.
    Edit {
        /// Task id
        id: usize,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Replace all tags (space or comma separated)
        #[arg(
            short = 't',
            long = "tags",
            visible_alias = "tag",
            value_name = "TAG",
            num_args = 1..
        )]
        tags: Vec<String>,

        /// Tag to add
        #[arg(long = "add-tag", value_name = "TAG")]
        add_tags: Vec<String>,

        /// Tag to remove
        #[arg(long = "remove-tag", value_name = "TAG")]
        remove_tags: Vec<String>,
    },

    /// Remove every task.
    Clear,

    /// Manage dependencies between tasks.
    #[command(subcommand)]
    Depends(DependsCommand),

    /// Undo the last change made in this process.
    Undo,

    /// Redo the last undone change.
    Redo,

    /// Show completion statistics.
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Export tasks as CSV, Markdown or iCalendar.
    ///
    /// The ics export has one all-day event per task with a due date.
    Export {
        /// Format: csv, md or ics
        format: String,

        /// Output file (stdout if omitted)
        output: Option<PathBuf>,
    },

    /// Append tasks from a CSV or Markdown file.
    ///
    /// CSV needs a header with a description column. Markdown reads
    /// `- [ ]` and `- [x]` checklist lines. Ids and dependencies in the
    /// file are ignored. Nothing is added if any row is invalid.
    Import {
        /// Format: csv or md
        format: String,

        /// File to read
        input: PathBuf,
    },

    /// Run several commands in one process (stdin: JSON array of argument arrays).
    ///
    /// Example input: [["add", "Buy milk"], ["complete", "1"], ["undo"]]
    ///
    /// Undo and redo only reach changes made in the same process, so this
    /// is the way to chain them. Stops at the first command that fails.
    Batch,

    /// List available plugin commands.
    Plugins,

    /// A plugin command.
    #[command(external_subcommand)]
    Plugin(Vec<String>),
}

impl Command {
    /// Returns true if this command requires stdin input.
    #[must_use]
    pub const fn needs_stdin(&self) -> bool {
        matches!(self, Self::Batch)
    }
}
