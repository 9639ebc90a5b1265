//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use serde::Serialize;

use crate::cli::{Cli, Command, DependsCommand};
use crate::error::{Error, Result, ValidationError};
use crate::export::{self, ExportFormat};
use crate::plugins::PluginRegistry;
use crate::tasks::{
    normalize_tags, parse_due, DependencyChange, DependencyState, NewTask, Priority, Session,
    Stats, StatusFilter, TaskEdit, TaskFilter, TaskView,
};

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

impl CliOutput {
    fn append(&mut self, other: Self) {
        self.exit_code = other.exit_code;
        self.stdout.extend(other.stdout);
        self.stderr.extend(other.stderr);
    }
}

/// Run a CLI command against a session with the given stdin input.
pub fn run(
    command: Command,
    session: &mut Session,
    plugins: &PluginRegistry,
    stdin: &str,
) -> CliOutput {
    tracing::debug!(?command, "running command");
    execute(command, session, plugins, stdin).unwrap_or_else(|e| error_report(&e))
}

fn execute(
    command: Command,
    session: &mut Session,
    plugins: &PluginRegistry,
    stdin: &str,
) -> Result<CliOutput> {
    match command {
        Command::Add { description, priority, tags, due, completed } => {
            run_add(session, &description, &priority, &tags, due.as_deref(), completed)
        }
        Command::List { pending, completed, tag, priority, json } => {
            let status = if pending {
                StatusFilter::Pending
            } else if completed {
                StatusFilter::Completed
            } else {
                StatusFilter::All
            };
            let priority = priority.as_deref().map(str::parse::<Priority>).transpose()?;
            run_list(session, &TaskFilter { status, tag, priority }, json)
        }
        Command::Remove { id } => run_remove(session, id),
        Command::Complete { id } => run_complete(session, id),
        Command::Edit { id, description, priority, tags, add_tags, remove_tags } => {
            let edit = TaskEdit {
                description,
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
                tags: (!tags.is_empty()).then(|| normalize_tags(&tags)),
                add_tags: normalize_tags(&add_tags),
                remove_tags: normalize_tags(&remove_tags),
            };
            run_edit(session, id, edit)
        }
        Command::Clear => {
            let removed = session.clear()?;
            Ok(success_output(format!("Removed {removed} task(s).")))
        }
        Command::Depends(cmd) => run_depends_cmd(session, cmd),
        Command::Undo => {
            session.undo()?;
            Ok(success_output("Undid last change.".to_string()))
        }
        Command::Redo => {
            session.redo()?;
            Ok(success_output("Redid last change.".to_string()))
        }
        Command::Stats { json } => run_stats(session, json),
        Command::Export { format, output } => run_export(session, &format, output.as_deref()),
        Command::Import { format, input } => run_import(session, &format, &input),
        Command::Batch => run_batch(session, plugins, stdin),
        Command::Plugins => Ok(run_plugins(plugins)),
        Command::Plugin(args) => run_plugin(session, plugins, &args),
    }
}

/// Convert a 1-based CLI id to a 0-based index.
fn to_index(id: usize) -> Result<usize> {
    id.checked_sub(1)
        .ok_or_else(|| ValidationError::InvalidArgument("task ids start at 1".to_string()).into())
}

// === Task Commands ===

fn run_add(
    session: &mut Session,
    description: &[String],
    priority: &str,
    tags: &[String],
    due: Option<&str>,
    completed: bool,
) -> Result<CliOutput> {
    let new = NewTask {
        description: description.join(" "),
        priority: priority.parse()?,
        tags: normalize_tags(tags),
        due: due.map(parse_due).transpose()?,
        completed,
        created_at: None,
    };
    let index = session.add(new)?;
    Ok(success_output(format!("Added task {}: {}", index + 1, description.join(" ").trim())))
}

fn run_list(session: &Session, filter: &TaskFilter, json: bool) -> Result<CliOutput> {
    let views = session.list(filter)?;
    if json {
        let output: Vec<TaskOutput> = views.iter().map(TaskOutput::from).collect();
        return json_output(&output);
    }
    if views.is_empty() {
        return Ok(success_output("No tasks found.".to_string()));
    }

    let (completed, pending): (Vec<&TaskView>, Vec<&TaskView>) =
        views.iter().partition(|v| v.task.completed);
    let mut lines = Vec::new();
    if !pending.is_empty() {
        lines.push("Pending tasks:".to_string());
        lines.extend(pending.into_iter().map(format_task));
    }
    if !completed.is_empty() {
        lines.push("Completed tasks:".to_string());
        lines.extend(completed.into_iter().map(format_task));
    }
    Ok(CliOutput { exit_code: ExitCode::SUCCESS, stdout: lines, stderr: vec![] })
}

fn format_task(view: &TaskView) -> String {
    let task = &view.task;
    let mark = if task.completed { '●' } else { '○' };
    let mut line = format!("  {mark} {}. {} [{}]", view.index + 1, task.description, task.priority);
    for tag in &task.tags {
        line.push_str(" #");
        line.push_str(tag);
    }
    if let Some(due) = task.due {
        line.push_str(&format!(" (due {due})"));
    }
    if let DependencyState::Blocked(n) = view.dependency {
        line.push_str(&format!(" ({n} blocked)"));
    }
    line
}

fn run_remove(session: &mut Session, id: usize) -> Result<CliOutput> {
    let removed = session.remove(to_index(id)?)?;
    Ok(success_output(format!("Removed task {id}: {}", removed.description)))
}

fn run_complete(session: &mut Session, id: usize) -> Result<CliOutput> {
    let completion = session.complete(to_index(id)?)?;
    let message = if completion.completed {
        format!("Completed task {id}: {}", completion.description)
    } else {
        format!("Marked task {id} as pending: {}", completion.description)
    };
    Ok(success_output(message))
}

fn run_edit(session: &mut Session, id: usize, edit: TaskEdit) -> Result<CliOutput> {
    let task = session.edit(to_index(id)?, edit)?;
    Ok(success_output(format!("Updated task {id}: {}", task.description)))
}

fn run_depends_cmd(session: &mut Session, cmd: DependsCommand) -> Result<CliOutput> {
    match cmd {
        DependsCommand::Add { task_id, prereq_id } => {
            match session.add_dependency(to_index(task_id)?, to_index(prereq_id)?)? {
                DependencyChange::Unchanged => Ok(warning_output(format!(
                    "task {task_id} already depends on task {prereq_id}"
                ))),
                _ => Ok(success_output(format!("Task {task_id} now depends on task {prereq_id}"))),
            }
        }
        DependsCommand::Remove { task_id, prereq_id } => {
            match session.remove_dependency(to_index(task_id)?, to_index(prereq_id)?)? {
                DependencyChange::Unchanged => Ok(warning_output(format!(
                    "task {task_id} does not depend on task {prereq_id}"
                ))),
                _ => Ok(success_output(format!(
                    "Task {task_id} no longer depends on task {prereq_id}"
                ))),
            }
        }
    }
}

fn run_stats(session: &Session, json: bool) -> Result<CliOutput> {
    let stats = session.stats()?;
    if json {
        return json_output(&StatsOutput::from(&stats));
    }
    if stats.total == 0 {
        return Ok(success_output("No tasks found. Add some tasks to see statistics!".to_string()));
    }

    let mut lines = vec![
        format!(
            "Completion: {}/{} tasks completed ({:.2}%)",
            stats.completed, stats.total, stats.percentage
        ),
        format!("Pending: {}", stats.pending()),
        "Pending by priority:".to_string(),
    ];
    lines.extend(stats.pending_by_priority.iter().map(|(p, n)| format!("  {p}: {n}")));
    if !stats.top_tags.is_empty() {
        lines.push("Top tags:".to_string());
        lines.extend(stats.top_tags.iter().map(|(tag, n)| format!("  {tag}: {n}")));
    }
    Ok(CliOutput { exit_code: ExitCode::SUCCESS, stdout: lines, stderr: vec![] })
}

fn run_export(session: &Session, format: &str, output: Option<&Path>) -> Result<CliOutput> {
    let format: ExportFormat = format.parse()?;
    let tasks = session.tasks()?;
    match output {
        Some(path) => {
            let count = export::write_to(path, format, &tasks)?;
            Ok(CliOutput {
                exit_code: ExitCode::SUCCESS,
                stdout: vec![],
                stderr: vec![format!("Exported {count} task(s) to {}", path.display())],
            })
        }
        None => {
            let rendered = export::render(format, &tasks);
            Ok(success_output(rendered.trim_end().to_string()))
        }
    }
}

fn run_import(session: &mut Session, format: &str, input: &Path) -> Result<CliOutput> {
    let format: ExportFormat = format.parse()?;
    let new_tasks = export::read_from(input, format)?;
    match session.import(new_tasks)? {
        0 => Ok(warning_output(format!("no tasks found in {}", input.display()))),
        n => Ok(success_output(format!("Imported {n} task(s) from {}", input.display()))),
    }
}

// === Batch and Plugins ===

fn run_batch(session: &mut Session, plugins: &PluginRegistry, stdin: &str) -> Result<CliOutput> {
    let commands: Vec<Vec<String>> = serde_json::from_str(stdin).map_err(|e| {
        ValidationError::InvalidArgument(format!("batch input must be a JSON array of argument arrays: {e}"))
    })?;

    let mut output = CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr: vec![] };
    for (n, args) in commands.into_iter().enumerate() {
        let argv = std::iter::once("taskdeck".to_string()).chain(args);
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(e) if e.use_stderr() => {
                output.append(error_output(format!("batch command {}: {e}", n + 1)));
                break;
            }
            Err(e) => {
                output.stdout.push(e.to_string());
                continue;
            }
        };
        if cli.command == Command::Batch {
            output.append(error_output("batch commands cannot be nested".to_string()));
            break;
        }
        if let Some(file) = cli.file {
            output.stderr.push(format!(
                "Warning: ignoring --file {} in batch command {}",
                file.display(),
                n + 1
            ));
        }

        let result = run(cli.command, session, plugins, "");
        let failed = result.exit_code != ExitCode::SUCCESS;
        output.append(result);
        if failed {
            break;
        }
    }
    Ok(output)
}

fn run_plugins(plugins: &PluginRegistry) -> CliOutput {
    let names = plugins.names();
    if names.is_empty() {
        return success_output("No plugins available.".to_string());
    }
    let width = names.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let lines = names.into_iter().map(|(name, about)| format!("  {name:<width$}  {about}")).collect();
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: lines, stderr: vec![] }
}

fn run_plugin(session: &mut Session, plugins: &PluginRegistry, args: &[String]) -> Result<CliOutput> {
    let Some((name, rest)) = args.split_first() else {
        return Err(Error::UnknownCommand(String::new()));
    };
    let outcome = plugins.dispatch(name, session, rest)?;
    Ok(CliOutput { exit_code: ExitCode::SUCCESS, stdout: outcome.stdout, stderr: outcome.stderr })
}

// === Output Helpers ===

fn json_output<T: Serialize>(value: &T) -> Result<CliOutput> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(success_output(json))
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn warning_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr: vec![format!("Warning: {message}")] }
}

fn error_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
}

/// Refused operations leave state unchanged and still exit 0.
const fn is_refusal(err: &Error) -> bool {
    matches!(
        err,
        Error::CycleDetected { .. }
            | Error::BlockedCompletion { .. }
            | Error::EmptyHistory(_)
            | Error::Calendar(_)
    )
}

fn error_report(err: &Error) -> CliOutput {
    let mut stderr = if is_refusal(err) {
        vec![err.to_string()]
    } else {
        tracing::debug!(error = ?err, "command failed");
        vec![format!("Error: {err}")]
    };
    if let Error::BlockedCompletion { blockers, .. } = err {
        stderr.extend(
            blockers.iter().map(|b| format!("  waiting on task {}: {}", b.index + 1, b.description)),
        );
    }
    let exit_code = if is_refusal(err) { ExitCode::SUCCESS } else { ExitCode::from(1) };
    CliOutput { exit_code, stdout: vec![], stderr }
}

// === Output Types ===

/// A task as printed by `list --json`.
#[derive(Debug, Serialize)]
struct TaskOutput<'a> {
    id: usize,
    description: &'a str,
    priority: Priority,
    completed: bool,
    tags: &'a BTreeSet<String>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<NaiveDate>,
    depends_on: Vec<usize>,
    blocked_by: usize,
}

impl<'a> From<&'a TaskView> for TaskOutput<'a> {
    fn from(view: &'a TaskView) -> Self {
        let task = &view.task;
        Self {
            id: view.index + 1,
            description: &task.description,
            priority: task.priority,
            completed: task.completed,
            tags: &task.tags,
            created_at: task.created_at,
            due: task.due,
            depends_on: task.depends_on.iter().map(|i| i + 1).collect(),
            blocked_by: match view.dependency {
                DependencyState::Blocked(n) => n,
                DependencyState::None | DependencyState::Ready => 0,
            },
        }
    }
}

/// Statistics as printed by `stats --json`.
#[derive(Debug, Serialize)]
struct StatsOutput {
    total: usize,
    completed: usize,
    pending: usize,
    percentage: f64,
    pending_by_priority: Vec<PriorityCount>,
    top_tags: Vec<TagCount>,
}

#[derive(Debug, Serialize)]
struct PriorityCount {
    priority: Priority,
    count: usize,
}

#[derive(Debug, Serialize)]
struct TagCount {
    tag: String,
    count: usize,
}

impl From<&Stats> for StatsOutput {
    fn from(stats: &Stats) -> Self {
        Self {
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending(),
            percentage: stats.percentage,
            pending_by_priority: stats
                .pending_by_priority
                .iter()
                .map(|&(priority, count)| PriorityCount { priority, count })
                .collect(),
            top_tags: stats
                .top_tags
                .iter()
                .map(|(tag, count)| TagCount { tag: tag.clone(), count: *count })
                .collect(),
        }
    }
}
