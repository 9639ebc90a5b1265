//! Task operations.
//!
//! A [`Session`] ties the store, the dependency rules and the undo history
//! together. Every operation loads the collection fresh; mutating ones take
//! a history snapshot first, validate, and save only on success.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar::{CalendarEvent, CalendarSync, NoCalendar};
use crate::error::{Error, Result, ValidationError};
use crate::tasks::graph::{self, DependencyChange, DependencyState};
use crate::tasks::history::History;
use crate::tasks::models::{validate_description, Priority, Task};
use crate::tasks::store::TaskStore;

/// Maximum number of tags reported by [`Session::stats`].
const TOP_TAGS: usize = 10;

/// A task to be added.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Description; must not be blank.
    pub description: String,
    /// Priority level.
    pub priority: Priority,
    /// Initial tags.
    pub tags: BTreeSet<String>,
    /// Optional due date, mirrored to the calendar.
    pub due: Option<NaiveDate>,
    /// Add the task already completed.
    pub completed: bool,
    /// Creation time to keep, for imported tasks. `None` means now.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A medium priority task with no tags.
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into(), ..Self::default() }
    }

    /// Set the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the due date.
    #[must_use]
    pub const fn due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }
}

/// Fields that can be changed on an existing task.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    /// New description (if Some).
    pub description: Option<String>,
    /// New priority (if Some).
    pub priority: Option<Priority>,
    /// Replace all tags (if Some). Applied before `add_tags` and `remove_tags`.
    pub tags: Option<BTreeSet<String>>,
    /// Tags to add.
    pub add_tags: BTreeSet<String>,
    /// Tags to remove.
    pub remove_tags: BTreeSet<String>,
}

impl TaskEdit {
    /// Check if any fields are set for update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }
}

/// Which completion states [`Session::list`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Every task.
    #[default]
    All,
    /// Only incomplete tasks.
    Pending,
    /// Only completed tasks.
    Completed,
}

/// Filter options for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Filter by completion state.
    pub status: StatusFilter,
    /// Only tasks carrying this tag.
    pub tag: Option<String>,
    /// Only tasks with this priority.
    pub priority: Option<Priority>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !task.completed,
            StatusFilter::Completed => task.completed,
        };
        status_ok
            && self.tag.as_ref().map_or(true, |tag| task.tags.contains(tag))
            && self.priority.map_or(true, |p| task.priority == p)
    }
}

/// A task as shown by [`Session::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    /// 0-based position in the collection.
    pub index: usize,
    /// The task itself.
    pub task: Task,
    /// Whether its prerequisites allow completion.
    pub dependency: DependencyState,
}

/// Result of [`Session::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// 0-based position of the task.
    pub index: usize,
    /// The task's description.
    pub description: String,
    /// The new completion state.
    pub completed: bool,
}

/// Completion statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Number of tasks.
    pub total: usize,
    /// Number of completed tasks.
    pub completed: usize,
    /// Completed share, 0-100, rounded to two decimals.
    pub percentage: f64,
    /// Pending tasks per priority, High first.
    pub pending_by_priority: Vec<(Priority, usize)>,
    /// Most used tags with their counts, most common first.
    pub top_tags: Vec<(String, usize)>,
}

impl Stats {
    /// Number of incomplete tasks.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.total - self.completed
    }
}

/// One user's working context: where tasks live, what can be undone, and
/// which calendar due dates go to.
pub struct Session {
    store: TaskStore,
    history: History,
    calendar: Box<dyn CalendarSync>,
}

impl Session {
    /// Create a session over a store, with an empty history and no calendar.
    #[must_use]
    pub fn new(store: TaskStore) -> Self {
        Self { store, history: History::new(), calendar: Box::new(NoCalendar) }
    }

    /// Use the given calendar for due dates.
    #[must_use]
    pub fn with_calendar(mut self, calendar: Box<dyn CalendarSync>) -> Self {
        self.calendar = calendar;
        self
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// The undo history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Load the current collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.store.load()
    }

    /// Load the collection and record it for undo.
    fn begin_mutation(&mut self) -> Result<Vec<Task>> {
        let tasks = self.store.load()?;
        self.history.snapshot(&self.store)?;
        Ok(tasks)
    }

    /// Add a task. Returns its 0-based index.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDescription`] for a blank description,
    /// or a store error.
    pub fn add(&mut self, new: NewTask) -> Result<usize> {
        let mut tasks = self.begin_mutation()?;
        tasks.push(build_task(new)?);
        self.store.save(&mut tasks)?;

        let index = tasks.len() - 1;
        self.sync_due_date(index, &tasks[index]);
        Ok(index)
    }

    /// Append several tasks in order with a single save. Returns how many
    /// were added.
    ///
    /// Either every task is added or none is.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDescription`] if any description is
    /// blank, or a store error.
    pub fn import(&mut self, new_tasks: Vec<NewTask>) -> Result<usize> {
        let mut tasks = self.begin_mutation()?;
        if new_tasks.is_empty() {
            return Ok(0);
        }
        let imported = new_tasks.into_iter().map(build_task).collect::<Result<Vec<_>>>()?;

        let first = tasks.len();
        tasks.extend(imported);
        self.store.save(&mut tasks)?;
        tracing::info!(count = tasks.len() - first, "imported tasks");

        for (index, task) in tasks.iter().enumerate().skip(first) {
            self.sync_due_date(index, task);
        }
        Ok(tasks.len() - first)
    }

    /// Mirror a due date to the calendar. Failures are logged only.
    fn sync_due_date(&self, index: usize, task: &Task) {
        if let Some(due) = task.due {
            if let Err(e) = self.calendar.create_event(&task.description, due) {
                tracing::warn!(task = index, "could not add calendar event: {e}");
            }
        }
    }

    /// Tasks matching `filter`: pending before completed, then by priority.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        let tasks = self.store.load()?;
        let mut views: Vec<TaskView> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| filter.matches(t))
            .map(|(index, task)| TaskView {
                index,
                task: task.clone(),
                dependency: graph::dependency_state(&tasks, index),
            })
            .collect();
        views.sort_by_key(|v| (v.task.completed, v.task.priority.rank()));
        Ok(views)
    }

    /// Remove a task and return it.
    ///
    /// Other tasks' `depends_on` indices are left as they are. A stale edge
    /// now resolves to whatever task holds that position, which can be the
    /// dependent task itself.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad index, or a store error.
    pub fn remove(&mut self, index: usize) -> Result<Task> {
        let mut tasks = self.begin_mutation()?;
        graph::check_index(&tasks, index)?;

        let removed = tasks.remove(index);
        tracing::debug!(index, remaining = tasks.len(), "removed task");
        self.store.save(&mut tasks)?;
        Ok(removed)
    }

    /// Toggle a task's completion state.
    ///
    /// Completing a task requires every direct prerequisite to be complete.
    /// Marking a completed task incomplete is always allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockedCompletion`] listing every pending
    /// prerequisite, a validation error for a bad index, or a store error.
    pub fn complete(&mut self, index: usize) -> Result<Completion> {
        let mut tasks = self.begin_mutation()?;
        graph::check_index(&tasks, index)?;

        if !tasks[index].completed {
            let blockers = graph::incomplete_prerequisites(&tasks, index);
            if !blockers.is_empty() {
                return Err(Error::BlockedCompletion {
                    task: graph::task_ref(&tasks, index),
                    blockers,
                });
            }
        }

        let task = &mut tasks[index];
        task.completed = !task.completed;
        let completion =
            Completion { index, description: task.description.clone(), completed: task.completed };
        self.store.save(&mut tasks)?;
        Ok(completion)
    }

    /// Change a task's description, priority or tags.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad index, an empty edit or a blank
    /// description, or a store error.
    pub fn edit(&mut self, index: usize, edit: TaskEdit) -> Result<Task> {
        let mut tasks = self.begin_mutation()?;
        graph::check_index(&tasks, index)?;
        if edit.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        let description = edit.description.as_deref().map(validate_description).transpose()?;

        let task = &mut tasks[index];
        if let Some(description) = description {
            task.description = description.to_string();
        }
        if let Some(priority) = edit.priority {
            task.priority = priority;
        }
        if let Some(tags) = edit.tags {
            task.tags = tags;
        }
        task.tags.extend(edit.add_tags);
        task.tags.retain(|t| !edit.remove_tags.contains(t));

        let updated = task.clone();
        self.store.save(&mut tasks)?;
        Ok(updated)
    }

    /// Remove every task. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn clear(&mut self) -> Result<usize> {
        let tasks = self.begin_mutation()?;
        self.store.save(&mut [])?;
        Ok(tasks.len())
    }

    /// Make `task` depend on `prerequisite` (0-based indices).
    ///
    /// # Errors
    ///
    /// See [`graph::add_dependency`]; also returns store errors.
    pub fn add_dependency(&mut self, task: usize, prerequisite: usize) -> Result<DependencyChange> {
        let mut tasks = self.begin_mutation()?;
        let change = graph::add_dependency(&mut tasks, task, prerequisite)?;
        if change != DependencyChange::Unchanged {
            self.store.save(&mut tasks)?;
        }
        Ok(change)
    }

    /// Remove the dependency of `task` on `prerequisite` (0-based indices).
    ///
    /// # Errors
    ///
    /// See [`graph::remove_dependency`]; also returns store errors.
    pub fn remove_dependency(
        &mut self,
        task: usize,
        prerequisite: usize,
    ) -> Result<DependencyChange> {
        let mut tasks = self.begin_mutation()?;
        let change = graph::remove_dependency(&mut tasks, task, prerequisite)?;
        if change != DependencyChange::Unchanged {
            self.store.save(&mut tasks)?;
        }
        Ok(change)
    }

    /// Undo the most recent mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] if there is nothing to undo.
    pub fn undo(&mut self) -> Result<()> {
        self.history.undo(&self.store)
    }

    /// Redo the most recently undone mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] if there is nothing to redo.
    pub fn redo(&mut self) -> Result<()> {
        self.history.redo(&self.store)
    }

    /// Completion statistics for the current collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stats(&self) -> Result<Stats> {
        let tasks = self.store.load()?;
        Ok(compute_stats(&tasks))
    }

    /// Calendar events in a date range, from the configured calendar.
    ///
    /// # Errors
    ///
    /// Returns the calendar's error.
    pub fn upcoming_events(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CalendarEvent>> {
        self.calendar.upcoming(from, to)
    }
}

fn build_task(new: NewTask) -> Result<Task> {
    let description = validate_description(&new.description)?;
    let mut task = Task::new(description, new.priority);
    task.tags = new.tags;
    task.due = new.due;
    task.completed = new.completed;
    if let Some(created_at) = new.created_at {
        task.created_at = created_at;
    }
    Ok(task)
}

#[allow(clippy::cast_precision_loss)]
fn compute_stats(tasks: &[Task]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let percentage = if total == 0 {
        0.0
    } else {
        ((completed as f64 / total as f64) * 10_000.0).round() / 100.0
    };

    let pending_by_priority = Priority::ALL
        .iter()
        .map(|&p| (p, tasks.iter().filter(|t| !t.completed && t.priority == p).count()))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in tasks.iter().flat_map(|t| &t.tags) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut top_tags: Vec<(String, usize)> =
        counts.into_iter().map(|(tag, n)| (tag.to_string(), n)).collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_tags.truncate(TOP_TAGS);

    Stats { total, completed, percentage, pending_by_priority, top_tags }
}
