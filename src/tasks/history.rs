//! Undo/redo over whole-collection snapshots.
//!
//! Each snapshot is the full serialized collection as it was persisted
//! before a mutation, or `None` when there was no file yet. The stacks live for the lifetime of a [`History`]
//! value and are never written to disk.

use crate::error::{Error, HistoryDirection, Result};
use crate::tasks::store::TaskStore;

/// Undo and redo stacks of serialized task collections.
#[derive(Debug, Default, Clone)]
pub struct History {
    undo_stack: Vec<Option<String>>,
    redo_stack: Vec<Option<String>>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new() }
    }

    /// Record the currently persisted state before a mutation.
    ///
    /// Any redo path is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn snapshot(&mut self, store: &TaskStore) -> Result<()> {
        let state = store.load_snapshot()?;
        self.undo_stack.push(state);
        self.redo_stack.clear();
        tracing::debug!(depth = self.undo_stack.len(), "history snapshot");
        Ok(())
    }

    /// Restore the most recent snapshot, keeping the current state for redo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] if there is nothing to undo, or a
    /// store error if the swap fails. On a store error both stacks are left
    /// as they were.
    pub fn undo(&mut self, store: &TaskStore) -> Result<()> {
        step(&mut self.undo_stack, &mut self.redo_stack, store, HistoryDirection::Undo)
    }

    /// Re-apply the most recently undone state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] if there is nothing to redo, or a
    /// store error if the swap fails.
    pub fn redo(&mut self, store: &TaskStore) -> Result<()> {
        step(&mut self.redo_stack, &mut self.undo_stack, store, HistoryDirection::Redo)
    }

    /// Whether [`Self::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether [`Self::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable states.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable states.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

/// Pop from `from`, push the current disk state onto `to`, persist the popped state.
fn step(
    from: &mut Vec<Option<String>>,
    to: &mut Vec<Option<String>>,
    store: &TaskStore,
    direction: HistoryDirection,
) -> Result<()> {
    if from.is_empty() {
        return Err(Error::EmptyHistory(direction));
    }

    let current = store.load_snapshot()?;
    let Some(target) = from.pop() else {
        return Err(Error::EmptyHistory(direction));
    };

    if let Err(e) = store.restore(target.as_deref()) {
        from.push(target);
        return Err(e);
    }

    to.push(current);
    tracing::info!(%direction, remaining = from.len(), "restored snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::models::{Priority, Task};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));
        (dir, store)
    }

    fn descriptions(store: &TaskStore) -> Vec<String> {
        store.load().unwrap().into_iter().map(|t| t.description).collect()
    }

    fn save(store: &TaskStore, names: &[&str]) {
        let mut tasks: Vec<Task> = names.iter().map(|n| Task::new(n, Priority::Medium)).collect();
        store.save(&mut tasks).unwrap();
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = History::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_restores_prior_state() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();

        save(&store, &["a"]);
        history.snapshot(&store).unwrap();
        save(&store, &["a", "b"]);

        history.undo(&store).unwrap();
        assert_eq!(descriptions(&store), vec!["a"]);
        assert!(history.can_redo());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_redo_reapplies_mutation() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();

        save(&store, &["a"]);
        history.snapshot(&store).unwrap();
        save(&store, &["a", "b"]);
        let after = fs_contents(&store);

        history.undo(&store).unwrap();
        history.redo(&store).unwrap();
        assert_eq!(fs_contents(&store), after);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_chain_is_lifo() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();

        for names in [&["a"][..], &["a", "b"][..], &["a", "b", "c"][..]] {
            history.snapshot(&store).unwrap();
            save(&store, names);
        }

        history.undo(&store).unwrap();
        assert_eq!(descriptions(&store), vec!["a", "b"]);
        history.undo(&store).unwrap();
        assert_eq!(descriptions(&store), vec!["a"]);
        history.undo(&store).unwrap();
        assert!(descriptions(&store).is_empty());
        assert_eq!(history.redo_depth(), 3);
    }

    #[test]
    fn test_empty_undo_leaves_store_alone() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();
        save(&store, &["a"]);
        let before = fs_contents(&store);

        let err = history.undo(&store).unwrap_err();
        assert!(matches!(err, Error::EmptyHistory(HistoryDirection::Undo)));
        assert_eq!(fs_contents(&store), before);

        let err = history.redo(&store).unwrap_err();
        assert!(matches!(err, Error::EmptyHistory(HistoryDirection::Redo)));
    }

    #[test]
    fn test_snapshot_clears_redo() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();

        history.snapshot(&store).unwrap();
        save(&store, &["a"]);
        history.undo(&store).unwrap();
        assert!(history.can_redo());

        history.snapshot(&store).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_failed_restore_keeps_stacks() {
        let (dir, store) = create_test_store();
        let mut history = History::new();
        save(&store, &["a"]);
        history.snapshot(&store).unwrap();
        save(&store, &["a", "b"]);

        // Block the temp file so the restore cannot be written.
        std::fs::create_dir(dir.path().join("tasks.json.tmp")).unwrap();
        assert!(history.undo(&store).is_err());
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
        assert_eq!(descriptions(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_undo_first_mutation_removes_file() {
        let (_dir, store) = create_test_store();
        let mut history = History::new();
        history.snapshot(&store).unwrap();
        save(&store, &["a"]);

        history.undo(&store).unwrap();
        assert!(!store.path().exists());
        history.redo(&store).unwrap();
        assert_eq!(descriptions(&store), vec!["a"]);
    }

    fn fs_contents(store: &TaskStore) -> String {
        std::fs::read_to_string(store.path()).unwrap()
    }
}
