//! Dependency edges between tasks.
//!
//! Edges are stored on each task as `depends_on` indices into the same
//! collection. Indices are not remapped when tasks are removed, so stored
//! edges may dangle; traversal skips anything out of range.

use std::collections::HashSet;

use crate::error::{Blocker, Error, Result, TaskRef, ValidationError};
use crate::tasks::models::Task;

/// Outcome of an edge edit that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyChange {
    /// The edge was added.
    Added,
    /// The edge was removed.
    Removed,
    /// Nothing changed: the edge already existed (add) or was absent (remove).
    Unchanged,
}

/// Whether a task can be completed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    /// The task has no prerequisites.
    None,
    /// Every prerequisite is complete.
    Ready,
    /// This many direct prerequisites are still pending.
    Blocked(usize),
}

/// Check that `index` is a valid position in `tasks`.
///
/// # Errors
///
/// Returns [`ValidationError::IndexOutOfRange`] otherwise.
pub fn check_index(tasks: &[Task], index: usize) -> Result<()> {
    if index < tasks.len() {
        Ok(())
    } else {
        Err(ValidationError::IndexOutOfRange { index, len: tasks.len() }.into())
    }
}

/// Would adding the edge `start -> target` (start depends on target) create a cycle?
///
/// Walks `depends_on` edges from `target`; reaching `start` means it would.
/// A self edge always would.
#[must_use]
pub fn has_cycle(tasks: &[Task], start: usize, target: usize) -> bool {
    if start == target {
        return true;
    }

    let mut visited = HashSet::new();
    let mut stack = vec![target];

    while let Some(current) = stack.pop() {
        if current == start {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(task) = tasks.get(current) {
            stack.extend(task.depends_on.iter().copied().filter(|&i| i < tasks.len()));
        }
    }

    false
}

/// Make `task_idx` depend on `prereq_idx`.
///
/// # Errors
///
/// Returns a validation error if either index is out of range, or
/// [`Error::CycleDetected`] if the edge is a self edge or closes a cycle.
/// The collection is unchanged on error.
pub fn add_dependency(
    tasks: &mut [Task],
    task_idx: usize,
    prereq_idx: usize,
) -> Result<DependencyChange> {
    check_index(tasks, task_idx)?;
    check_index(tasks, prereq_idx)?;

    if has_cycle(tasks, task_idx, prereq_idx) {
        return Err(Error::CycleDetected {
            task: task_ref(tasks, task_idx),
            prerequisite: task_ref(tasks, prereq_idx),
        });
    }

    let task = &mut tasks[task_idx];
    if task.depends_on.contains(&prereq_idx) {
        tracing::warn!(task = task_idx, prerequisite = prereq_idx, "dependency already exists");
        return Ok(DependencyChange::Unchanged);
    }

    task.depends_on.push(prereq_idx);
    Ok(DependencyChange::Added)
}

/// Remove the edge `task_idx -> prereq_idx` if present.
///
/// # Errors
///
/// Returns a validation error if either index is out of range.
pub fn remove_dependency(
    tasks: &mut [Task],
    task_idx: usize,
    prereq_idx: usize,
) -> Result<DependencyChange> {
    check_index(tasks, task_idx)?;
    check_index(tasks, prereq_idx)?;

    let task = &mut tasks[task_idx];
    let before = task.depends_on.len();
    task.depends_on.retain(|&i| i != prereq_idx);

    if task.depends_on.len() == before {
        tracing::warn!(task = task_idx, prerequisite = prereq_idx, "no such dependency");
        Ok(DependencyChange::Unchanged)
    } else {
        Ok(DependencyChange::Removed)
    }
}

/// Direct prerequisites of `task_idx` that are not completed.
///
/// Only direct edges count; out-of-range indices are ignored.
#[must_use]
pub fn incomplete_prerequisites(tasks: &[Task], task_idx: usize) -> Vec<Blocker> {
    let Some(task) = tasks.get(task_idx) else {
        return Vec::new();
    };

    task.depends_on
        .iter()
        .filter_map(|&i| tasks.get(i).map(|prereq| (i, prereq)))
        .filter(|(_, prereq)| !prereq.completed)
        .map(|(index, prereq)| Blocker { index, description: prereq.description.clone() })
        .collect()
}

/// Indices of tasks that directly depend on `task_idx`.
#[must_use]
pub fn dependents(tasks: &[Task], task_idx: usize) -> Vec<usize> {
    tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.depends_on.contains(&task_idx))
        .map(|(i, _)| i)
        .collect()
}

/// Summarize whether `task_idx` is waiting on anything.
#[must_use]
pub fn dependency_state(tasks: &[Task], task_idx: usize) -> DependencyState {
    let has_edges = tasks.get(task_idx).is_some_and(|t| !t.depends_on.is_empty());
    if !has_edges {
        return DependencyState::None;
    }
    match incomplete_prerequisites(tasks, task_idx).len() {
        0 => DependencyState::Ready,
        n => DependencyState::Blocked(n),
    }
}

pub(crate) fn task_ref(tasks: &[Task], index: usize) -> TaskRef {
    TaskRef { index, description: tasks[index].description.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::models::Priority;
    use proptest::prelude::*;

    fn tasks(n: usize) -> Vec<Task> {
        (0..n).map(|i| Task::new(&format!("Task {i}"), Priority::Medium)).collect()
    }

    /// Every stored edge set is acyclic: DFS finds no back edge.
    fn is_acyclic(tasks: &[Task]) -> bool {
        fn visit(tasks: &[Task], i: usize, state: &mut [u8]) -> bool {
            match state[i] {
                1 => return false,
                2 => return true,
                _ => {}
            }
            state[i] = 1;
            for &j in &tasks[i].depends_on {
                if j < tasks.len() && !visit(tasks, j, state) {
                    return false;
                }
            }
            state[i] = 2;
            true
        }
        let mut state = vec![0u8; tasks.len()];
        (0..tasks.len()).all(|i| visit(tasks, i, &mut state))
    }

    #[test]
    fn test_add_dependency() {
        let mut list = tasks(2);
        assert_eq!(add_dependency(&mut list, 0, 1).unwrap(), DependencyChange::Added);
        assert_eq!(list[0].depends_on, vec![1]);
        assert!(list[1].depends_on.is_empty());
    }

    #[test]
    fn test_duplicate_dependency_is_noop() {
        let mut list = tasks(2);
        add_dependency(&mut list, 0, 1).unwrap();
        assert_eq!(add_dependency(&mut list, 0, 1).unwrap(), DependencyChange::Unchanged);
        assert_eq!(list[0].depends_on, vec![1]);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut list = tasks(1);
        let err = add_dependency(&mut list, 0, 0).unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
        assert!(list[0].depends_on.is_empty());
    }

    #[test]
    fn test_reverse_edge_rejected() {
        let mut list = tasks(2);
        add_dependency(&mut list, 0, 1).unwrap();
        let before = list.clone();

        let err = add_dependency(&mut list, 1, 0).unwrap_err();
        match err {
            Error::CycleDetected { task, prerequisite } => {
                assert_eq!(task.index, 1);
                assert_eq!(prerequisite.index, 0);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(list, before);
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let mut list = tasks(3);
        // 2 -> 1 -> 0
        add_dependency(&mut list, 1, 0).unwrap();
        add_dependency(&mut list, 2, 1).unwrap();
        assert!(add_dependency(&mut list, 0, 2).is_err());
        // A parallel edge in the same direction is fine.
        assert_eq!(add_dependency(&mut list, 2, 0).unwrap(), DependencyChange::Added);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut list = tasks(2);
        let err = add_dependency(&mut list, 0, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(remove_dependency(&mut list, 9, 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_has_cycle_skips_dangling_indices() {
        let mut list = tasks(2);
        list[1].depends_on = vec![42];
        assert!(!has_cycle(&list, 0, 1));
    }

    #[test]
    fn test_has_cycle_terminates_on_existing_cycle() {
        let mut list = tasks(3);
        // Corrupt data: 1 <-> 2 already cyclic.
        list[1].depends_on = vec![2];
        list[2].depends_on = vec![1];
        assert!(!has_cycle(&list, 0, 1));
        assert!(has_cycle(&list, 1, 2));
    }

    #[test]
    fn test_remove_dependency() {
        let mut list = tasks(2);
        add_dependency(&mut list, 0, 1).unwrap();
        assert_eq!(remove_dependency(&mut list, 0, 1).unwrap(), DependencyChange::Removed);
        assert!(list[0].depends_on.is_empty());
        assert_eq!(remove_dependency(&mut list, 0, 1).unwrap(), DependencyChange::Unchanged);
    }

    #[test]
    fn test_incomplete_prerequisites_direct_only() {
        let mut list = tasks(3);
        add_dependency(&mut list, 0, 1).unwrap();
        add_dependency(&mut list, 1, 2).unwrap();
        list[1].completed = true;

        // Task 2 is pending but only reachable transitively.
        assert!(incomplete_prerequisites(&list, 0).is_empty());
        assert_eq!(
            incomplete_prerequisites(&list, 1),
            vec![Blocker { index: 2, description: "Task 2".to_string() }]
        );
    }

    #[test]
    fn test_incomplete_prerequisites_ignores_dangling() {
        let mut list = tasks(1);
        list[0].depends_on = vec![3];
        assert!(incomplete_prerequisites(&list, 0).is_empty());
        assert!(incomplete_prerequisites(&list, 8).is_empty());
    }

    #[test]
    fn test_dependents_and_state() {
        let mut list = tasks(3);
        add_dependency(&mut list, 0, 2).unwrap();
        add_dependency(&mut list, 1, 2).unwrap();
        assert_eq!(dependents(&list, 2), vec![0, 1]);

        assert_eq!(dependency_state(&list, 2), DependencyState::None);
        assert_eq!(dependency_state(&list, 0), DependencyState::Blocked(1));
        list[2].completed = true;
        assert_eq!(dependency_state(&list, 0), DependencyState::Ready);
    }

    proptest! {
        #[test]
        fn prop_graph_stays_acyclic(edges in proptest::collection::vec((0usize..6, 0usize..6), 0..40)) {
            let mut list = tasks(6);
            for (a, b) in edges {
                let before = list.clone();
                match add_dependency(&mut list, a, b) {
                    Ok(_) => {}
                    Err(Error::CycleDetected { .. }) => prop_assert_eq!(&list, &before),
                    Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                }
                prop_assert!(is_acyclic(&list));
            }
        }

        #[test]
        fn prop_reverse_of_added_edge_always_fails(a in 0usize..5, b in 0usize..5) {
            prop_assume!(a != b);
            let mut list = tasks(5);
            add_dependency(&mut list, a, b).unwrap();
            let before = list.clone();
            let is_cycle = matches!(add_dependency(&mut list, b, a), Err(Error::CycleDetected { .. }));
            prop_assert!(is_cycle);
            prop_assert_eq!(list, before);
        }
    }
}
