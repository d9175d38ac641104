use std::sync::Arc;

use tracing::{debug, info};

use crate::observe::{Observable, Subscription};
use crate::task::Task;

/// Immutable view of the whole task list at one point in time.
pub type Snapshot = Arc<Vec<Task>>;

/// In-memory owner of the task list.
///
/// Every mutation builds a new list and swaps it in whole, then republishes
/// it to all subscribers. Lookups and mutations by unknown id are silent
/// no-ops.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Observable<Snapshot>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Observable::new(Arc::new(tasks)),
        }
    }

    /// Subscribes to the task list. The first value received is the
    /// current list.
    pub fn snapshot(&self) -> Subscription<Snapshot> {
        self.tasks.subscribe()
    }

    pub fn current(&self) -> Snapshot {
        self.tasks.get()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }

    #[tracing::instrument(skip(self, task), fields(task_id = %task.id))]
    pub fn add(&self, task: Task) {
        self.tasks.update(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(task);
            Some(Arc::new(next))
        });
        info!(count = self.len(), "added task");
    }

    /// Replaces the task with the same id, keeping its position.
    /// Returns whether a task matched.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.id))]
    pub fn update(&self, task: Task) -> bool {
        let changed = self.tasks.update(|current| {
            let idx = current.iter().position(|t| t.id == task.id)?;
            let mut next = current.as_ref().clone();
            next[idx] = task;
            Some(Arc::new(next))
        });
        if changed {
            info!("updated task");
        } else {
            debug!("no task with this id; update ignored");
        }
        changed
    }

    /// Returns whether a task was removed.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: &str) -> bool {
        let changed = self.tasks.update(|current| {
            if !current.iter().any(|t| t.id == id) {
                return None;
            }
            let next: Vec<Task> = current.iter().filter(|t| t.id != id).cloned().collect();
            Some(Arc::new(next))
        });
        if changed {
            info!("deleted task");
        } else {
            debug!("no task with this id; delete ignored");
        }
        changed
    }

    pub fn get_by_id(&self, id: &str) -> Option<Task> {
        self.current().iter().find(|t| t.id == id).cloned()
    }
}
