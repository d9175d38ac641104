use std::sync::Arc;

use tracing::instrument;

use crate::observe::Subscription;
use crate::store::{Snapshot, TaskStore};
use crate::task::Task;

/// Controller behind the task list screen.
#[derive(Debug, Clone)]
pub struct HomeView {
    store: Arc<TaskStore>,
}

impl HomeView {
    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }

    pub fn tasks(&self) -> Snapshot {
        self.store.current()
    }

    pub fn watch(&self) -> Subscription<Snapshot> {
        self.store.snapshot()
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: &str) -> bool {
        self.store.delete(id)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub fn toggle_task_completion(&self, task: &Task) -> bool {
        self.store.update(task.toggled())
    }
}
