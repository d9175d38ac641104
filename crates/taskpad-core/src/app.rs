use std::sync::Arc;

use tracing::info;

use crate::datetime::{Clock, SystemClock};
use crate::form::{CreateForm, EditForm};
use crate::home::HomeView;
use crate::store::TaskStore;

/// Composition root. Owns the single store for the lifetime of the process
/// and hands a shared handle to every controller it builds.
#[derive(Debug, Clone)]
pub struct App {
    store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl App {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_store(TaskStore::new(), clock)
    }

    pub fn with_store(store: TaskStore, clock: Arc<dyn Clock>) -> Self {
        info!(tasks = store.len(), "task store ready");
        Self {
            store: Arc::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn home(&self) -> HomeView {
        HomeView::new(Arc::clone(&self.store))
    }

    pub fn create_form(&self) -> CreateForm {
        CreateForm::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    pub fn edit_form(&self) -> EditForm {
        EditForm::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }
}
