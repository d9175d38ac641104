use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::is_blank;
use crate::datetime::Clock;
use crate::observe::{Observable, Subscription};
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDraft {
    /// The task as it was when loaded. `None` until a load succeeds.
    pub loaded: Option<Task>,
    pub title: String,
    pub description: String,
    pub due_date: Option<i64>,
    pub is_completed: bool,
    pub can_save: bool,
}

impl EditDraft {
    fn recompute(&mut self) {
        self.can_save = self.loaded.is_some() && !is_blank(&self.title);
    }
}

/// Controller behind the "edit task" screen.
#[derive(Debug)]
pub struct EditForm {
    store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
    draft: Observable<EditDraft>,
}

impl EditForm {
    pub fn new(store: Arc<TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            draft: Observable::default(),
        }
    }

    pub fn draft(&self) -> EditDraft {
        self.draft.get()
    }

    pub fn can_save(&self) -> bool {
        self.draft.get().can_save
    }

    pub fn is_loaded(&self) -> bool {
        self.draft.get().loaded.is_some()
    }

    pub fn watch(&self) -> Subscription<EditDraft> {
        self.draft.subscribe()
    }

    /// Populates the draft from the stored task with this id.
    ///
    /// An unknown id leaves the draft as it is; the return value only says
    /// whether anything was found.
    #[instrument(skip(self))]
    pub fn load(&self, id: &str) -> bool {
        let Some(task) = self.store.get_by_id(id) else {
            debug!("task not found; form stays unloaded");
            return false;
        };

        self.edit(|d| {
            d.title = task.title.clone();
            d.description = task.description.clone();
            d.due_date = Some(task.due_date);
            d.is_completed = task.is_completed;
            d.loaded = Some(task);
        });
        true
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|d| d.title = title);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.edit(|d| d.description = description);
    }

    pub fn set_due_date(&self, due_date: i64) {
        self.edit(|d| d.due_date = Some(due_date));
    }

    /// Flips the drafted completion flag. Nothing is stored until submit.
    pub fn toggle_completion(&self) {
        self.edit(|d| d.is_completed = !d.is_completed);
    }

    /// Writes the draft over the loaded task, keeping its id.
    #[instrument(skip(self))]
    pub fn submit(&self) -> bool {
        let draft = self.draft.get();
        let Some(loaded) = draft.loaded else {
            debug!("no task loaded; refusing to save");
            return false;
        };
        if is_blank(&draft.title) {
            debug!(task_id = %loaded.id, "blank title; refusing to save");
            return false;
        }

        let updated = Task {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            due_date: draft
                .due_date
                .unwrap_or_else(|| self.clock.now_millis()),
            is_completed: draft.is_completed,
            ..loaded
        };
        info!(task_id = %updated.id, "saving edited task");
        self.store.update(updated);
        true
    }

    fn edit<F>(&self, f: F)
    where
        F: FnOnce(&mut EditDraft),
    {
        self.draft.update(|current| {
            let mut next = current.clone();
            f(&mut next);
            next.recompute();
            Some(next)
        });
    }
}
