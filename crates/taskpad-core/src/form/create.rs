use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::is_blank;
use crate::datetime::Clock;
use crate::observe::{Observable, Subscription};
use crate::store::TaskStore;
use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<i64>,
    pub can_save: bool,
}

impl CreateDraft {
    fn recompute(&mut self) {
        self.can_save = !is_blank(&self.title);
    }
}

/// Controller behind the "new task" screen.
#[derive(Debug)]
pub struct CreateForm {
    store: Arc<TaskStore>,
    clock: Arc<dyn Clock>,
    draft: Observable<CreateDraft>,
}

impl CreateForm {
    pub fn new(store: Arc<TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            draft: Observable::default(),
        }
    }

    pub fn draft(&self) -> CreateDraft {
        self.draft.get()
    }

    pub fn can_save(&self) -> bool {
        self.draft.get().can_save
    }

    pub fn watch(&self) -> Subscription<CreateDraft> {
        self.draft.subscribe()
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

    /// Adds the drafted task to the store and clears the form.
    /// A blank title refuses the save and leaves everything untouched.
    #[instrument(skip(self))]
    pub fn submit(&self) -> bool {
        let draft = self.draft.get();
        if is_blank(&draft.title) {
            debug!("blank title; refusing to save");
            return false;
        }

        let due_date = draft
            .due_date
            .unwrap_or_else(|| self.clock.now_millis());
        let task = Task::new(
            draft.title.trim().to_string(),
            draft.description.trim().to_string(),
            due_date,
        );
        info!(task_id = %task.id, "creating task");
        self.store.add(task);

        self.draft.set(CreateDraft::default());
        true
    }

    fn edit<F>(&self, f: F)
    where
        F: FnOnce(&mut CreateDraft),
    {
        self.draft.update(|current| {
            let mut next = current.clone();
            f(&mut next);
            next.recompute();
            Some(next)
        });
    }
}
