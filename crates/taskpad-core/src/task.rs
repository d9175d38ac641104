use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do entry. Values are never edited in place by the store;
/// a changed task is a new value carrying the same `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Milliseconds since the Unix epoch.
    pub due_date: i64,

    #[serde(default)]
    pub is_completed: bool,
}

impl Task {
    /// Builds an open task with a freshly generated id.
    pub fn new(title: String, description: String, due_date: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            due_date,
            is_completed: false,
        }
    }

    /// Copy of this task with the completion flag flipped.
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }

    pub fn is_overdue(&self, now_ms: i64) -> bool {
        !self.is_completed && self.due_date < now_ms
    }
}
