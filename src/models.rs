// Data models for the task list

use serde::{Deserialize, Serialize};

/// Task identifier, minted from the wall clock in milliseconds
pub type TaskId = i64;

/// A single user-entered task
///
/// Only `id`, `text` and `completed` are persisted. The edit fields are
/// view state and come back empty after every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(skip)]
    pub is_editing: bool,
    #[serde(skip)]
    pub edited_text: String,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            is_editing: false,
            edited_text: String::new(),
        }
    }

    /// Compare the persisted fields only
    pub fn same_record(&self, other: &Task) -> bool {
        self.id == other.id && self.text == other.text && self.completed == other.completed
    }
}

/// Mints task ids that never repeat within one store
///
/// Ids follow the wall clock, bumped past the last id seen when two tasks
/// land in the same millisecond or the clock steps backwards.
#[derive(Debug, Default, Clone)]
pub struct IdSource {
    last: TaskId,
}

impl IdSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id that already exists so it is never handed out again
    pub fn observe(&mut self, id: TaskId) {
        if id > self.last {
            self.last = id;
        }
    }

    /// `None` once the last id seen is `i64::MAX`
    pub fn next_id(&mut self) -> Option<TaskId> {
        let id = now_ms().max(self.last.checked_add(1)?);
        self.last = id;
        Some(id)
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
