// Task list state with write-through persistence

use crate::filter::Filter;
use crate::kv::KeyValueStore;
use crate::models::{IdSource, Task, TaskId};
use eyre::{Context, Result, eyre};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Storage key for the serialized task list
pub const TASKS_KEY: &str = "todos";

pub const EMPTY_TASK_MESSAGE: &str = "Please enter a task";
pub const EMPTY_EDIT_MESSAGE: &str = "Task cannot be empty. Edit cancelled.";

/// Keys the input fields react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

/// Task totals per filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
}

/// Everything a view needs to render, captured after a change
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub filter: Filter,
    pub visible: Vec<Task>,
    pub input: String,
    pub message: Option<String>,
    pub editing_id: Option<TaskId>,
    pub dragged_id: Option<TaskId>,
    pub hovered_id: Option<TaskId>,
    pub counts: Counts,
}

type Listener = Box<dyn FnMut(&Snapshot)>;

/// Ordered task list plus its view state
///
/// Every change to the tasks notifies subscribers and then rewrites the whole
/// list under [`TASKS_KEY`]. Filter, input and drag state are session-only.
pub struct TodoStore<K: KeyValueStore> {
    kv: K,
    tasks: Vec<Task>,
    filter: Filter,
    input: String,
    message: Option<String>,
    dragged_id: Option<TaskId>,
    hovered_id: Option<TaskId>,
    ids: IdSource,
    listeners: Vec<Listener>,
}

impl<K: KeyValueStore> TodoStore<K> {
    /// Load the task list from `kv`
    ///
    /// A missing value starts an empty list. A value that does not parse is
    /// logged, removed from storage, and also starts an empty list.
    pub fn hydrate(kv: K) -> Self {
        let mut store = Self {
            kv,
            tasks: Vec::new(),
            filter: Filter::default(),
            input: String::new(),
            message: None,
            dragged_id: None,
            hovered_id: None,
            ids: IdSource::new(),
            listeners: Vec::new(),
        };

        let tasks = store.load_tasks();
        for task in &tasks {
            store.ids.observe(task.id);
        }
        store.tasks = tasks;

        info!(count = store.tasks.len(), "Hydrated task list");
        store
    }

    fn load_tasks(&mut self) -> Vec<Task> {
        let stored = match self.kv.get(TASKS_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = ?e, "Failed to read stored tasks, starting empty");
                return Vec::new();
            }
        };

        let parsed: Vec<Task> = match serde_json::from_str(&stored) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "Failed to parse stored tasks, clearing");
                if let Err(e) = self.kv.remove(TASKS_KEY) {
                    warn!(error = ?e, "Failed to clear malformed tasks");
                }
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        parsed
            .into_iter()
            .filter(|task| {
                let fresh = seen.insert(task.id);
                if !fresh {
                    warn!(id = task.id, "Dropping task with duplicate id");
                }
                fresh
            })
            .collect()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn storage(&self) -> &K {
        &self.kv
    }

    pub fn storage_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_storage(self) -> K {
        self.kv
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Current validation message, if the last action was rejected
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn editing_id(&self) -> Option<TaskId> {
        self.tasks.iter().find(|t| t.is_editing).map(|t| t.id)
    }

    pub fn dragged_id(&self) -> Option<TaskId> {
        self.dragged_id
    }

    pub fn hovered_id(&self) -> Option<TaskId> {
        self.hovered_id
    }

    /// Tasks matching `filter`, in list order
    pub fn filtered_view(&self, filter: Filter) -> Vec<&Task> {
        filter.apply(&self.tasks)
    }

    /// Tasks matching the active filter
    pub fn visible(&self) -> Vec<&Task> {
        self.filtered_view(self.filter)
    }

    pub fn counts(&self) -> Counts {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        Counts {
            total: self.tasks.len(),
            completed,
            incomplete: self.tasks.len() - completed,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: self.tasks.clone(),
            filter: self.filter,
            visible: self.visible().into_iter().cloned().collect(),
            input: self.input.clone(),
            message: self.message.clone(),
            editing_id: self.editing_id(),
            dragged_id: self.dragged_id,
            hovered_id: self.hovered_id,
            counts: self.counts(),
        }
    }

    /// Register a callback run with a fresh snapshot after every change
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&Snapshot) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ========================================================================
    // Session state
    // ========================================================================

    pub fn set_filter(&mut self, filter: Filter) {
        if self.filter != filter {
            self.filter = filter;
            self.notify();
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.notify();
    }

    // ========================================================================
    // Task mutations
    // ========================================================================

    /// Append a task with `text`, trimmed
    ///
    /// Blank text sets [`EMPTY_TASK_MESSAGE`] and leaves the list alone.
    /// Returns the new task's id when one was added.
    pub fn add(&mut self, text: &str) -> Result<Option<TaskId>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Rejected empty task");
            self.message = Some(EMPTY_TASK_MESSAGE.to_string());
            self.notify();
            return Ok(None);
        }

        let id = self
            .ids
            .next_id()
            .ok_or_else(|| eyre!("Task id space exhausted"))?;
        let previous = self.tasks.clone();
        self.tasks.push(Task::new(id, text));
        self.message = None;
        self.input.clear();

        debug!(id, "Added task");
        self.commit(previous)?;
        Ok(Some(id))
    }

    /// Submit whatever is in the input buffer
    pub fn submit_input(&mut self) -> Result<Option<TaskId>> {
        let text = self.input.clone();
        self.add(&text)
    }

    /// Returns false when no task has `id`
    pub fn remove(&mut self, id: TaskId) -> Result<bool> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };

        let previous = self.tasks.clone();
        self.tasks.remove(idx);
        if self.dragged_id == Some(id) {
            self.dragged_id = None;
        }
        if self.hovered_id == Some(id) {
            self.hovered_id = None;
        }
        self.message = None;

        debug!(id, "Removed task");
        self.commit(previous)?;
        Ok(true)
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> Result<bool> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };

        let previous = self.tasks.clone();
        let task = &mut self.tasks[idx];
        task.completed = !task.completed;
        self.message = None;

        debug!(id, completed = self.tasks[idx].completed, "Toggled task");
        self.commit(previous)?;
        Ok(true)
    }

    /// Remove every completed task, returning how many went
    pub fn clear_completed(&mut self) -> Result<usize> {
        let previous = self.tasks.clone();
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed == 0 {
            return Ok(0);
        }

        if self.dragged_id.is_some_and(|id| self.index_of(id).is_none()) {
            self.dragged_id = None;
        }
        if self.hovered_id.is_some_and(|id| self.index_of(id).is_none()) {
            self.hovered_id = None;
        }
        self.message = None;

        debug!(removed, "Cleared completed tasks");
        self.commit(previous)?;
        Ok(removed)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Put `id` into edit mode, taking every other task out of it
    pub fn edit_todo(&mut self, id: TaskId) -> Result<bool> {
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };

        let target = &self.tasks[idx];
        let unchanged = target.is_editing
            && target.edited_text == target.text
            && self.tasks.iter().filter(|t| t.is_editing).count() == 1;
        if unchanged {
            return Ok(true);
        }

        let previous = self.tasks.clone();
        for task in &mut self.tasks {
            if task.id == id {
                task.is_editing = true;
                task.edited_text = task.text.clone();
            } else {
                task.is_editing = false;
            }
        }
        self.message = None;

        self.commit(previous)?;
        Ok(true)
    }

    /// Replace the edit buffer of a task that is being edited
    pub fn set_edit_text(&mut self, id: TaskId, text: impl Into<String>) -> Result<bool> {
        let Some(idx) = self.editing_index(id) else {
            return Ok(false);
        };

        let text: String = text.into();
        if self.tasks[idx].edited_text == text {
            return Ok(true);
        }

        let previous = self.tasks.clone();
        self.tasks[idx].edited_text = text;
        self.commit(previous)?;
        Ok(true)
    }

    /// Commit the edit buffer
    ///
    /// A blank buffer reverts the task, sets [`EMPTY_EDIT_MESSAGE`] and
    /// returns false. Tasks not in edit mode are left alone.
    pub fn save_edit(&mut self, id: TaskId) -> Result<bool> {
        let Some(idx) = self.editing_index(id) else {
            return Ok(false);
        };

        let previous = self.tasks.clone();
        let task = &mut self.tasks[idx];
        let trimmed = task.edited_text.trim().to_string();
        task.is_editing = false;

        let saved = if trimmed.is_empty() {
            task.edited_text = task.text.clone();
            self.message = Some(EMPTY_EDIT_MESSAGE.to_string());
            debug!(id, "Rejected empty edit");
            false
        } else {
            task.text = trimmed;
            task.edited_text.clear();
            self.message = None;
            debug!(id, "Saved edit");
            true
        };

        self.commit(previous)?;
        Ok(saved)
    }

    /// Leave edit mode without saving; tasks not in edit mode are left alone
    pub fn cancel_edit(&mut self, id: TaskId) -> Result<bool> {
        let Some(idx) = self.editing_index(id) else {
            return Ok(false);
        };

        let previous = self.tasks.clone();
        let task = &mut self.tasks[idx];
        task.is_editing = false;
        task.edited_text.clear();

        self.commit(previous)?;
        Ok(true)
    }

    /// Key press in the new-task field
    pub fn handle_input_key(&mut self, key: Key) -> Result<Option<TaskId>> {
        match key {
            Key::Enter => self.submit_input(),
            Key::Escape | Key::Other => Ok(None),
        }
    }

    /// Key press in a task's edit field
    pub fn handle_edit_key(&mut self, id: TaskId, key: Key) -> Result<()> {
        match key {
            Key::Enter => {
                self.save_edit(id)?;
            }
            Key::Escape => {
                self.cancel_edit(id)?;
            }
            Key::Other => {}
        }
        Ok(())
    }

    // ========================================================================
    // Reordering
    // ========================================================================

    /// Move `dragged_id` into the slot `target_id` occupies
    ///
    /// Tasks between the two shift by one. Unknown ids and `dragged_id ==
    /// target_id` leave the list untouched and return false.
    pub fn reorder(&mut self, dragged_id: TaskId, target_id: TaskId) -> Result<bool> {
        if dragged_id == target_id {
            return Ok(false);
        }
        let (Some(from), Some(to)) = (self.index_of(dragged_id), self.index_of(target_id)) else {
            return Ok(false);
        };

        let previous = self.tasks.clone();
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.message = None;

        debug!(dragged_id, target_id, from, to, "Reordered task");
        self.commit(previous)?;
        Ok(true)
    }

    /// Begin dragging `id`; refused for unknown or editing tasks
    pub fn drag_start(&mut self, id: TaskId) -> bool {
        if !self.get(id).is_some_and(|t| !t.is_editing) {
            return false;
        }

        self.dragged_id = Some(id);
        self.hovered_id = None;
        self.notify();
        true
    }

    pub fn drag_over(&mut self, id: TaskId) {
        let Some(dragged) = self.dragged_id else {
            return;
        };

        let hovered = if id == dragged { None } else { Some(id) };
        if self.hovered_id != hovered {
            self.hovered_id = hovered;
            self.notify();
        }
    }

    pub fn drag_leave(&mut self) {
        if self.hovered_id.take().is_some() {
            self.notify();
        }
    }

    /// Drop the dragged task onto `target_id` and end the drag
    pub fn drop_on(&mut self, target_id: TaskId) -> Result<bool> {
        let Some(dragged) = self.dragged_id.take() else {
            return Ok(false);
        };
        self.hovered_id = None;

        let moved = self.reorder(dragged, target_id)?;
        if !moved {
            self.notify();
        }
        Ok(moved)
    }

    pub fn drag_end(&mut self) {
        let active = self.dragged_id.is_some() || self.hovered_id.is_some();
        self.dragged_id = None;
        self.hovered_id = None;
        if active {
            self.notify();
        }
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn index_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn editing_index(&self, id: TaskId) -> Option<usize> {
        self.index_of(id).filter(|&idx| self.tasks[idx].is_editing)
    }

    /// Render, then write through
    ///
    /// A failed write puts `previous` back so memory never runs ahead of
    /// storage, and subscribers see the restored list.
    fn commit(&mut self, previous: Vec<Task>) -> Result<()> {
        self.notify();
        if let Err(e) = self.persist() {
            warn!(error = ?e, "Write failed, restoring previous tasks");
            self.tasks = previous;
            self.notify();
            return Err(e);
        }
        Ok(())
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener(&snapshot);
        }
        self.listeners = listeners;
    }

    fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.tasks).context("Failed to serialize tasks")?;
        self.kv.set(TASKS_KEY, &json).context("Failed to persist tasks")?;
        Ok(())
    }
}
