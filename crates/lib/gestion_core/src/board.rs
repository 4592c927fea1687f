//! Kanban board projection of a project's tasks.

use crate::models::task::{Task, TaskStatus};
use crate::models::{remove_by_id, upsert_by_id};

/// Tasks of one project grouped by status.
///
/// Updates are applied by task id, so server responses can be folded in
/// whatever order they complete.
#[derive(Debug, Clone, Default)]
pub struct Board {
    tasks: Vec<Task>,
}

impl Board {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Tasks in a column, in the order they were received.
    pub fn column(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.status == status)
    }

    /// `(status, count)` for every column in board order.
    pub fn counts(&self) -> Vec<(TaskStatus, usize)> {
        TaskStatus::ALL
            .iter()
            .map(|&status| (status, self.column(status).count()))
            .collect()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Fold in the authoritative copy of a task returned by the server.
    pub fn apply(&mut self, task: Task) {
        upsert_by_id(&mut self.tasks, task);
    }

    pub fn remove(&mut self, id: i64) -> bool {
        remove_by_id(&mut self.tasks, id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
