//! Todo view derived from `todos-changed`.

use serde::{Deserialize, Serialize};

use crate::event::{TodoItem, TodoStatus};

/// Two-state todo as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTodo {
    pub id: String,
    pub title: String,
    pub status: QueueTodoStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueTodoStatus {
    Pending,
    Completed,
}

/// Collapse agent todos into the queue view. Cancelled items are dropped.
pub(crate) fn queue_todos(todos: &[TodoItem]) -> Vec<QueueTodo> {
    todos
        .iter()
        .filter_map(|todo| {
            let status = match todo.status {
                TodoStatus::Cancelled => return None,
                TodoStatus::Completed => QueueTodoStatus::Completed,
                TodoStatus::Pending | TodoStatus::InProgress => QueueTodoStatus::Pending,
            };
            Some(QueueTodo {
                id: todo.id.clone(),
                title: todo.content.clone(),
                status,
            })
        })
        .collect()
}
