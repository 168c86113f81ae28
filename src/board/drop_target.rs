//! Classification of pointer-release targets and resolution to a status.

use crate::types::{Task, TaskId, TaskStatus};

/// Namespace prefix carried by a column's scroll container element.
pub const CONTAINER_PREFIX: &str = "column-";

/// What a raw drop-target id refers to on the current board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Column(TaskStatus),
    Task(TaskId),
    Container(TaskStatus),
    Unknown(String),
}

impl DropTarget {
    /// Classifies `raw` against the board. Column ids win over task ids, and
    /// task ids win over the container prefix.
    pub fn classify(raw: &str, tasks: &[Task]) -> Self {
        if let Some(status) = column_id(raw) {
            return DropTarget::Column(status);
        }

        if tasks.iter().any(|t| t.id.as_str() == raw) {
            return DropTarget::Task(TaskId::from(raw));
        }

        if let Some(status) = raw.strip_prefix(CONTAINER_PREFIX).and_then(column_id) {
            return DropTarget::Container(status);
        }

        DropTarget::Unknown(raw.to_string())
    }

    /// Status a drop on this target lands in, if any.
    pub fn status(&self, tasks: &[Task]) -> Option<TaskStatus> {
        match self {
            DropTarget::Column(status) | DropTarget::Container(status) => Some(*status),
            DropTarget::Task(id) => tasks.iter().find(|t| &t.id == id).map(|t| t.status),
            DropTarget::Unknown(_) => None,
        }
    }
}

/// Exact, case-sensitive match on a column id. Free-form parsing is left to
/// `TaskStatus::from_str`; element ids are never normalized.
fn column_id(raw: &str) -> Option<TaskStatus> {
    TaskStatus::ALL.into_iter().find(|s| s.as_str() == raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Move(TaskStatus),
    Unchanged,
    Discard,
}

pub fn resolve(tasks: &[Task], dragged: &TaskId, target: &DropTarget) -> Resolution {
    let Some(task) = tasks.iter().find(|t| &t.id == dragged) else {
        return Resolution::Discard;
    };

    if matches!(target, DropTarget::Task(id) if id == dragged) {
        return Resolution::Unchanged;
    }

    match target.status(tasks) {
        Some(status) if status == task.status => Resolution::Unchanged,
        Some(status) => Resolution::Move(status),
        None => Resolution::Discard,
    }
}
