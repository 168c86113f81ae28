use serde::Serialize;

use crate::types::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub id: TaskStatus,
    pub title: &'static str,
    pub color: &'static str,
}

pub const COLUMNS: [Column; 4] = [
    Column {
        id: TaskStatus::Todo,
        title: "To Do",
        color: "#64748b",
    },
    Column {
        id: TaskStatus::InProgress,
        title: "In Progress",
        color: "#3b82f6",
    },
    Column {
        id: TaskStatus::InReview,
        title: "In Review",
        color: "#f59e0b",
    },
    Column {
        id: TaskStatus::Done,
        title: "Done",
        color: "#22c55e",
    },
];

pub fn column(status: TaskStatus) -> &'static Column {
    &COLUMNS[status.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_status_order() {
        let ids: Vec<TaskStatus> = COLUMNS.iter().map(|c| c.id).collect();
        assert_eq!(ids, TaskStatus::ALL.to_vec());
    }

    #[test]
    fn test_column_lookup() {
        for status in TaskStatus::ALL {
            assert_eq!(column(status).id, status);
        }
        assert_eq!(column(TaskStatus::InReview).title, "In Review");
    }
}
