use serde::Serialize;

use crate::board::columns::{COLUMNS, Column};
use crate::types::{Task, TaskStatus};

/// One rendered lane of the board.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView<'a> {
    pub column: Column,
    pub tasks: Vec<&'a Task>,
}

/// Tasks of one column, pinned first. `sort_by_key` is stable, so the
/// incoming order survives within each group.
pub fn ordered_column(tasks: &[Task], status: TaskStatus) -> Vec<&Task> {
    let mut lane: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
    lane.sort_by_key(|t| !t.pinned);
    lane
}

pub fn column_views(tasks: &[Task]) -> Vec<ColumnView<'_>> {
    COLUMNS
        .iter()
        .map(|column| ColumnView {
            column: *column,
            tasks: ordered_column(tasks, column.id),
        })
        .collect()
}
