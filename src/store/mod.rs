//! Task storage collaborators consumed by the board.

mod http;
mod memory;
mod sqlite;

use std::future::Future;

use anyhow::Result;

use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

pub use http::{HttpStoreConfig, HttpTaskStore};
pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// Authoritative task list behind the board.
pub trait TaskStore: Send + Sync + 'static {
    fn fetch_all(&self, filters: &TaskFilters) -> impl Future<Output = Result<Vec<Task>>> + Send;

    fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> impl Future<Output = Result<()>> + Send;
}
