use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};

use crate::store::TaskStore;
use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

/// In-process store. Clones share the same list, so a test can keep a handle
/// while the board owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Mutex<Vec<Task>>,
    update_calls: Mutex<Vec<(TaskId, TaskStatus)>>,
    reject_updates: AtomicBool,
    reject_fetches: AtomicBool,
}

impl MemoryTaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        let store = Self::default();
        store.replace(tasks);
        store
    }

    pub fn replace(&self, tasks: Vec<Task>) {
        if let Ok(mut guard) = self.inner.tasks.lock() {
            *guard = tasks;
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.inner
            .tasks
            .lock()
            .map(|tasks| tasks.clone())
            .unwrap_or_default()
    }

    /// Every `update_status` call received, accepted or not.
    pub fn update_calls(&self) -> Vec<(TaskId, TaskStatus)> {
        self.inner
            .update_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn reject_updates(&self, reject: bool) {
        self.inner.reject_updates.store(reject, Ordering::Relaxed);
    }

    pub fn reject_fetches(&self, reject: bool) {
        self.inner.reject_fetches.store(reject, Ordering::Relaxed);
    }
}

impl TaskStore for MemoryTaskStore {
    async fn fetch_all(&self, filters: &TaskFilters) -> Result<Vec<Task>> {
        if self.inner.reject_fetches.load(Ordering::Relaxed) {
            bail!("task store unavailable");
        }

        let tasks = self
            .inner
            .tasks
            .lock()
            .map_err(|_| anyhow!("task store lock poisoned"))?;
        Ok(tasks.iter().filter(|t| filters.matches(t)).cloned().collect())
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        if let Ok(mut calls) = self.inner.update_calls.lock() {
            calls.push((id.clone(), status));
        }

        if self.inner.reject_updates.load(Ordering::Relaxed) {
            bail!("task store rejected status change for {id}");
        }

        let mut tasks = self
            .inner
            .tasks
            .lock()
            .map_err(|_| anyhow!("task store lock poisoned"))?;
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| anyhow!("task {id} not found"))?;
        task.status = status;
        Ok(())
    }
}
