//! Kanban board engine: drag lifecycle, drop resolution, optimistic moves and
//! reconciliation with the task store.

pub mod columns;
pub mod drag;
pub mod drop_target;
pub mod ordering;
mod reconcile;
mod transition;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::task::{self, JoinSet};
use tracing::{debug, warn};

use crate::notification::Notifier;
use crate::store::TaskStore;
use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

pub use columns::{COLUMNS, Column, column};
pub use drag::{DragEvent, DragSession, DragState};
pub use drop_target::{CONTAINER_PREFIX, DropTarget, Resolution, resolve};
pub use ordering::{ColumnView, column_views, ordered_column};

use transition::RemoteEvent;

/// Result of a drop or an explicit move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    Unchanged,
    Discarded,
}

/// Owns the local task list. Only the transition and reconciliation paths
/// write to `tasks`.
pub struct Board<S: TaskStore> {
    store: Arc<S>,
    notifier: Box<dyn Notifier + Send>,
    filters: TaskFilters,
    tasks: Vec<Task>,
    confirmed: Vec<Task>,
    drag: DragSession,
    /// Runtime remote updates are spawned on. Captured on construction or on
    /// the first `load`, so drops can be handled from a plain UI thread.
    runtime: Option<Handle>,
    remote: JoinSet<RemoteEvent>,
    pending: HashMap<task::Id, (TaskId, TaskStatus)>,
}

impl<S: TaskStore> Board<S> {
    pub fn new(store: S, notifier: impl Notifier + Send + 'static) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Box::new(notifier),
            filters: TaskFilters::default(),
            tasks: Vec::new(),
            confirmed: Vec::new(),
            drag: DragSession::default(),
            runtime: Handle::try_current().ok(),
            remote: JoinSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Fetches the task list for `filters` and makes it the confirmed state.
    pub async fn load(&mut self, filters: TaskFilters) -> Result<()> {
        if self.runtime.is_none() {
            self.runtime = Handle::try_current().ok();
        }

        let tasks = self.store.fetch_all(&filters).await?;
        debug!(task_count = tasks.len(), ?filters, "board loaded");
        self.filters = filters;
        self.replace_tasks(tasks);
        Ok(())
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn columns(&self) -> Vec<ColumnView<'_>> {
        column_views(&self.tasks)
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    /// Task shown in the drag overlay.
    pub fn active_task(&self) -> Option<&Task> {
        self.drag.active().and_then(|id| self.task(id))
    }

    /// Column under the pointer during a drag, for highlighting.
    pub fn hovered_status(&self) -> Option<TaskStatus> {
        self.drag.hovered().and_then(|target| target.status(&self.tasks))
    }

    /// Number of remote updates not yet applied back to the board.
    pub fn in_flight(&self) -> usize {
        self.remote.len()
    }

    pub fn handle(&mut self, event: DragEvent) -> Option<DropOutcome> {
        match event {
            DragEvent::Start(task_id) => {
                self.drag_start(task_id);
                None
            }
            DragEvent::Over(target) => {
                self.drag_over(&target);
                None
            }
            DragEvent::End(target) => Some(self.drag_end(&target)),
            DragEvent::Cancel => {
                self.drag_cancel();
                None
            }
        }
    }

    pub fn drag_start(&mut self, task_id: TaskId) -> bool {
        if self.task(&task_id).is_none() {
            debug!(task_id = %task_id, "drag start ignored for unknown task");
            return false;
        }

        if let Some(stale) = self.drag.start(task_id.clone()) {
            warn!(stale = %stale, task_id = %task_id, "replaced unfinished drag session");
        }
        true
    }

    pub fn drag_over(&mut self, target: &str) {
        let target = DropTarget::classify(target, &self.tasks);
        self.drag.over(target);
    }

    pub fn drag_end(&mut self, target: &str) -> DropOutcome {
        let Some(dragged) = self.drag.finish() else {
            debug!(drop_target = target, "drop ignored without an active drag");
            return DropOutcome::Discarded;
        };

        let target = DropTarget::classify(target, &self.tasks);
        match resolve(&self.tasks, &dragged, &target) {
            Resolution::Move(status) => self.move_task(&dragged, status),
            Resolution::Unchanged => DropOutcome::Unchanged,
            Resolution::Discard => {
                debug!(task_id = %dragged, ?target, "drop discarded");
                DropOutcome::Discarded
            }
        }
    }

    pub fn drag_cancel(&mut self) {
        if let Some(task_id) = self.drag.cancel() {
            debug!(task_id = %task_id, "drag cancelled");
        }
    }

    fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.confirmed = tasks.clone();
        self.tasks = tasks;
    }
}
