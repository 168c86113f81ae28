use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::board::{Board, DropOutcome};
use crate::store::TaskStore;
use crate::types::{Task, TaskId, TaskStatus};

/// Outcome of one remote update, produced off the board and applied by
/// `Board::apply_remote_event`.
#[derive(Debug)]
pub(crate) enum RemoteEvent {
    Confirmed {
        task_id: TaskId,
        status: TaskStatus,
    },
    Rejected {
        task_id: TaskId,
        status: TaskStatus,
        error: String,
        resync: Result<Vec<Task>, String>,
    },
}

impl<S: TaskStore> Board<S> {
    /// Applies the status locally, then sends the same change to the store
    /// without waiting for it. Without a runtime the change is rejected and
    /// rolled back immediately.
    pub fn move_task(&mut self, task_id: &TaskId, status: TaskStatus) -> DropOutcome {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == task_id) else {
            debug!(task_id = %task_id, "move ignored for unknown task");
            return DropOutcome::Discarded;
        };

        let from = task.status;
        if from == status {
            return DropOutcome::Unchanged;
        }
        task.status = status;

        info!(task_id = %task_id, %from, to = %status, "task moved");
        self.dispatch_remote_update(task_id.clone(), status);

        DropOutcome::Moved {
            task_id: task_id.clone(),
            from,
            to: status,
        }
    }

    pub fn move_task_left(&mut self, task_id: &TaskId) -> DropOutcome {
        match self.task(task_id).map(|t| t.status.previous()) {
            Some(Some(status)) => self.move_task(task_id, status),
            Some(None) => DropOutcome::Unchanged,
            None => DropOutcome::Discarded,
        }
    }

    pub fn move_task_right(&mut self, task_id: &TaskId) -> DropOutcome {
        match self.task(task_id).map(|t| t.status.next()) {
            Some(Some(status)) => self.move_task(task_id, status),
            Some(None) => DropOutcome::Unchanged,
            None => DropOutcome::Discarded,
        }
    }

    fn dispatch_remote_update(&mut self, task_id: TaskId, status: TaskStatus) {
        let Some(runtime) = self.runtime.clone() else {
            warn!(task_id = %task_id, %status, "no async runtime for remote update");
            self.apply_remote_event(RemoteEvent::Rejected {
                task_id,
                status,
                error: "no async runtime available".to_string(),
                resync: Err("store unreachable".to_string()),
            });
            return;
        };

        let store = Arc::clone(&self.store);
        let filters = self.filters.clone();
        let request_id = task_id.clone();

        let abort = self.remote.spawn_on(
            async move {
                match store.update_status(&task_id, status).await {
                    Ok(()) => RemoteEvent::Confirmed { task_id, status },
                    Err(err) => {
                        let resync = store
                            .fetch_all(&filters)
                            .await
                            .map_err(|err| format!("{err:#}"));
                        RemoteEvent::Rejected {
                            task_id,
                            status,
                            error: format!("{err:#}"),
                            resync,
                        }
                    }
                }
            },
            &runtime,
        );
        self.pending.insert(abort.id(), (request_id, status));
    }
}
