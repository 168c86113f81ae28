use anyhow::Result;
use tokio::task::{Id, JoinError};
use tracing::{debug, error, warn};

use crate::board::Board;
use crate::board::transition::RemoteEvent;
use crate::notification::Notice;
use crate::store::TaskStore;

impl<S: TaskStore> Board<S> {
    /// Applies every remote result that has already arrived. Never blocks.
    pub fn poll_remote(&mut self) -> usize {
        let mut applied = 0;
        while let Some(joined) = self.remote.try_join_next_with_id() {
            self.apply_joined(joined);
            applied += 1;
        }
        applied
    }

    /// Waits until every dispatched remote update has been applied.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.remote.join_next_with_id().await {
            self.apply_joined(joined);
        }
    }

    /// Replaces local state with a fresh fetch using the board's filters.
    pub async fn refresh(&mut self) -> Result<()> {
        let tasks = self.store.fetch_all(&self.filters).await?;
        self.replace_tasks(tasks);
        self.drop_vanished_drag();
        Ok(())
    }

    /// An update task that ended without a result counts as rejected, with
    /// the board falling back to the last confirmed state.
    fn apply_joined(&mut self, joined: Result<(Id, RemoteEvent), JoinError>) {
        let event = match joined {
            Ok((id, event)) => {
                self.pending.remove(&id);
                event
            }
            Err(join_error) => {
                let Some((task_id, status)) = self.pending.remove(&join_error.id()) else {
                    error!(error = %join_error, "untracked remote update ended");
                    return;
                };
                error!(task_id = %task_id, error = %join_error, "remote update ended unexpectedly");
                RemoteEvent::Rejected {
                    task_id,
                    status,
                    error: "the update ended unexpectedly".to_string(),
                    resync: Err(join_error.to_string()),
                }
            }
        };
        self.apply_remote_event(event);
    }

    pub(crate) fn apply_remote_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Confirmed { task_id, status } => {
                debug!(task_id = %task_id, %status, "status change confirmed");
                // A rejection's resync may have landed while this request
                // was pending; the store now holds `status` either way.
                for list in [&mut self.confirmed, &mut self.tasks] {
                    if let Some(task) = list.iter_mut().find(|t| t.id == task_id) {
                        task.status = status;
                    }
                }
            }
            RemoteEvent::Rejected {
                task_id,
                status,
                error,
                resync,
            } => {
                warn!(task_id = %task_id, %status, error = %error, "status change rejected");

                let title = self
                    .task(&task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| task_id.to_string());

                let message = match resync {
                    Ok(tasks) => {
                        debug!(task_count = tasks.len(), "board resynced after rejection");
                        self.replace_tasks(tasks);
                        format!("Moving \"{title}\" to {status} was not saved: {error}")
                    }
                    Err(resync_error) => {
                        warn!(error = %resync_error, "resync failed; restoring last confirmed board");
                        self.tasks = self.confirmed.clone();
                        format!(
                            "Moving \"{title}\" to {status} was not saved: {error}. \
                             The board could not be refreshed and shows the last saved state."
                        )
                    }
                };

                self.drop_vanished_drag();
                self.notifier.notify(&Notice::new("Task move failed", message));
            }
        }
    }

    fn drop_vanished_drag(&mut self) {
        if let Some(active) = self.drag.active()
            && self.task(active).is_none()
        {
            debug!(task_id = %active, "dragged task vanished; cancelling drag");
            self.drag.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::board::{Board, DragEvent, DropOutcome};
    use crate::notification::MemoryNotifier;
    use crate::store::{MemoryTaskStore, TaskStore};
    use crate::types::{Task, TaskFilters, TaskId, TaskStatus};

    /// Store whose updates panic.
    struct PanickingStore {
        tasks: Vec<Task>,
    }

    impl TaskStore for PanickingStore {
        async fn fetch_all(&self, _filters: &TaskFilters) -> Result<Vec<Task>> {
            Ok(self.tasks.clone())
        }

        async fn update_status(&self, id: &TaskId, _status: TaskStatus) -> Result<()> {
            panic!("update of {id} crashed");
        }
    }

    async fn loaded_board(tasks: Vec<Task>) -> (Board<MemoryTaskStore>, MemoryTaskStore, MemoryNotifier) {
        let store = MemoryTaskStore::new(tasks);
        let notifier = MemoryNotifier::default();
        let mut board = Board::new(store.clone(), notifier.clone());
        board
            .load(TaskFilters::default())
            .await
            .expect("memory store should load");
        (board, store, notifier)
    }

    #[tokio::test]
    async fn test_confirmed_move_keeps_local_state() {
        let (mut board, store, notifier) =
            loaded_board(vec![Task::new("t1", "a", TaskStatus::Todo)]).await;

        board.move_task(&TaskId::from("t1"), TaskStatus::InProgress);
        board.settle().await;

        assert_eq!(board.in_flight(), 0);
        assert_eq!(board.tasks()[0].status, TaskStatus::InProgress);
        assert_eq!(store.snapshot()[0].status, TaskStatus::InProgress);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_falls_back_to_confirmed_snapshot_when_resync_fails() {
        let (mut board, store, notifier) = loaded_board(vec![
            Task::new("t1", "a", TaskStatus::Todo),
            Task::new("t2", "b", TaskStatus::Todo),
        ])
        .await;

        board.move_task(&TaskId::from("t2"), TaskStatus::Done);
        board.settle().await;

        store.reject_updates(true);
        store.reject_fetches(true);
        board.move_task(&TaskId::from("t1"), TaskStatus::InReview);
        board.settle().await;

        assert_eq!(board.task(&TaskId::from("t1")).map(|t| t.status), Some(TaskStatus::Todo));
        assert_eq!(board.task(&TaskId::from("t2")).map(|t| t.status), Some(TaskStatus::Done));

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Task move failed");
        assert!(notices[0].message.contains("last saved state"));
    }

    #[tokio::test]
    async fn test_poll_remote_applies_ready_events() {
        let (mut board, _store, _notifier) =
            loaded_board(vec![Task::new("t1", "a", TaskStatus::Todo)]).await;

        board.move_task(&TaskId::from("t1"), TaskStatus::Done);
        assert_eq!(board.in_flight(), 1);

        let mut applied = 0;
        for _ in 0..100 {
            tokio::task::yield_now().await;
            applied += board.poll_remote();
            if applied > 0 {
                break;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(board.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_resync_cancels_drag_of_deleted_task() {
        let (mut board, store, _notifier) = loaded_board(vec![
            Task::new("t1", "a", TaskStatus::Todo),
            Task::new("t2", "b", TaskStatus::Todo),
        ])
        .await;

        store.reject_updates(true);
        assert_eq!(
            board.move_task(&TaskId::from("t1"), TaskStatus::Done),
            DropOutcome::Moved {
                task_id: TaskId::from("t1"),
                from: TaskStatus::Todo,
                to: TaskStatus::Done,
            }
        );

        board.handle(DragEvent::Start(TaskId::from("t2")));
        store.replace(vec![Task::new("t1", "a", TaskStatus::Todo)]);
        board.settle().await;

        assert!(board.active_task().is_none());
        assert_eq!(board.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_state() {
        let (mut board, store, _notifier) =
            loaded_board(vec![Task::new("t1", "a", TaskStatus::Todo)]).await;

        store.replace(vec![
            Task::new("t1", "a", TaskStatus::Done),
            Task::new("t3", "c", TaskStatus::InReview),
        ]);
        board.refresh().await.expect("refresh should succeed");

        assert_eq!(board.tasks(), store.snapshot().as_slice());
    }

    #[tokio::test]
    async fn test_confirmation_after_stale_resync_shows_saved_status() {
        let (mut board, store, notifier) = loaded_board(vec![
            Task::new("t1", "a", TaskStatus::Todo),
            Task::new("t2", "b", TaskStatus::Todo),
        ])
        .await;

        // t1 was deleted elsewhere, so its move is rejected and resyncs to a
        // list fetched before t2's move lands.
        store.replace(vec![Task::new("t2", "b", TaskStatus::Todo)]);
        board.move_task(&TaskId::from("t1"), TaskStatus::Done);
        board.move_task(&TaskId::from("t2"), TaskStatus::Done);
        board.settle().await;

        assert_eq!(board.task(&TaskId::from("t2")).map(|t| t.status), Some(TaskStatus::Done));
        assert_eq!(board.tasks(), store.snapshot().as_slice());
        assert_eq!(notifier.notices().len(), 1);
    }

    #[test]
    fn test_drop_outside_runtime_uses_captured_handle() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");

        let store = MemoryTaskStore::new(vec![Task::new("t1", "a", TaskStatus::Todo)]);
        let mut board = Board::new(store.clone(), MemoryNotifier::default());
        rt.block_on(board.load(TaskFilters::default()))
            .expect("memory store should load");

        board.handle(DragEvent::Start(TaskId::from("t1")));
        let outcome = board.handle(DragEvent::End("done".to_string()));

        assert!(matches!(outcome, Some(DropOutcome::Moved { .. })));
        assert_eq!(board.task(&TaskId::from("t1")).map(|t| t.status), Some(TaskStatus::Done));
        assert_eq!(board.in_flight(), 1);

        rt.block_on(board.settle());
        assert_eq!(board.in_flight(), 0);
        assert_eq!(store.snapshot()[0].status, TaskStatus::Done);
    }

    #[test]
    fn test_move_without_runtime_is_rolled_back() {
        let store = MemoryTaskStore::new(Vec::new());
        let notifier = MemoryNotifier::default();
        let mut board = Board::new(store.clone(), notifier.clone());
        board.replace_tasks(vec![Task::new("t1", "a", TaskStatus::Todo)]);

        board.move_task(&TaskId::from("t1"), TaskStatus::InReview);

        assert_eq!(board.task(&TaskId::from("t1")).map(|t| t.status), Some(TaskStatus::Todo));
        assert_eq!(board.in_flight(), 0);
        assert!(store.update_calls().is_empty());
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("no async runtime"));
    }

    #[tokio::test]
    async fn test_settle_returns_when_update_task_panics() {
        let tasks = vec![
            Task::new("t1", "a", TaskStatus::Todo),
            Task::new("t2", "b", TaskStatus::InReview),
        ];
        let notifier = MemoryNotifier::default();
        let mut board = Board::new(PanickingStore { tasks: tasks.clone() }, notifier.clone());
        board
            .load(TaskFilters::default())
            .await
            .expect("store should load");

        board.move_task(&TaskId::from("t1"), TaskStatus::Done);
        board.settle().await;

        assert_eq!(board.in_flight(), 0);
        assert_eq!(board.tasks(), tasks.as_slice());
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("ended unexpectedly"));
    }
}
