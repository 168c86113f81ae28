use crate::board::drop_target::DropTarget;
use crate::types::TaskId;

/// Pointer events fed to the board by the presentation layer. Target ids are
/// the raw element ids that received the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start(TaskId),
    Over(String),
    End(String),
    Cancel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        active: TaskId,
        over: Option<DropTarget>,
    },
}

/// Single-pointer drag lifecycle. Holds identity only; task data is never
/// touched here.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn active(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Dragging { active, .. } => Some(active),
            DragState::Idle => None,
        }
    }

    pub fn hovered(&self) -> Option<&DropTarget> {
        match &self.state {
            DragState::Dragging { over, .. } => over.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Begins a session. Returns the id of a stale session that was replaced.
    pub fn start(&mut self, task_id: TaskId) -> Option<TaskId> {
        let previous = self.cancel();
        self.state = DragState::Dragging {
            active: task_id,
            over: None,
        };
        previous
    }

    /// Records the hover target. Ignored while idle.
    pub fn over(&mut self, target: DropTarget) -> bool {
        match &mut self.state {
            DragState::Dragging { over, .. } => {
                *over = Some(target);
                true
            }
            DragState::Idle => false,
        }
    }

    /// Ends the session and hands back the dragged id for resolution.
    pub fn finish(&mut self) -> Option<TaskId> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging { active, .. } => Some(active),
            DragState::Idle => None,
        }
    }

    pub fn cancel(&mut self) -> Option<TaskId> {
        self.finish()
    }
}
