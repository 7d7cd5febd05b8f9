// src/logview/polling.rs

use crate::types::TaskId;

/// What to do with one polling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Conditions hold; pull the task's log.
    Fetch(TaskId),
    /// A condition failed; the supervisor has stopped itself.
    Stop,
    /// Tick from an interval that was already replaced or stopped.
    Ignore,
}

/// Pure bookkeeping for the pull fallback.
///
/// The runtime owns the actual interval handle; this only records which task
/// the single active interval belongs to and judges each tick.
#[derive(Debug, Default)]
pub struct PollingSupervisor {
    active_for: Option<TaskId>,
}

impl PollingSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a (new) interval must be started for `task_id`.
    pub fn start(&mut self, task_id: TaskId) -> bool {
        if self.active_for == Some(task_id) {
            return false;
        }
        self.active_for = Some(task_id);
        true
    }

    /// Returns `true` if there was an interval to cancel.
    pub fn stop(&mut self) -> bool {
        self.active_for.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active_for.is_some()
    }

    pub fn active_for(&self) -> Option<TaskId> {
        self.active_for
    }

    /// Judge a tick: the task must still be running, the view still open,
    /// and the view still on the same task.
    pub fn on_tick(
        &mut self,
        task_id: TaskId,
        still_running: bool,
        viewed_task: Option<TaskId>,
    ) -> PollDecision {
        if self.active_for != Some(task_id) {
            return PollDecision::Ignore;
        }
        if still_running && viewed_task == Some(task_id) {
            PollDecision::Fetch(task_id)
        } else {
            self.active_for = None;
            PollDecision::Stop
        }
    }
}
