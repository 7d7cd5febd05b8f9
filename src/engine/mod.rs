// src/engine/mod.rs

//! Live session engine.
//!
//! This module ties together:
//! - the event router for the global channel
//! - the task-log view (per-task channel, polling fallback, pull fetches)
//! - run-state, package and subscription bookkeeping
//! - the runtime loop that owns sockets, timers and REST calls
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::dedup::{DEFAULT_CAPACITY, DEFAULT_RETAIN};
use crate::protocol::{Event, LogSnapshot, StatsSummary};
use crate::types::{ChannelKind, TaskId, Toast};

/// Lifecycle signal reported by a channel supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    Opened,
    /// Transport error (connect failure or broken socket).
    Error(String),
    /// Abnormal close while the session is active; a reconnect may follow.
    Lost { code: u16 },
    /// Closed for good (normal close, or abnormal after the session ended).
    Closed { code: u16 },
}

/// Why a task log is being pulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// The view was just opened or explicitly refreshed.
    Initial,
    /// Polling fallback tick.
    Poll,
    /// The global channel reported completion.
    Refresh,
    /// Final pull after the per-task channel reported completion.
    Finalize,
}

/// One-shot timers, at most one live per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    StopPollingGrace,
    FinalizeLogFetch(TaskId),
    PackageReload,
    ForceStop(TaskId),
}

/// Options used by the pure core.
#[derive(Debug, Clone, Copy)]
pub struct CoreOptions {
    pub completion_grace: Duration,
    pub finalize_delay: Duration,
    pub package_reload_delay: Duration,
    pub force_stop_after: Duration,
    pub dedup_capacity: usize,
    pub dedup_retain: usize,
    /// Exit once this task has run and its final log was applied (`run`).
    pub follow_task: Option<TaskId>,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            completion_grace: Duration::from_secs(1),
            finalize_delay: Duration::from_secs(1),
            package_reload_delay: Duration::from_secs(1),
            force_stop_after: Duration::from_secs(5),
            dedup_capacity: DEFAULT_CAPACITY,
            dedup_retain: DEFAULT_RETAIN,
            follow_task: None,
        }
    }
}

/// Events flowing into the runtime from channels, timers, REST calls and
/// the user.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Authenticated session is up; connect and load.
    SessionStarted,
    /// Message from the global channel.
    Global(Event),
    /// Message from the per-task log channel of `task_id`.
    TaskLog { task_id: TaskId, event: Event },
    ChannelChanged {
        channel: ChannelKind,
        signal: ChannelSignal,
    },
    OpenLogView { task_id: TaskId, task_name: String },
    CloseLogView,
    /// Start the pull fallback for the open view.
    RequestPolling,
    RunTask { task_id: TaskId },
    RunSubmitted {
        task_id: TaskId,
        result: Result<(), String>,
    },
    StopTask { task_id: TaskId },
    StopSubmitted {
        task_id: TaskId,
        force: bool,
        result: Result<(), String>,
    },
    SetSubscriptionsView(bool),
    LogFetched {
        task_id: TaskId,
        purpose: FetchPurpose,
        result: Result<Option<LogSnapshot>, String>,
    },
    RunningTasksSynced(Result<Vec<TaskId>, String>),
    StatsFetched(StatsSummary),
    PollTick { task_id: TaskId },
    TimerFired(TimerKind),
    /// Raw fire of an armed one-shot timer. The runtime drops it unless
    /// `generation` is still the armed one, then hands the core a
    /// `TimerFired`.
    TimerElapsed { timer: TimerKind, generation: u64 },
    /// Logout or an unauthorized answer.
    SessionEnded,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod state;
pub mod view_handlers;

pub use self::core::LiveCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Runtime, RuntimeSettings};
pub use state::{PackageAction, PackageOperation, PackagePhase, RunState, SessionState};

/// Helper for toasts naming a task.
pub(crate) fn task_label(name: &str, task_id: TaskId) -> String {
    if name.is_empty() {
        format!("#{task_id}")
    } else {
        name.to_string()
    }
}

pub(crate) fn notify(toast: Toast) -> CoreCommand {
    CoreCommand::Notify(toast)
}
