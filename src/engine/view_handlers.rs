// src/engine/view_handlers.rs

//! Task-log view handling: the per-task channel, the polling fallback and
//! pull fetches.
//!
//! Cancellation here is condition-based. Closing or switching the view
//! clears the fields later ticks, signals and fetch results are checked
//! against; anything referring to the old task is then dropped on arrival.

use tracing::{debug, warn};

use crate::engine::event_handlers::CoreCommand;
use crate::engine::state::{SessionState, TaskChannel};
use crate::engine::{notify, ChannelSignal, CoreOptions, FetchPurpose, TimerKind};
use crate::logview::PollDecision;
use crate::protocol::{Event, LogSnapshot};
use crate::types::{TaskId, Toast};

/// Pull the viewed task's log.
pub fn refresh_view(state: &SessionState, task_id: TaskId, purpose: FetchPurpose) -> Vec<CoreCommand> {
    vec![CoreCommand::FetchTaskLog {
        task_id,
        prefer_running: state.runs.is_running(task_id),
        purpose,
    }]
}

/// Make sure the viewed, running task is streamed: open its per-task channel
/// if not already wanted, and poll until that channel reports open.
pub fn attach_live_stream(state: &mut SessionState, task_id: TaskId) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    if !state.task_channel.is_for(task_id) {
        if state.task_channel.task_id.is_some() {
            commands.push(CoreCommand::CloseTaskChannel);
        }
        state.task_channel = TaskChannel {
            task_id: Some(task_id),
            open: false,
        };
        commands.push(CoreCommand::OpenTaskChannel(task_id));
    }

    if !state.task_channel.open && state.polling.start(task_id) {
        commands.push(CoreCommand::StartPolling(task_id));
    }

    commands
}

/// Tear down everything tied to the current view.
fn detach_view(state: &mut SessionState) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    if state.task_channel.task_id.is_some() {
        state.task_channel = TaskChannel::default();
        commands.push(CoreCommand::CloseTaskChannel);
    }
    if state.polling.stop() {
        commands.push(CoreCommand::StopPolling);
    }
    commands.push(CoreCommand::CancelTimer(TimerKind::StopPollingGrace));
    if let Some(previous) = state.view.viewed_task() {
        commands.push(CoreCommand::CancelTimer(TimerKind::FinalizeLogFetch(previous)));
    }

    commands
}

pub fn open_log_view(state: &mut SessionState, task_id: TaskId, task_name: String) -> Vec<CoreCommand> {
    let mut commands = detach_view(state);
    state.view.open(task_id, task_name);

    commands.extend(refresh_view(state, task_id, FetchPurpose::Initial));
    if state.runs.is_running(task_id) {
        commands.extend(attach_live_stream(state, task_id));
    }
    commands
}

pub fn close_log_view(state: &mut SessionState) -> Vec<CoreCommand> {
    let commands = detach_view(state);
    state.view.close();
    commands
}

/// Explicitly start the pull fallback for the open view.
pub fn request_polling(state: &mut SessionState) -> Vec<CoreCommand> {
    let Some(task_id) = state.view.viewed_task() else {
        return Vec::new();
    };

    let mut commands = Vec::new();
    if state.polling.start(task_id) {
        commands.push(CoreCommand::StartPolling(task_id));
    }
    commands.extend(refresh_view(state, task_id, FetchPurpose::Poll));
    commands
}

/// One message from the per-task channel of `task_id`.
pub fn handle_task_log_event(
    state: &mut SessionState,
    options: &CoreOptions,
    task_id: TaskId,
    event: Event,
    now_ms: i64,
) -> Vec<CoreCommand> {
    if !state.task_channel.is_for(task_id) {
        debug!(task_id, "dropping message from a replaced task channel");
        return Vec::new();
    }

    match &event {
        Event::TaskOutput(e) if e.task_id == task_id => {
            state
                .view
                .push_line(task_id, e.log_id, e.output_type, &e.output_line, now_ms);
            Vec::new()
        }
        Event::TaskComplete(_) | Event::TaskError(_) if event.task_id() == Some(task_id) => {
            // Notifications belong to the global channel.
            state.runs.mark_stopped(task_id);
            state.task_channel = TaskChannel::default();
            vec![
                CoreCommand::CloseTaskChannel,
                CoreCommand::Schedule {
                    timer: TimerKind::FinalizeLogFetch(task_id),
                    delay: options.finalize_delay,
                },
            ]
        }
        other => {
            debug!(task_id, kind = other.kind().as_str(), "ignoring task channel message");
            Vec::new()
        }
    }
}

/// Lifecycle signal from the per-task channel of `task_id`.
pub fn handle_task_channel_signal(
    state: &mut SessionState,
    task_id: TaskId,
    signal: ChannelSignal,
    now_ms: i64,
) -> Vec<CoreCommand> {
    if !state.task_channel.is_for(task_id) {
        debug!(task_id, ?signal, "ignoring signal from a replaced task channel");
        return Vec::new();
    }

    match signal {
        ChannelSignal::Opened => {
            state.task_channel.open = true;
            let mut commands = Vec::new();
            if state.view.is_viewing(task_id) {
                let stale = state.view.snapshot().is_none() || state.runs.is_running(task_id);
                if stale {
                    // History is replayed by the server after connect.
                    state.view.begin_live(None, None, now_ms);
                }
            }
            if state.polling.stop() {
                commands.push(CoreCommand::StopPolling);
            }
            commands
        }
        ChannelSignal::Error(message) => {
            debug!(task_id, %message, "task channel error");
            Vec::new()
        }
        ChannelSignal::Lost { code } | ChannelSignal::Closed { code } => {
            debug!(task_id, code, "task channel ended");
            state.task_channel = TaskChannel::default();
            let mut commands = Vec::new();
            if state.view.is_viewing(task_id)
                && state.runs.is_running(task_id)
                && state.polling.start(task_id)
            {
                commands.push(CoreCommand::StartPolling(task_id));
            }
            commands
        }
    }
}

pub fn handle_poll_tick(state: &mut SessionState, task_id: TaskId) -> Vec<CoreCommand> {
    let still_running = state.runs.is_running(task_id);
    let viewed = state.view.viewed_task();

    match state.polling.on_tick(task_id, still_running, viewed) {
        PollDecision::Fetch(task_id) => vec![CoreCommand::FetchTaskLog {
            task_id,
            prefer_running: true,
            purpose: FetchPurpose::Poll,
        }],
        PollDecision::Stop => {
            debug!(task_id, "polling stopped");
            vec![CoreCommand::StopPolling]
        }
        PollDecision::Ignore => Vec::new(),
    }
}

/// Apply a pulled log. Returns `true` when a followed run has now been
/// fully observed.
pub fn handle_log_fetched(
    state: &mut SessionState,
    options: &CoreOptions,
    task_id: TaskId,
    purpose: FetchPurpose,
    result: Result<Option<LogSnapshot>, String>,
    commands: &mut Vec<CoreCommand>,
) -> bool {
    if !state.view.is_viewing(task_id) {
        debug!(task_id, ?purpose, "dropping log fetched for a closed view");
        return false;
    }
    if state.task_channel.is_open_for(task_id)
        && matches!(purpose, FetchPurpose::Initial | FetchPurpose::Poll)
    {
        debug!(task_id, ?purpose, "live stream is authoritative; dropping pulled log");
        return false;
    }

    match result {
        Ok(snapshot) => {
            // An initial pull for the followed task predates our run.
            let previous_run = purpose == FetchPurpose::Initial
                && options.follow_task == Some(task_id)
                && snapshot.as_ref().is_some_and(|s| !s.is_running());
            if previous_run {
                if let Some(id) = snapshot.as_ref().and_then(|s| s.id) {
                    state.follow_baseline.get_or_insert(id);
                }
                if state.follow_started {
                    debug!(task_id, "keeping the live view over the previous run's log");
                    return false;
                }
            }
            state.view.replace(task_id, snapshot);
        }
        Err(message) => {
            if purpose == FetchPurpose::Poll {
                warn!(task_id, %message, "polling fetch failed");
            } else {
                commands.push(notify(Toast::error(format!(
                    "Failed to load task log: {message}"
                ))));
            }
            state.view.replace(task_id, None);
        }
    }

    // Only pulls issued after the run ended can show its final log.
    options.follow_task == Some(task_id)
        && matches!(purpose, FetchPurpose::Refresh | FetchPurpose::Finalize)
        && state.follow_started
        && !state.runs.is_running(task_id)
        && state.view.snapshot().is_some_and(|snapshot| {
            !snapshot.is_running()
                && (state.follow_baseline.is_none() || snapshot.id != state.follow_baseline)
        })
}

/// After a running-set resync, stream the viewed task if it turned out to
/// be running, or re-pull it if the resync says its run is over.
pub fn handle_view_after_resync(
    state: &mut SessionState,
    viewed_was_running: bool,
) -> Vec<CoreCommand> {
    match state.view.viewed_task() {
        Some(task_id) if state.runs.is_running(task_id) => attach_live_stream(state, task_id),
        Some(task_id) if viewed_was_running => {
            debug!(task_id, "viewed task finished unseen; refreshing");
            refresh_view(state, task_id, FetchPurpose::Refresh)
        }
        _ => Vec::new(),
    }
}
