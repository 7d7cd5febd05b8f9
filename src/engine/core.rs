// src/engine/core.rs

//! Pure core session state machine.
//!
//! `LiveCore` consumes [`SessionEvent`]s and produces:
//! - an updated session state (run sets, dedup cache, log view, ...)
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) owns the sockets, timers and
//! REST calls. The core has no Tokio types, does no IO and takes the
//! wall-clock time as an argument, so it can be driven step by step in
//! tests.

use tracing::{debug, info, warn};

use crate::engine::event_handlers::{handle_global_event, CoreCommand, CoreStep};
use crate::engine::state::{PackageOperation, RunState, SessionState};
use crate::engine::view_handlers::{
    attach_live_stream, close_log_view, handle_log_fetched, handle_poll_tick,
    handle_task_channel_signal, handle_task_log_event, handle_view_after_resync, open_log_view,
    request_polling,
};
use crate::engine::{notify, ChannelSignal, CoreOptions, FetchPurpose, SessionEvent, TimerKind};
use crate::logview::LogAggregator;
use crate::types::{ChannelKind, TaskId, Toast};

/// Pure core of one live session.
///
/// This owns the whole [`SessionState`] plus the core options. It has
/// **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct LiveCore {
    state: SessionState,
    options: CoreOptions,
}

impl LiveCore {
    pub fn new(options: CoreOptions) -> Self {
        Self {
            state: SessionState::new(options.dedup_capacity, options.dedup_retain),
            options,
        }
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn runs(&self) -> &RunState {
        &self.state.runs
    }

    pub fn view(&self) -> &LogAggregator {
        &self.state.view
    }

    pub fn package(&self) -> &PackageOperation {
        &self.state.package
    }

    pub fn is_syncing(&self, subscription_id: i64) -> bool {
        self.state.syncing.contains(&subscription_id)
    }

    pub fn is_polling(&self) -> bool {
        self.state.polling.is_active()
    }

    pub fn session_active(&self) -> bool {
        self.state.session_active
    }

    /// Expose the whole state (for tests).
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle a single session event at wall-clock time `now_ms`, updating
    /// core state and returning the resulting commands for the IO shell.
    pub fn step(&mut self, event: SessionEvent, now_ms: i64) -> CoreStep {
        let state = &mut self.state;
        let options = &self.options;

        let commands = match event {
            SessionEvent::SessionStarted => {
                info!("session started");
                state.session_active = true;
                vec![CoreCommand::OpenGlobalChannel, CoreCommand::RefreshStats]
            }
            SessionEvent::Global(event) => handle_global_event(state, options, event, now_ms),
            SessionEvent::TaskLog { task_id, event } => {
                handle_task_log_event(state, options, task_id, event, now_ms)
            }
            SessionEvent::ChannelChanged {
                channel: ChannelKind::Global,
                signal,
            } => handle_global_signal(state, signal),
            SessionEvent::ChannelChanged {
                channel: ChannelKind::TaskLog(task_id),
                signal,
            } => handle_task_channel_signal(state, task_id, signal, now_ms),
            SessionEvent::OpenLogView { task_id, task_name } => {
                open_log_view(state, task_id, task_name)
            }
            SessionEvent::CloseLogView => close_log_view(state),
            SessionEvent::RequestPolling => request_polling(state),
            SessionEvent::RunTask { task_id } => {
                state.runs.mark_manual(task_id);
                vec![CoreCommand::SubmitRun(task_id)]
            }
            SessionEvent::RunSubmitted { task_id, result } => {
                return handle_run_submitted(state, options, task_id, result, now_ms);
            }
            SessionEvent::StopTask { task_id } => vec![CoreCommand::SubmitStop {
                task_id,
                force: false,
            }],
            SessionEvent::StopSubmitted {
                task_id,
                force,
                result,
            } => handle_stop_submitted(options, task_id, force, result),
            SessionEvent::SetSubscriptionsView(active) => {
                state.subscriptions_view = active;
                if active {
                    vec![CoreCommand::ReloadSubscriptions]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::LogFetched {
                task_id,
                purpose,
                result,
            } => {
                let mut commands = Vec::new();
                let finished =
                    handle_log_fetched(state, options, task_id, purpose, result, &mut commands);
                if finished {
                    info!(task_id, "followed run finished");
                    commands.extend(teardown(state));
                    return CoreStep::finish(commands);
                }
                commands
            }
            SessionEvent::RunningTasksSynced(Ok(running)) => {
                debug!(?running, "running tasks resynced");
                let viewed_was_running = state
                    .view
                    .viewed_task()
                    .is_some_and(|task_id| state.runs.is_running(task_id));
                state.runs.resync(running);
                handle_view_after_resync(state, viewed_was_running)
            }
            SessionEvent::RunningTasksSynced(Err(message)) => {
                warn!(%message, "running task resync failed");
                Vec::new()
            }
            SessionEvent::StatsFetched(stats) => vec![CoreCommand::ShowStats(stats)],
            SessionEvent::PollTick { task_id } => handle_poll_tick(state, task_id),
            SessionEvent::TimerFired(timer) | SessionEvent::TimerElapsed { timer, .. } => {
                handle_timer(state, timer)
            }
            SessionEvent::SessionEnded => {
                info!("session ended; tearing down");
                return CoreStep::finish(teardown(state));
            }
            SessionEvent::ShutdownRequested => {
                info!("shutdown requested");
                return CoreStep::finish(teardown(state));
            }
        };

        CoreStep::proceed(commands)
    }
}

fn handle_global_signal(state: &mut SessionState, signal: ChannelSignal) -> Vec<CoreCommand> {
    if !state.session_active {
        return Vec::new();
    }

    match signal {
        // Every (re)connect resyncs, bounding divergence to one cycle.
        ChannelSignal::Opened => vec![CoreCommand::ResyncRunningTasks],
        ChannelSignal::Error(_) => vec![notify(Toast::error("server connection error"))],
        ChannelSignal::Lost { .. } => vec![notify(Toast::error("connection lost"))],
        ChannelSignal::Closed { code } => {
            debug!(code, "global channel closed");
            Vec::new()
        }
    }
}

fn handle_run_submitted(
    state: &mut SessionState,
    options: &CoreOptions,
    task_id: TaskId,
    result: Result<(), String>,
    now_ms: i64,
) -> CoreStep {
    let following = options.follow_task == Some(task_id);

    match result {
        Ok(()) => {
            state.runs.mark_running(task_id);
            if following {
                state.follow_started = true;
                if let Some(id) = state
                    .view
                    .snapshot()
                    .filter(|snapshot| !snapshot.is_running())
                    .and_then(|snapshot| snapshot.id)
                {
                    state.follow_baseline = Some(id);
                }
            }

            let mut commands = Vec::new();
            if state.view.is_viewing(task_id) {
                state.view.begin_live(None, None, now_ms);
                commands.extend(attach_live_stream(state, task_id));
            }
            CoreStep::proceed(commands)
        }
        Err(message) => {
            state.runs.clear_manual(task_id);
            let mut commands = vec![notify(Toast::error(message))];
            if following {
                commands.extend(teardown(state));
                return CoreStep::finish(commands);
            }
            CoreStep::proceed(commands)
        }
    }
}

fn handle_stop_submitted(
    options: &CoreOptions,
    task_id: TaskId,
    force: bool,
    result: Result<(), String>,
) -> Vec<CoreCommand> {
    match (force, result) {
        (false, Ok(())) => vec![
            notify(Toast::info(format!("Stopping task #{task_id}"))),
            CoreCommand::Schedule {
                timer: TimerKind::ForceStop(task_id),
                delay: options.force_stop_after,
            },
        ],
        (false, Err(message)) => {
            vec![notify(Toast::error(format!("Failed to stop task: {message}")))]
        }
        (true, Ok(())) => {
            info!(task_id, "forced stop submitted");
            Vec::new()
        }
        (true, Err(message)) => {
            warn!(task_id, %message, "forced stop failed");
            Vec::new()
        }
    }
}

fn handle_timer(state: &mut SessionState, timer: TimerKind) -> Vec<CoreCommand> {
    match timer {
        TimerKind::StopPollingGrace => {
            if state.polling.stop() {
                vec![CoreCommand::StopPolling]
            } else {
                Vec::new()
            }
        }
        TimerKind::FinalizeLogFetch(task_id) => {
            if !state.view.is_viewing(task_id) {
                return Vec::new();
            }
            vec![CoreCommand::FetchTaskLog {
                task_id,
                prefer_running: state.runs.is_running(task_id),
                purpose: FetchPurpose::Finalize,
            }]
        }
        TimerKind::PackageReload => vec![CoreCommand::ReloadPackages],
        TimerKind::ForceStop(task_id) => {
            if state.runs.is_running(task_id) {
                info!(task_id, "still running after stop request; forcing");
                vec![CoreCommand::SubmitStop {
                    task_id,
                    force: true,
                }]
            } else {
                Vec::new()
            }
        }
    }
}

/// Close both channels, cancel every timer and ask the shell to exit.
fn teardown(state: &mut SessionState) -> Vec<CoreCommand> {
    state.session_active = false;
    state.polling.stop();
    state.task_channel = Default::default();

    vec![
        CoreCommand::StopPolling,
        CoreCommand::CloseTaskChannel,
        CoreCommand::CloseGlobalChannel,
        CoreCommand::CancelAllTimers,
        CoreCommand::RequestExit,
    ]
}
