// src/engine/event_handlers.rs

//! Event router for the global channel.

use std::time::Duration;

use tracing::debug;

use crate::engine::state::{PackageAction, SessionState};
use crate::engine::view_handlers::{attach_live_stream, refresh_view};
use crate::engine::{notify, task_label, CoreOptions, FetchPurpose, TimerKind};
use crate::protocol::{
    Event, PackageFinished, PackageOutput, PackageStarted, StatsSummary, SubscriptionSyncFinished,
    TaskCompleted, TaskFailed, TaskOutputLine, TaskStarted,
};
use crate::types::{RunStatus, TaskId, Toast};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    Notify(Toast),
    OpenGlobalChannel,
    CloseGlobalChannel,
    OpenTaskChannel(TaskId),
    CloseTaskChannel,
    StartPolling(TaskId),
    StopPolling,
    FetchTaskLog {
        task_id: TaskId,
        prefer_running: bool,
        purpose: FetchPurpose,
    },
    /// Arm a one-shot timer, replacing one of the same kind.
    Schedule { timer: TimerKind, delay: Duration },
    CancelTimer(TimerKind),
    CancelAllTimers,
    RefreshStats,
    ShowStats(StatsSummary),
    ReloadPackages,
    ReloadSubscriptions,
    ResyncRunningTasks,
    SubmitRun(TaskId),
    SubmitStop { task_id: TaskId, force: bool },
    PackageLine(String),
    /// Request that the process exits.
    RequestExit,
}

/// Decision returned by the core after handling a single `SessionEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn proceed(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn finish(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Route one global-channel message.
///
/// The dedup cache is consulted first; a hit means the message was already
/// applied and nothing happens.
pub fn handle_global_event(
    state: &mut SessionState,
    options: &CoreOptions,
    event: Event,
    now_ms: i64,
) -> Vec<CoreCommand> {
    if matches!(event, Event::Unknown) {
        debug!("ignoring unrecognised global message");
        return Vec::new();
    }
    if !state.dedup.should_process(&event, now_ms) {
        return Vec::new();
    }

    match event {
        Event::TaskStart(e) => on_task_start(state, e, now_ms),
        Event::TaskOutput(e) => on_task_output(state, e, now_ms),
        Event::TaskComplete(e) => on_task_complete(state, options, e),
        Event::TaskError(e) => on_task_error(state, e),
        Event::PackageInstallStart(e) => on_package_start(state, PackageAction::Install, &e),
        Event::PackageUninstallStart(e) => on_package_start(state, PackageAction::Uninstall, &e),
        Event::PackageInstallOutput(e) | Event::PackageUninstallOutput(e) => {
            on_package_output(state, &e)
        }
        Event::PackageInstallComplete(e) | Event::PackageUninstallComplete(e) => {
            on_package_complete(state, options, &e)
        }
        Event::SubscriptionSyncStart(e) => {
            debug!(subscription = e.subscription_id, name = %e.subscription_name, "subscription sync started");
            state.syncing.insert(e.subscription_id);
            Vec::new()
        }
        Event::SubscriptionSyncComplete(e) => on_subscription_complete(state, e),
        Event::Unknown => Vec::new(),
    }
}

fn on_task_start(state: &mut SessionState, e: TaskStarted, now_ms: i64) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    state.runs.mark_running(e.task_id);

    let label = task_label(&e.task_name, e.task_id);
    let toast = if state.runs.is_manual(e.task_id) {
        Toast::success(format!("Task {label} started"))
    } else {
        Toast::info(format!("Task {label} started automatically"))
    };
    commands.push(notify(toast));

    if state.view.is_viewing(e.task_id) {
        let showing_run = state
            .view
            .snapshot()
            .is_some_and(|snapshot| snapshot.is_running());
        if !showing_run && !state.task_channel.is_open_for(e.task_id) {
            state.view.begin_live(Some(&e.task_name), e.log_id, now_ms);
        }
        commands.extend(attach_live_stream(state, e.task_id));
    }

    commands
}

fn on_task_output(state: &mut SessionState, e: TaskOutputLine, now_ms: i64) -> Vec<CoreCommand> {
    // The per-task channel carries the same lines; it wins when open.
    if state.task_channel.is_open_for(e.task_id) {
        return Vec::new();
    }
    state
        .view
        .push_line(e.task_id, e.log_id, e.output_type, &e.output_line, now_ms);
    Vec::new()
}

fn on_task_complete(
    state: &mut SessionState,
    options: &CoreOptions,
    e: TaskCompleted,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();
    state.runs.mark_finished(e.task_id);

    let label = task_label(&e.task_name, e.task_id);
    let toast = match e.status {
        RunStatus::Success => Toast::success(format!("Task {label} succeeded")),
        RunStatus::Stopped => Toast::info(format!("Task {label} stopped")),
        _ => Toast::error(format!("Task {label} failed")),
    };
    commands.push(notify(toast));
    commands.push(CoreCommand::CancelTimer(TimerKind::ForceStop(e.task_id)));

    if state.view.is_viewing(e.task_id) {
        commands.extend(refresh_view(state, e.task_id, FetchPurpose::Refresh));
        commands.push(CoreCommand::Schedule {
            timer: TimerKind::StopPollingGrace,
            delay: options.completion_grace,
        });
    }

    commands.push(CoreCommand::RefreshStats);
    commands
}

fn on_task_error(state: &mut SessionState, e: TaskFailed) -> Vec<CoreCommand> {
    state.runs.mark_finished(e.task_id);
    let label = task_label(&e.task_name, e.task_id);
    vec![
        notify(Toast::error(format!("Task {label} errored: {}", e.error))),
        CoreCommand::CancelTimer(TimerKind::ForceStop(e.task_id)),
    ]
}

fn on_package_start(
    state: &mut SessionState,
    action: PackageAction,
    e: &PackageStarted,
) -> Vec<CoreCommand> {
    let line = state.package.begin(action, e);
    vec![CoreCommand::PackageLine(line)]
}

fn on_package_output(state: &mut SessionState, e: &PackageOutput) -> Vec<CoreCommand> {
    state
        .package
        .push_output(e)
        .map(CoreCommand::PackageLine)
        .into_iter()
        .collect()
}

fn on_package_complete(
    state: &mut SessionState,
    options: &CoreOptions,
    e: &PackageFinished,
) -> Vec<CoreCommand> {
    if state.package.package_name.is_none() {
        state.package.package_name = e.package_name.clone();
        state.package.package_type = e.package_type.clone();
    }
    let line = state.package.finish(e.success);
    let name = state.package.name().to_string();
    let action = state.package.action;

    let mut commands = vec![CoreCommand::PackageLine(line)];
    let toast = match (action, e.success) {
        (PackageAction::Install, true) => Toast::success(format!("Package {name} installed")),
        (PackageAction::Install, false) => Toast::error(format!("Package {name} failed to install")),
        (PackageAction::Uninstall, true) => Toast::success(format!("Package {name} uninstalled")),
        (PackageAction::Uninstall, false) => {
            Toast::error(format!("Package {name} failed to uninstall"))
        }
    };
    commands.push(notify(toast));

    if e.success {
        commands.push(CoreCommand::Schedule {
            timer: TimerKind::PackageReload,
            delay: options.package_reload_delay,
        });
    }
    commands
}

fn on_subscription_complete(
    state: &mut SessionState,
    e: SubscriptionSyncFinished,
) -> Vec<CoreCommand> {
    state.syncing.remove(&e.subscription_id);

    let toast = if e.status == RunStatus::Success {
        Toast::success(format!("Subscription \"{}\" synced", e.subscription_name))
    } else {
        let mut message = format!("Subscription \"{}\" sync failed", e.subscription_name);
        if let Some(detail) = e.message.as_deref().filter(|m| !m.is_empty()) {
            message.push_str(&format!(": {detail}"));
        }
        Toast::error(message)
    };

    let mut commands = vec![notify(toast)];
    if state.subscriptions_view {
        commands.push(CoreCommand::ReloadSubscriptions);
    }
    commands
}
