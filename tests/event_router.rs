// tests/event_router.rs

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use pinchy_live::engine::{
    ChannelSignal, CoreCommand, CoreOptions, CoreStep, FetchPurpose, LiveCore, PackagePhase,
    SessionEvent, TimerKind,
};
use pinchy_live::types::{ChannelKind, Toast, ToastTone};
use pinchy_live_test_utils::builders::{EventBuilder, SnapshotBuilder};

const NOW: i64 = 1_760_000_000_000;

fn started_core() -> LiveCore {
    init_tracing();
    let mut core = LiveCore::new(CoreOptions::default());
    let step = core.step(SessionEvent::SessionStarted, NOW);
    assert_eq!(
        step.commands,
        vec![CoreCommand::OpenGlobalChannel, CoreCommand::RefreshStats]
    );
    core
}

fn global(core: &mut LiveCore, builder: EventBuilder) -> CoreStep {
    core.step(SessionEvent::Global(builder.build()), NOW)
}

fn toasts(step: &CoreStep) -> Vec<Toast> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Notify(toast) => Some(toast.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn automatic_start_adds_to_running_set_with_info_toast() {
    let mut core = started_core();
    let step = global(&mut core, EventBuilder::task_start(4, "nightly").log_id(1));

    assert!(core.runs().is_running(4));
    assert_eq!(
        toasts(&step),
        vec![Toast::info("Task nightly started automatically")]
    );
}

#[test]
fn manual_start_gets_success_toast() {
    let mut core = started_core();
    let step = core.step(SessionEvent::RunTask { task_id: 4 }, NOW);
    assert_eq!(step.commands, vec![CoreCommand::SubmitRun(4)]);
    assert!(core.runs().is_manual(4));

    let step = global(&mut core, EventBuilder::task_start(4, "nightly").log_id(1));
    assert_eq!(toasts(&step), vec![Toast::success("Task nightly started")]);
}

#[test]
fn duplicate_delivery_runs_effects_once() {
    let mut core = started_core();
    let first = global(&mut core, EventBuilder::task_start(4, "a").log_id(9));
    let second = global(&mut core, EventBuilder::task_start(4, "a").log_id(9));

    assert_eq!(toasts(&first).len(), 1);
    assert!(second.commands.is_empty());
    assert!(second.keep_running);
}

#[test]
fn complete_for_unknown_task_still_toasts() {
    let mut core = started_core();
    let step = global(&mut core, EventBuilder::task_complete(11, "", "success"));

    assert!(!core.runs().is_running(11));
    assert_eq!(toasts(&step), vec![Toast::success("Task #11 succeeded")]);
    assert!(step.commands.contains(&CoreCommand::RefreshStats));
    assert!(
        step.commands
            .contains(&CoreCommand::CancelTimer(TimerKind::ForceStop(11)))
    );
}

#[test]
fn completion_tone_follows_status() {
    let mut core = started_core();
    let stopped = global(&mut core, EventBuilder::task_complete(1, "a", "stopped").log_id(1));
    let failed = global(&mut core, EventBuilder::task_complete(2, "b", "failed").log_id(2));
    let odd = global(&mut core, EventBuilder::task_complete(3, "c", "whatever").log_id(3));

    assert_eq!(toasts(&stopped)[0].tone, ToastTone::Info);
    assert_eq!(toasts(&failed)[0], Toast::error("Task b failed"));
    assert_eq!(toasts(&odd)[0].tone, ToastTone::Error);
}

#[test]
fn completion_clears_both_run_sets() {
    let mut core = started_core();
    core.step(SessionEvent::RunTask { task_id: 6 }, NOW);
    global(&mut core, EventBuilder::task_start(6, "x").log_id(1));
    global(&mut core, EventBuilder::task_error(6, "x", "boom").log_id(1));

    assert!(!core.runs().is_running(6));
    assert!(!core.runs().is_manual(6));
}

#[test]
fn task_error_toasts_the_message() {
    let mut core = started_core();
    let step = global(&mut core, EventBuilder::task_error(6, "x", "exit 137"));
    assert_eq!(toasts(&step), vec![Toast::error("Task x errored: exit 137")]);
}

#[test]
fn completion_of_viewed_task_refreshes_and_schedules_grace() {
    let mut core = started_core();
    core.step(
        SessionEvent::OpenLogView {
            task_id: 2,
            task_name: "b".into(),
        },
        NOW,
    );

    let step = global(&mut core, EventBuilder::task_complete(2, "b", "success").log_id(4));
    assert!(step.commands.contains(&CoreCommand::FetchTaskLog {
        task_id: 2,
        prefer_running: false,
        purpose: FetchPurpose::Refresh,
    }));
    assert!(step.commands.contains(&CoreCommand::Schedule {
        timer: TimerKind::StopPollingGrace,
        delay: Duration::from_secs(1),
    }));
}

#[test]
fn package_install_lifecycle() {
    let mut core = started_core();

    let step = global(
        &mut core,
        EventBuilder::package("install", "start", "python", "requests").field("version", "2.32"),
    );
    assert_eq!(
        step.commands,
        vec![CoreCommand::PackageLine(
            "installing python package requests (version 2.32)".into()
        )]
    );
    assert_eq!(core.package().phase, PackagePhase::Installing);

    let step = global(
        &mut core,
        EventBuilder::package("install", "output", "python", "requests")
            .field("output", "Collecting requests"),
    );
    assert_eq!(
        step.commands,
        vec![CoreCommand::PackageLine("Collecting requests".into())]
    );

    let step = global(
        &mut core,
        EventBuilder::package("install", "complete", "python", "requests").field("success", true),
    );
    assert!(toasts(&step).contains(&Toast::success("Package requests installed")));
    assert!(step.commands.contains(&CoreCommand::Schedule {
        timer: TimerKind::PackageReload,
        delay: Duration::from_secs(1),
    }));
    assert_eq!(core.package().phase, PackagePhase::Success);
    assert_eq!(core.package().log.len(), 3);

    let step = core.step(SessionEvent::TimerFired(TimerKind::PackageReload), NOW);
    assert_eq!(step.commands, vec![CoreCommand::ReloadPackages]);
}

#[test]
fn failed_uninstall_does_not_reload() {
    let mut core = started_core();
    global(&mut core, EventBuilder::package("uninstall", "start", "nodejs", "left-pad"));
    let step = global(
        &mut core,
        EventBuilder::package("uninstall", "complete", "nodejs", "left-pad").field("success", false),
    );

    assert_eq!(
        toasts(&step),
        vec![Toast::error("Package left-pad failed to uninstall")]
    );
    assert!(
        !step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::Schedule { .. }))
    );
    assert_eq!(core.package().phase, PackagePhase::Failed);
}

#[test]
fn repeated_package_output_line_is_collapsed() {
    let mut core = started_core();
    let line = EventBuilder::package("install", "output", "python", "numpy")
        .field("output", "Downloading numpy");
    assert_eq!(global(&mut core, line.clone()).commands.len(), 1);
    assert!(global(&mut core, line).commands.is_empty());
}

#[test]
fn subscription_sync_tracks_set_and_reloads_when_viewed() {
    let mut core = started_core();
    core.step(SessionEvent::SetSubscriptionsView(true), NOW);

    global(&mut core, EventBuilder::subscription_start(3, "feeds").log_id(1));
    assert!(core.is_syncing(3));

    let step = global(
        &mut core,
        EventBuilder::subscription_complete(3, "feeds", "failed")
            .log_id(1)
            .field("message", "timeout"),
    );
    assert!(!core.is_syncing(3));
    assert_eq!(
        toasts(&step),
        vec![Toast::error("Subscription \"feeds\" sync failed: timeout")]
    );
    assert!(step.commands.contains(&CoreCommand::ReloadSubscriptions));
}

#[test]
fn subscription_sync_without_view_only_toasts() {
    let mut core = started_core();
    let step = global(
        &mut core,
        EventBuilder::subscription_complete(3, "feeds", "success").log_id(2),
    );
    assert_eq!(step.commands.len(), 1);
    assert_eq!(toasts(&step), vec![Toast::success("Subscription \"feeds\" synced")]);
}

#[test]
fn unknown_messages_are_ignored() {
    let mut core = started_core();
    let step = global(&mut core, EventBuilder::new("pong"));
    assert!(step.commands.is_empty());
    assert!(core.state().dedup.is_empty());
}

#[test]
fn global_channel_signals() {
    let mut core = started_core();
    let signal = |core: &mut LiveCore, signal| {
        core.step(
            SessionEvent::ChannelChanged {
                channel: ChannelKind::Global,
                signal,
            },
            NOW,
        )
    };

    let step = signal(&mut core, ChannelSignal::Opened);
    assert_eq!(step.commands, vec![CoreCommand::ResyncRunningTasks]);

    let step = signal(&mut core, ChannelSignal::Error("refused".into()));
    assert_eq!(toasts(&step), vec![Toast::error("server connection error")]);

    let step = signal(&mut core, ChannelSignal::Lost { code: 1006 });
    assert_eq!(toasts(&step), vec![Toast::error("connection lost")]);

    let step = signal(&mut core, ChannelSignal::Closed { code: 1000 });
    assert!(step.commands.is_empty());
}

#[test]
fn resync_replaces_running_set() {
    let mut core = started_core();
    global(&mut core, EventBuilder::task_start(1, "a").log_id(1));

    core.step(SessionEvent::RunningTasksSynced(Ok(vec![2, 3])), NOW);
    assert!(!core.runs().is_running(1));
    assert!(core.runs().is_running(2));
    assert_eq!(core.runs().running().collect::<Vec<_>>(), vec![2, 3]);

    // Failures keep what we had.
    core.step(SessionEvent::RunningTasksSynced(Err("502".into())), NOW);
    assert!(core.runs().is_running(3));
}

#[test]
fn run_submission_failure_clears_manual_flag() {
    let mut core = started_core();
    core.step(SessionEvent::RunTask { task_id: 8 }, NOW);
    let step = core.step(
        SessionEvent::RunSubmitted {
            task_id: 8,
            result: Err("Task is already running".into()),
        },
        NOW,
    );

    assert!(!core.runs().is_manual(8));
    assert_eq!(toasts(&step), vec![Toast::error("Task is already running")]);
    assert!(step.keep_running);
}

#[test]
fn stop_escalates_to_force_when_still_running() {
    let mut core = started_core();
    global(&mut core, EventBuilder::task_start(5, "long").log_id(1));

    let step = core.step(SessionEvent::StopTask { task_id: 5 }, NOW);
    assert_eq!(
        step.commands,
        vec![CoreCommand::SubmitStop {
            task_id: 5,
            force: false
        }]
    );

    let step = core.step(
        SessionEvent::StopSubmitted {
            task_id: 5,
            force: false,
            result: Ok(()),
        },
        NOW,
    );
    assert_eq!(toasts(&step), vec![Toast::info("Stopping task #5")]);
    assert!(step.commands.contains(&CoreCommand::Schedule {
        timer: TimerKind::ForceStop(5),
        delay: Duration::from_secs(5),
    }));

    let step = core.step(SessionEvent::TimerFired(TimerKind::ForceStop(5)), NOW);
    assert_eq!(
        step.commands,
        vec![CoreCommand::SubmitStop {
            task_id: 5,
            force: true
        }]
    );
}

#[test]
fn force_stop_is_skipped_once_task_finished() {
    let mut core = started_core();
    global(&mut core, EventBuilder::task_start(5, "long").log_id(1));
    global(&mut core, EventBuilder::task_complete(5, "long", "stopped").log_id(1));

    let step = core.step(SessionEvent::TimerFired(TimerKind::ForceStop(5)), NOW);
    assert!(step.commands.is_empty());
}

#[test]
fn failed_stop_toasts() {
    let mut core = started_core();
    let step = core.step(
        SessionEvent::StopSubmitted {
            task_id: 5,
            force: false,
            result: Err("Task not running".into()),
        },
        NOW,
    );
    assert_eq!(
        toasts(&step),
        vec![Toast::error("Failed to stop task: Task not running")]
    );
}

#[test]
fn stats_are_forwarded_for_display() {
    let mut core = started_core();
    let stats = pinchy_live::protocol::StatsSummary { total: 10, failed: 2 };
    let step = core.step(SessionEvent::StatsFetched(stats), NOW);
    assert_eq!(step.commands, vec![CoreCommand::ShowStats(stats)]);
}

#[test]
fn session_end_tears_everything_down() {
    let mut core = started_core();
    core.step(
        SessionEvent::LogFetched {
            task_id: 1,
            purpose: FetchPurpose::Initial,
            result: Ok(Some(SnapshotBuilder::new(1).build())),
        },
        NOW,
    );

    let step = core.step(SessionEvent::SessionEnded, NOW);
    assert!(!step.keep_running);
    assert!(!core.session_active());
    for expected in [
        CoreCommand::StopPolling,
        CoreCommand::CloseTaskChannel,
        CoreCommand::CloseGlobalChannel,
        CoreCommand::CancelAllTimers,
        CoreCommand::RequestExit,
    ] {
        assert!(step.commands.contains(&expected), "missing {expected:?}");
    }

    // Late lifecycle signals no longer toast.
    let step = core.step(
        SessionEvent::ChannelChanged {
            channel: ChannelKind::Global,
            signal: ChannelSignal::Lost { code: 1006 },
        },
        NOW,
    );
    assert!(step.commands.is_empty());
}
