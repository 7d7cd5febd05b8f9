// tests/runtime_fake_backend.rs

mod common;
use crate::common::init_tracing;

use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use url::Url;

use pinchy_live::channel::{Endpoints, NORMAL_CLOSURE};
use pinchy_live::engine::{
    CoreOptions, LiveCore, Runtime, RuntimeSettings, SessionEvent, TimerKind,
};
use pinchy_live::protocol::StatsSummary;
use pinchy_live_test_utils::builders::{EventBuilder, SnapshotBuilder};
use pinchy_live_test_utils::fakes::{
    BackendCall, FakeBackend, FakeFailure, RecordingPresenter, ScriptedConnector,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Fixture {
    backend: FakeBackend,
    connector: ScriptedConnector,
    presenter: RecordingPresenter,
}

impl Fixture {
    fn new() -> Self {
        init_tracing();
        Self {
            backend: FakeBackend::new(),
            connector: ScriptedConnector::new(),
            presenter: RecordingPresenter::new(),
        }
    }

    fn runtime(
        &self,
        options: CoreOptions,
    ) -> (Runtime<FakeBackend, RecordingPresenter>, mpsc::Sender<SessionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let base = Url::parse("http://127.0.0.1:8000").unwrap();
        let settings = RuntimeSettings {
            endpoints: Endpoints::from_base(&base).unwrap(),
            poll_interval: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(5),
            ping_delay: Duration::from_millis(100),
        };
        let runtime = Runtime::new(
            LiveCore::new(options),
            tx.clone(),
            rx,
            self.backend.clone(),
            self.connector.clone(),
            self.presenter.clone(),
            settings,
        );
        (runtime, tx)
    }
}

/// Let the runtime make progress until `cond` holds (paused clock).
async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}

#[tokio::test(start_paused = true)]
async fn followed_run_streams_and_exits_after_final_log() -> TestResult {
    let fx = Fixture::new();
    fx.backend.set_running_tasks(vec![7]);
    fx.backend.set_stats(StatsSummary { total: 3, failed: 1 });
    let global = fx.connector.accept("/ws");
    let task = fx.connector.accept("/api/logs/ws/7");

    let (runtime, tx) = fx.runtime(CoreOptions {
        follow_task: Some(7),
        ..CoreOptions::default()
    });
    tx.send(SessionEvent::SessionStarted).await?;
    tx.send(SessionEvent::OpenLogView {
        task_id: 7,
        task_name: String::new(),
    })
    .await?;
    tx.send(SessionEvent::RunTask { task_id: 7 }).await?;

    let driver = async {
        wait_until("task channel connected", || {
            fx.connector.connects_to("/api/logs/ws/7") == 1
        })
        .await;
        task.push_text(EventBuilder::task_output(7, "hello").text());
        task.push_text(EventBuilder::task_output(7, "world").text());
        wait_until("live lines rendered", || {
            fx.presenter
                .last_view()
                .is_some_and(|s| s.stdout == "hello\nworld\n")
        })
        .await;

        fx.backend.set_running_tasks(vec![]);
        fx.backend.set_latest_log(
            SnapshotBuilder::new(7)
                .name("job")
                .stdout("hello\nworld\n")
                .exit_code(0)
                .build(),
        );
        global.push_text(
            EventBuilder::task_complete(7, "job", "success")
                .log_id(1)
                .text(),
        );
    };

    let (result, ()) = tokio::join!(
        time::timeout(Duration::from_secs(60), runtime.run()),
        driver
    );
    result??;

    let recorded = fx.presenter.recorded();
    assert!(fx.backend.calls().contains(&BackendCall::RunTask(7)));
    assert!(fx.presenter.toast_messages().contains(&"Task job succeeded".to_string()));
    assert_eq!(recorded.stats.first(), Some(&StatsSummary { total: 3, failed: 1 }));

    let last = fx.presenter.last_view().expect("final snapshot rendered");
    assert!(!last.is_running());
    assert_eq!(last.exit_code, Some(0));

    assert_eq!(global.closed_with(), Some(NORMAL_CLOSURE));
    assert_eq!(task.closed_with(), Some(NORMAL_CLOSURE));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unauthorized_answer_ends_the_session() -> TestResult {
    let fx = Fixture::new();
    fx.backend.fail_log_fetches(FakeFailure::Unauthorized);
    let _global = fx.connector.accept("/ws");

    let (runtime, tx) = fx.runtime(CoreOptions::default());
    tx.send(SessionEvent::SessionStarted).await?;
    tx.send(SessionEvent::OpenLogView {
        task_id: 3,
        task_name: "job".into(),
    })
    .await?;

    time::timeout(Duration::from_secs(60), runtime.run()).await??;
    assert!(fx.backend.calls().contains(&BackendCall::FetchTaskLogs(
        pinchy_live::backend::LogQuery::latest(3)
    )));

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fx.connector.connects_to("/ws"), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lost_global_channel_reconnects_and_resyncs() -> TestResult {
    let fx = Fixture::new();
    let first = fx.connector.accept("/ws");
    let second = fx.connector.accept("/ws");

    let (runtime, tx) = fx.runtime(CoreOptions::default());
    tx.send(SessionEvent::SessionStarted).await?;

    let driver = async {
        wait_until("first resync", || {
            fx.backend.count(&BackendCall::FetchRunningTasks) == 1
        })
        .await;
        drop(first);
        wait_until("second resync", || {
            fx.backend.count(&BackendCall::FetchRunningTasks) == 2
        })
        .await;
        let _ = tx.send(SessionEvent::ShutdownRequested).await;
    };

    let (result, ()) = tokio::join!(
        time::timeout(Duration::from_secs(60), runtime.run()),
        driver
    );
    result??;

    assert!(fx.presenter.toast_messages().contains(&"connection lost".to_string()));
    assert_eq!(fx.connector.connects_to("/ws"), 2);
    assert_eq!(second.closed_with(), Some(NORMAL_CLOSURE));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_escalates_to_forced_stop() -> TestResult {
    let fx = Fixture::new();
    fx.backend.set_running_tasks(vec![5]);
    let _global = fx.connector.accept("/ws");

    let (runtime, tx) = fx.runtime(CoreOptions::default());
    tx.send(SessionEvent::SessionStarted).await?;

    let driver = async {
        wait_until("running set synced", || {
            fx.backend.count(&BackendCall::FetchRunningTasks) == 1
        })
        .await;
        let _ = tx.send(SessionEvent::StopTask { task_id: 5 }).await;
        wait_until("forced stop", || {
            fx.backend.count(&BackendCall::StopTask {
                task_id: 5,
                force: true,
            }) == 1
        })
        .await;
        let _ = tx.send(SessionEvent::ShutdownRequested).await;
    };

    let (result, ()) = tokio::join!(
        time::timeout(Duration::from_secs(60), runtime.run()),
        driver
    );
    result??;

    assert!(fx.presenter.toast_messages().contains(&"Stopping task #5".to_string()));
    assert_eq!(
        fx.backend.count(&BackendCall::StopTask {
            task_id: 5,
            force: false
        }),
        1
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_run_is_reported() -> TestResult {
    let fx = Fixture::new();
    fx.backend
        .fail_runs(FakeFailure::Rejected("Task is already running".into()));
    let _global = fx.connector.accept("/ws");

    let (runtime, tx) = fx.runtime(CoreOptions {
        follow_task: Some(2),
        ..CoreOptions::default()
    });
    tx.send(SessionEvent::SessionStarted).await?;
    tx.send(SessionEvent::RunTask { task_id: 2 }).await?;

    time::timeout(Duration::from_secs(60), runtime.run()).await??;

    assert!(
        fx.presenter
            .toast_messages()
            .contains(&"Request rejected: Task is already running".to_string())
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn superseded_timer_fire_is_ignored() -> TestResult {
    let fx = Fixture::new();
    let global = fx.connector.accept("/ws");

    let (runtime, tx) = fx.runtime(CoreOptions::default());
    tx.send(SessionEvent::SessionStarted).await?;

    let driver = async {
        wait_until("global channel up", || {
            fx.backend.count(&BackendCall::FetchRunningTasks) == 1
        })
        .await;
        global.push_text(
            EventBuilder::package("install", "complete", "python", "requests")
                .field("success", true)
                .text(),
        );
        wait_until("package reload armed", || {
            !fx.presenter.recorded().package_lines.is_empty()
        })
        .await;

        // A fire left over from an earlier arming of the same kind.
        let _ = tx
            .send(SessionEvent::TimerElapsed {
                timer: TimerKind::PackageReload,
                generation: 0,
            })
            .await;
        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fx.backend.count(&BackendCall::ReloadPackages), 0);

        wait_until("armed reload fired", || {
            fx.backend.count(&BackendCall::ReloadPackages) == 1
        })
        .await;
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.backend.count(&BackendCall::ReloadPackages), 1);
        let _ = tx.send(SessionEvent::ShutdownRequested).await;
    };

    let (result, ()) = tokio::join!(
        time::timeout(Duration::from_secs(60), runtime.run()),
        driver
    );
    result??;
    Ok(())
}
