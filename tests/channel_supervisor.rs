// tests/channel_supervisor.rs

mod common;
use crate::common::init_tracing;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant};
use url::Url;

use pinchy_live::channel::{
    ChannelOptions, ChannelSupervisor, Connector, Frame, NORMAL_CLOSURE, PING_TEXT,
};
use pinchy_live::engine::{ChannelSignal, SessionEvent};
use pinchy_live::protocol::Event;
use pinchy_live::types::{ChannelKind, ConnectionState};
use pinchy_live_test_utils::builders::EventBuilder;
use pinchy_live_test_utils::fakes::ScriptedConnector;

const RECONNECT: Duration = Duration::from_secs(5);
const PING: Duration = Duration::from_millis(100);

struct Harness {
    connector: ScriptedConnector,
    supervisor: ChannelSupervisor,
    events: mpsc::Receiver<SessionEvent>,
    session: watch::Sender<bool>,
}

fn harness(options: ChannelOptions) -> Harness {
    harness_with_queue(options, 64)
}

fn harness_with_queue(options: ChannelOptions, queue: usize) -> Harness {
    init_tracing();
    let connector = ScriptedConnector::new();
    let (tx, events) = mpsc::channel(queue);
    let (session, active) = watch::channel(true);
    let shared: Arc<dyn Connector> = Arc::new(connector.clone());
    let supervisor = ChannelSupervisor::new(shared, options, tx, active);
    Harness {
        connector,
        supervisor,
        events,
        session,
    }
}

fn global_url() -> Url {
    Url::parse("ws://127.0.0.1:8000/ws").unwrap()
}

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    time::timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn next_signal(events: &mut mpsc::Receiver<SessionEvent>) -> ChannelSignal {
    match next_event(events).await {
        SessionEvent::ChannelChanged { signal, .. } => signal,
        other => panic!("expected a channel signal, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn forwards_messages_and_pings_once() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    let socket = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);
    assert_eq!(h.supervisor.state(), ConnectionState::Open);

    socket.push_text("{not json");
    socket.push_text(EventBuilder::task_start(1, "a").text());
    match next_event(&mut h.events).await {
        SessionEvent::Global(Event::TaskStart(started)) => assert_eq!(started.task_id, 1),
        other => panic!("unexpected event {other:?}"),
    }

    time::sleep(Duration::from_millis(150)).await;
    assert_eq!(socket.sent(), vec![PING_TEXT.to_string()]);
    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(socket.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn abnormal_close_schedules_exactly_one_reconnect() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    let first = h.connector.accept("/ws");
    let _second = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    let lost_at = Instant::now();
    first.push(Frame::Closed { code: 1011 });
    assert_eq!(
        next_signal(&mut h.events).await,
        ChannelSignal::Lost { code: 1011 }
    );
    assert_eq!(h.supervisor.state(), ConnectionState::Reconnecting);

    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);
    assert!(lost_at.elapsed() >= RECONNECT);

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.connector.connects_to("/ws"), 2);
}

#[tokio::test(start_paused = true)]
async fn normal_close_does_not_reconnect() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    let socket = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    socket.push(Frame::Closed {
        code: NORMAL_CLOSURE,
    });
    assert_eq!(
        next_signal(&mut h.events).await,
        ChannelSignal::Closed {
            code: NORMAL_CLOSURE
        }
    );

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.connector.connects_to("/ws"), 1);
    assert_eq!(h.supervisor.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn no_reconnect_once_session_ended() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    let socket = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    h.session.send_replace(false);
    drop(socket);
    assert_eq!(
        next_signal(&mut h.events).await,
        ChannelSignal::Closed { code: 1006 }
    );

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.connector.connects_to("/ws"), 1);
}

#[tokio::test(start_paused = true)]
async fn refused_connect_reports_error_and_retries() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    h.connector.refuse("/ws", "connection refused");
    let _socket = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert!(matches!(
        next_signal(&mut h.events).await,
        ChannelSignal::Error(message) if message.contains("connection refused")
    ));
    assert_eq!(
        next_signal(&mut h.events).await,
        ChannelSignal::Lost { code: 1006 }
    );
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);
}

#[tokio::test(start_paused = true)]
async fn close_sends_normal_closure() {
    let mut h = harness(ChannelOptions::global(RECONNECT, PING));
    let socket = h.connector.accept("/ws");

    h.supervisor.open(ChannelKind::Global, global_url()).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    h.supervisor.close().await;
    assert_eq!(socket.closed_with(), Some(NORMAL_CLOSURE));
    assert_eq!(h.supervisor.state(), ConnectionState::Closed);
    assert_eq!(h.supervisor.current(), None);
}

#[tokio::test(start_paused = true)]
async fn reopening_replaces_the_previous_socket() {
    let mut h = harness(ChannelOptions::task_log());
    let first = h.connector.accept("/api/logs/ws/1");
    let _second = h.connector.accept("/api/logs/ws/2");

    let url = |id: i64| Url::parse(&format!("ws://127.0.0.1:8000/api/logs/ws/{id}")).unwrap();

    h.supervisor.open(ChannelKind::TaskLog(1), url(1)).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    h.supervisor.open(ChannelKind::TaskLog(2), url(2)).await;
    assert_eq!(first.closed_with(), Some(NORMAL_CLOSURE));
    match next_event(&mut h.events).await {
        SessionEvent::ChannelChanged {
            channel: ChannelKind::TaskLog(2),
            signal: ChannelSignal::Opened,
        } => {}
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(h.supervisor.current(), Some(ChannelKind::TaskLog(2)));
}

#[tokio::test(start_paused = true)]
async fn task_channel_neither_pings_nor_reconnects() {
    let mut h = harness(ChannelOptions::task_log());
    let socket = h.connector.accept("/api/logs/ws/3");
    let url = Url::parse("ws://127.0.0.1:8000/api/logs/ws/3").unwrap();

    h.supervisor.open(ChannelKind::TaskLog(3), url).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    socket.push_text(EventBuilder::task_output(3, "x").text());
    assert!(matches!(
        next_event(&mut h.events).await,
        SessionEvent::TaskLog { task_id: 3, event: Event::TaskOutput(_) }
    ));

    time::sleep(Duration::from_secs(1)).await;
    assert!(socket.sent().is_empty());

    socket.push(Frame::Error("reset by peer".into()));
    assert!(matches!(next_signal(&mut h.events).await, ChannelSignal::Error(_)));
    assert_eq!(
        next_signal(&mut h.events).await,
        ChannelSignal::Lost { code: 1006 }
    );

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.connector.connects_to("/api/logs/ws/3"), 1);
}

#[tokio::test(start_paused = true)]
async fn close_is_not_held_up_by_a_full_event_queue() {
    let mut h = harness_with_queue(ChannelOptions::task_log(), 1);
    let socket = h.connector.accept("/api/logs/ws/4");
    let url = Url::parse("ws://127.0.0.1:8000/api/logs/ws/4").unwrap();

    h.supervisor.open(ChannelKind::TaskLog(4), url).await;
    assert_eq!(next_signal(&mut h.events).await, ChannelSignal::Opened);

    // Replayed history nobody drains yet: the queue fills and the socket
    // task parks on the second line.
    for n in 0..5 {
        socket.push_text(EventBuilder::task_output(4, &format!("line {n}")).text());
    }
    time::sleep(Duration::from_millis(10)).await;

    let started = Instant::now();
    h.supervisor.close().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(socket.closed_with(), Some(NORMAL_CLOSURE));
    assert_eq!(h.supervisor.state(), ConnectionState::Closed);
}
