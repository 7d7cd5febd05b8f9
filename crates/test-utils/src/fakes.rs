#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use url::Url;

use pinchy_live::backend::{Backend, LogQuery};
use pinchy_live::channel::{Connector, Frame, Socket, ABNORMAL_CLOSURE};
use pinchy_live::errors::{LiveError, Result};
use pinchy_live::present::Presenter;
use pinchy_live::protocol::{LogSnapshot, StatsSummary};
use pinchy_live::types::{BoxFuture, RunStatus, TaskId, Toast};

/// One recorded call on [`FakeBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    FetchTaskLogs(LogQuery),
    FetchRunningTasks,
    FetchStats,
    ReloadPackages,
    ReloadSubscriptions,
    RunTask(TaskId),
    StopTask { task_id: TaskId, force: bool },
}

/// Scripted failure; turned into a fresh `LiveError` on each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeFailure {
    Rejected(String),
    Unauthorized,
}

impl FakeFailure {
    fn to_error(&self) -> LiveError {
        match self {
            FakeFailure::Rejected(message) => LiveError::Rejected(message.clone()),
            FakeFailure::Unauthorized => LiveError::Unauthorized,
        }
    }
}

#[derive(Debug, Default)]
struct BackendScript {
    calls: Vec<BackendCall>,
    running_logs: HashMap<TaskId, LogSnapshot>,
    latest_logs: HashMap<TaskId, LogSnapshot>,
    running_tasks: Vec<TaskId>,
    stats: StatsSummary,
    run_failure: Option<FakeFailure>,
    stop_failure: Option<FakeFailure>,
    logs_failure: Option<FakeFailure>,
}

/// In-memory [`Backend`]: answers from a script and records every call.
///
/// Clones share the same script, so a test keeps one handle while the
/// runtime owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<BackendScript>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &BackendCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Answer for `status=running` queries of the snapshot's task.
    pub fn set_running_log(&self, snapshot: LogSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.running_logs.insert(snapshot.task_id, snapshot);
    }

    pub fn clear_running_log(&self, task_id: TaskId) {
        self.inner.lock().unwrap().running_logs.remove(&task_id);
    }

    /// Answer for unfiltered queries of the snapshot's task.
    pub fn set_latest_log(&self, snapshot: LogSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.latest_logs.insert(snapshot.task_id, snapshot);
    }

    pub fn set_running_tasks(&self, tasks: Vec<TaskId>) {
        self.inner.lock().unwrap().running_tasks = tasks;
    }

    pub fn set_stats(&self, stats: StatsSummary) {
        self.inner.lock().unwrap().stats = stats;
    }

    pub fn fail_runs(&self, failure: FakeFailure) {
        self.inner.lock().unwrap().run_failure = Some(failure);
    }

    pub fn fail_stops(&self, failure: FakeFailure) {
        self.inner.lock().unwrap().stop_failure = Some(failure);
    }

    pub fn fail_log_fetches(&self, failure: FakeFailure) {
        self.inner.lock().unwrap().logs_failure = Some(failure);
    }

    fn record(&self, call: BackendCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl Backend for FakeBackend {
    fn fetch_task_logs(&self, query: LogQuery) -> BoxFuture<'_, Result<Vec<LogSnapshot>>> {
        self.record(BackendCall::FetchTaskLogs(query));
        let inner = self.inner.lock().unwrap();
        let result = match &inner.logs_failure {
            Some(failure) => Err(failure.to_error()),
            None => {
                let source = if query.status == Some(RunStatus::Running) {
                    &inner.running_logs
                } else {
                    &inner.latest_logs
                };
                Ok(source.get(&query.task_id).cloned().into_iter().collect())
            }
        };
        Box::pin(async move { result })
    }

    fn fetch_running_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskId>>> {
        self.record(BackendCall::FetchRunningTasks);
        let running = self.inner.lock().unwrap().running_tasks.clone();
        Box::pin(async move { Ok(running) })
    }

    fn fetch_stats(&self) -> BoxFuture<'_, Result<StatsSummary>> {
        self.record(BackendCall::FetchStats);
        let stats = self.inner.lock().unwrap().stats;
        Box::pin(async move { Ok(stats) })
    }

    fn reload_packages(&self) -> BoxFuture<'_, Result<()>> {
        self.record(BackendCall::ReloadPackages);
        Box::pin(async { Ok(()) })
    }

    fn reload_subscriptions(&self) -> BoxFuture<'_, Result<()>> {
        self.record(BackendCall::ReloadSubscriptions);
        Box::pin(async { Ok(()) })
    }

    fn run_task(&self, task_id: TaskId) -> BoxFuture<'_, Result<()>> {
        self.record(BackendCall::RunTask(task_id));
        let failure = self.inner.lock().unwrap().run_failure.clone();
        Box::pin(async move { failure.map_or(Ok(()), |f| Err(f.to_error())) })
    }

    fn stop_task(&self, task_id: TaskId, force: bool) -> BoxFuture<'_, Result<()>> {
        self.record(BackendCall::StopTask { task_id, force });
        let failure = self.inner.lock().unwrap().stop_failure.clone();
        Box::pin(async move { failure.map_or(Ok(()), |f| Err(f.to_error())) })
    }
}

/// Test-side handle of one scripted socket.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    frames: mpsc::UnboundedSender<Frame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

impl SocketHandle {
    /// Deliver a frame to the client. Ignored once the socket is gone.
    pub fn push(&self, frame: Frame) {
        let _ = self.frames.send(frame);
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Frame::Text(text.into()));
    }

    /// Texts the client sent on this socket.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Close code the client used, if it closed the socket.
    pub fn closed_with(&self) -> Option<u16> {
        *self.closed_with.lock().unwrap()
    }
}

/// Socket whose frames are pushed by the test through a [`SocketHandle`].
///
/// Dropping every handle ends the stream like a lost connection.
pub struct ScriptedSocket {
    frames: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

pub fn scripted_socket() -> (ScriptedSocket, SocketHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let closed_with = Arc::new(Mutex::new(None));
    (
        ScriptedSocket {
            frames: rx,
            sent: Arc::clone(&sent),
            closed_with: Arc::clone(&closed_with),
        },
        SocketHandle {
            frames: tx,
            sent,
            closed_with,
        },
    )
}

impl Socket for ScriptedSocket {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<()>> {
        self.sent.lock().unwrap().push(text);
        Box::pin(async { Ok(()) })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Frame> {
        Box::pin(async move {
            self.frames.recv().await.unwrap_or(Frame::Closed {
                code: ABNORMAL_CLOSURE,
            })
        })
    }

    fn close(&mut self, code: u16) -> BoxFuture<'_, Result<()>> {
        *self.closed_with.lock().unwrap() = Some(code);
        self.frames.close();
        Box::pin(async { Ok(()) })
    }
}

enum Attempt {
    Accept(ScriptedSocket),
    Refuse(String),
}

#[derive(Default)]
struct ConnectorScript {
    attempts: HashMap<String, VecDeque<Attempt>>,
    connected: Vec<Url>,
}

/// [`Connector`] that hands out queued sockets per URL path.
///
/// A connect to a path with nothing queued fails with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<Mutex<ConnectorScript>>,
}

impl std::fmt::Debug for ScriptedConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedConnector").finish_non_exhaustive()
    }
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a socket for the next connect to `path` (e.g. `/ws`).
    pub fn accept(&self, path: &str) -> SocketHandle {
        let (socket, handle) = scripted_socket();
        self.push(path, Attempt::Accept(socket));
        handle
    }

    /// Queue a refused connect to `path`.
    pub fn refuse(&self, path: &str, message: &str) {
        self.push(path, Attempt::Refuse(message.to_string()));
    }

    /// Every URL a connect was attempted for, in order.
    pub fn connected(&self) -> Vec<Url> {
        self.inner.lock().unwrap().connected.clone()
    }

    pub fn connects_to(&self, path: &str) -> usize {
        self.connected().iter().filter(|u| u.path() == path).count()
    }

    fn push(&self, path: &str, attempt: Attempt) {
        self.inner
            .lock()
            .unwrap()
            .attempts
            .entry(path.to_string())
            .or_default()
            .push_back(attempt);
    }
}

impl Connector for ScriptedConnector {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Box<dyn Socket>>> {
        let attempt = {
            let mut inner = self.inner.lock().unwrap();
            inner.connected.push(url.clone());
            inner
                .attempts
                .get_mut(url.path())
                .and_then(|queue| queue.pop_front())
        };
        Box::pin(async move {
            match attempt {
                Some(Attempt::Accept(socket)) => Ok(Box::new(socket) as Box<dyn Socket>),
                Some(Attempt::Refuse(message)) => Err(LiveError::Transport(message)),
                None => Err(LiveError::Transport(format!("nothing scripted for {url}"))),
            }
        })
    }
}

/// Everything a [`RecordingPresenter`] was asked to show.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub toasts: Vec<Toast>,
    pub views: Vec<(TaskId, Option<LogSnapshot>)>,
    pub package_lines: Vec<String>,
    pub stats: Vec<StatsSummary>,
}

/// [`Presenter`] that keeps what it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Recorded {
        self.inner.lock().unwrap().clone()
    }

    pub fn toast_messages(&self) -> Vec<String> {
        self.recorded()
            .toasts
            .into_iter()
            .map(|toast| toast.message)
            .collect()
    }

    /// Last snapshot rendered for the open view.
    pub fn last_view(&self) -> Option<LogSnapshot> {
        self.recorded().views.last().and_then(|(_, s)| s.clone())
    }
}

impl Presenter for RecordingPresenter {
    fn toast(&mut self, toast: &Toast) {
        self.inner.lock().unwrap().toasts.push(toast.clone());
    }

    fn log_view(&mut self, task_id: TaskId, snapshot: Option<&LogSnapshot>) {
        self.inner
            .lock()
            .unwrap()
            .views
            .push((task_id, snapshot.cloned()));
    }

    fn package_line(&mut self, line: &str) {
        self.inner.lock().unwrap().package_lines.push(line.to_string());
    }

    fn stats(&mut self, stats: &StatsSummary) {
        self.inner.lock().unwrap().stats.push(*stats);
    }
}
