// src/channel/supervisor.rs

//! Reconnect lifecycle for one logical push channel.
//!
//! A supervisor owns at most one live socket. Each `open` spawns a Tokio
//! task that connects, forwards decoded messages and lifecycle signals into
//! the runtime's event channel, and reconnects after a fixed delay when the
//! socket dies abnormally while the session is still active.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::transport::{Connector, Frame, Socket, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use crate::engine::{ChannelSignal, SessionEvent};
use crate::protocol::Event;
use crate::types::{ChannelKind, ConnectionState};

/// How long `close` waits for the socket task to say goodbye.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Liveness probe sent once after each successful connect.
pub const PING_TEXT: &str = "ping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    /// Fixed delay before reconnecting; `None` disables reconnects.
    pub reconnect_delay: Option<Duration>,
    /// Delay before the liveness probe; `None` disables it.
    pub ping_after: Option<Duration>,
}

impl ChannelOptions {
    pub fn global(reconnect_delay: Duration, ping_after: Duration) -> Self {
        Self {
            reconnect_delay: Some(reconnect_delay),
            ping_after: Some(ping_after),
        }
    }

    /// The per-task channel neither pings nor reconnects; polling covers it.
    pub fn task_log() -> Self {
        Self::default()
    }
}

struct LiveSocket {
    kind: ChannelKind,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ChannelSupervisor {
    connector: Arc<dyn Connector>,
    options: ChannelOptions,
    events: mpsc::Sender<SessionEvent>,
    session_active: watch::Receiver<bool>,
    state: Arc<watch::Sender<ConnectionState>>,
    live: Option<LiveSocket>,
}

impl std::fmt::Debug for ChannelSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSupervisor")
            .field("options", &self.options)
            .field("state", &*self.state.borrow())
            .field("kind", &self.live.as_ref().map(|l| l.kind))
            .finish_non_exhaustive()
    }
}

impl ChannelSupervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        options: ChannelOptions,
        events: mpsc::Sender<SessionEvent>,
        session_active: watch::Receiver<bool>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            connector,
            options,
            events,
            session_active,
            state: Arc::new(state),
            live: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state transitions (used by tests and diagnostics).
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Channel the live socket belongs to, if any.
    pub fn current(&self) -> Option<ChannelKind> {
        self.live
            .as_ref()
            .filter(|live| !live.handle.is_finished())
            .map(|live| live.kind)
    }

    /// Connect to `url`, replacing any socket this supervisor already owns.
    pub async fn open(&mut self, kind: ChannelKind, url: Url) {
        self.close().await;

        info!(channel = %kind, %url, "opening channel");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = SocketTask {
            kind,
            url,
            connector: Arc::clone(&self.connector),
            options: self.options,
            events: self.events.clone(),
            session_active: self.session_active.clone(),
            state: Arc::clone(&self.state),
        };
        let handle = tokio::spawn(task.run(shutdown_rx));

        self.live = Some(LiveSocket {
            kind,
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Close the live socket normally and cancel any pending reconnect.
    pub async fn close(&mut self) {
        let Some(live) = self.live.take() else {
            return;
        };

        debug!(channel = %live.kind, "closing channel");
        let _ = live.shutdown.send(());
        let mut handle = live.handle;
        if time::timeout(CLOSE_GRACE, &mut handle).await.is_err() {
            warn!(channel = %live.kind, "channel did not close in time; aborting");
            handle.abort();
        }
        self.state.send_replace(ConnectionState::Closed);
    }
}

impl Drop for ChannelSupervisor {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.handle.abort();
        }
    }
}

/// How one connected socket ended.
enum SocketEnd {
    /// Local close requested.
    Shutdown,
    /// Peer closed with 1000.
    Normal,
    Abnormal { code: u16, error: Option<String> },
}

struct SocketTask {
    kind: ChannelKind,
    url: Url,
    connector: Arc<dyn Connector>,
    options: ChannelOptions,
    events: mpsc::Sender<SessionEvent>,
    session_active: watch::Receiver<bool>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl SocketTask {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            self.state.send_replace(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = &mut shutdown => {
                    self.state.send_replace(ConnectionState::Closed);
                    return;
                }
                result = self.connector.connect(&self.url) => result,
            };

            let end = match connected {
                Ok(mut socket) => {
                    self.state.send_replace(ConnectionState::Open);
                    info!(channel = %self.kind, "channel open");
                    let opened = self.signal(ChannelSignal::Opened);
                    if !self.deliver(opened, &mut shutdown).await {
                        let _ = socket.close(NORMAL_CLOSURE).await;
                        self.state.send_replace(ConnectionState::Closed);
                        return;
                    }
                    self.pump(socket.as_mut(), &mut shutdown).await
                }
                Err(err) => {
                    warn!(channel = %self.kind, error = %err, "channel connect failed");
                    SocketEnd::Abnormal {
                        code: ABNORMAL_CLOSURE,
                        error: Some(err.to_string()),
                    }
                }
            };

            match end {
                SocketEnd::Shutdown => {
                    self.state.send_replace(ConnectionState::Closed);
                    return;
                }
                SocketEnd::Normal => {
                    info!(channel = %self.kind, "channel closed normally");
                    self.state.send_replace(ConnectionState::Closed);
                    let closed = self.signal(ChannelSignal::Closed {
                        code: NORMAL_CLOSURE,
                    });
                    self.deliver(closed, &mut shutdown).await;
                    return;
                }
                SocketEnd::Abnormal { code, error } => {
                    if let Some(message) = error {
                        let error = self.signal(ChannelSignal::Error(message));
                        if !self.deliver(error, &mut shutdown).await {
                            return;
                        }
                    }

                    let active = *self.session_active.borrow();
                    if !active {
                        debug!(channel = %self.kind, code, "session inactive; not reconnecting");
                        self.state.send_replace(ConnectionState::Closed);
                        let closed = self.signal(ChannelSignal::Closed { code });
                        self.deliver(closed, &mut shutdown).await;
                        return;
                    }

                    warn!(channel = %self.kind, code, "channel lost");
                    let lost = self.signal(ChannelSignal::Lost { code });
                    if !self.deliver(lost, &mut shutdown).await {
                        return;
                    }

                    let Some(delay) = self.options.reconnect_delay else {
                        self.state.send_replace(ConnectionState::Closed);
                        return;
                    };

                    self.state.send_replace(ConnectionState::Reconnecting);
                    debug!(channel = %self.kind, ?delay, "reconnect scheduled");
                    tokio::select! {
                        _ = &mut shutdown => {
                            self.state.send_replace(ConnectionState::Closed);
                            return;
                        }
                        _ = time::sleep(delay) => {}
                    }

                    if !*self.session_active.borrow() {
                        self.state.send_replace(ConnectionState::Closed);
                        return;
                    }
                }
            }
        }
    }

    /// Forward frames until the socket ends or a local close is requested.
    async fn pump(
        &self,
        socket: &mut dyn Socket,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> SocketEnd {
        let ping = time::sleep(self.options.ping_after.unwrap_or_default());
        tokio::pin!(ping);
        let mut pinged = self.options.ping_after.is_none();

        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    if let Err(err) = socket.close(NORMAL_CLOSURE).await {
                        debug!(channel = %self.kind, error = %err, "close handshake failed");
                    }
                    return SocketEnd::Shutdown;
                }
                _ = &mut ping, if !pinged => {
                    pinged = true;
                    if let Err(err) = socket.send_text(PING_TEXT.to_string()).await {
                        debug!(channel = %self.kind, error = %err, "liveness probe not sent");
                    }
                }
                frame = socket.next_frame() => match frame {
                    Frame::Text(text) => {
                        let Some(event) = self.decode(&text) else {
                            continue;
                        };
                        if !self.deliver(event, shutdown).await {
                            if let Err(err) = socket.close(NORMAL_CLOSURE).await {
                                debug!(channel = %self.kind, error = %err, "close handshake failed");
                            }
                            return SocketEnd::Shutdown;
                        }
                    }
                    Frame::Closed { code } if code == NORMAL_CLOSURE => return SocketEnd::Normal,
                    Frame::Closed { code } => return SocketEnd::Abnormal { code, error: None },
                    Frame::Error(message) => {
                        return SocketEnd::Abnormal {
                            code: ABNORMAL_CLOSURE,
                            error: Some(message),
                        };
                    }
                },
            }
        }
    }

    /// Decode one text frame into the event the runtime expects.
    fn decode(&self, text: &str) -> Option<SessionEvent> {
        let event = match Event::parse(text) {
            Ok(event) => event,
            Err(err) => {
                warn!(channel = %self.kind, error = %err, "dropping malformed message");
                return None;
            }
        };

        Some(match self.kind {
            ChannelKind::Global => SessionEvent::Global(event),
            ChannelKind::TaskLog(task_id) => SessionEvent::TaskLog { task_id, event },
        })
    }

    fn signal(&self, signal: ChannelSignal) -> SessionEvent {
        SessionEvent::ChannelChanged {
            channel: self.kind,
            signal,
        }
    }

    /// Queue `event` for the runtime. A full queue must not hide a local
    /// close, so the send races `shutdown`. Returns `false` when the socket
    /// should stop: close requested or runtime gone.
    async fn deliver(&self, event: SessionEvent, shutdown: &mut oneshot::Receiver<()>) -> bool {
        tokio::select! {
            _ = &mut *shutdown => {
                debug!(channel = %self.kind, "close requested while delivering");
                false
            }
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}
