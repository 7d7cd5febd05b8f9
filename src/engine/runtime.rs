// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::channel::{ChannelOptions, ChannelSupervisor, Connector, Endpoints};
use crate::errors::Result;
use crate::logview::load_task_log;
use crate::present::Presenter;
use crate::timer::TimerHandle;
use crate::types::ChannelKind;

use super::core::LiveCore;
use super::{CoreCommand, SessionEvent, TimerKind};

/// One-shot timer currently armed for a [`TimerKind`].
#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    /// Held for its drop, which aborts the timer task.
    _handle: TimerHandle,
}

/// IO-side settings of a runtime.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub endpoints: Endpoints,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub ping_delay: Duration,
}

/// Drives the live core in response to `SessionEvent`s and carries out the
/// commands it returns: sockets via two channel supervisors, REST calls via
/// a [`Backend`], timers via [`TimerHandle`]s, output via a [`Presenter`].
///
/// Results of asynchronous work are fed back into the same event channel,
/// so all state changes happen one event at a time inside the core.
pub struct Runtime<B: Backend + 'static, P: Presenter> {
    core: LiveCore,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    backend: Arc<B>,
    presenter: P,
    endpoints: Endpoints,
    poll_interval: Duration,
    session_active: watch::Sender<bool>,
    global: ChannelSupervisor,
    task_log: ChannelSupervisor,
    polling: Option<TimerHandle>,
    timers: HashMap<TimerKind, ArmedTimer>,
    timer_generation: u64,
    rendered_revision: u64,
}

impl<B: Backend + 'static, P: Presenter> fmt::Debug for Runtime<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("global", &self.global)
            .field("task_log", &self.task_log)
            .finish_non_exhaustive()
    }
}

impl<B: Backend + 'static, P: Presenter> Runtime<B, P> {
    pub fn new<C: Connector + 'static>(
        core: LiveCore,
        events_tx: mpsc::Sender<SessionEvent>,
        events_rx: mpsc::Receiver<SessionEvent>,
        backend: B,
        connector: C,
        presenter: P,
        settings: RuntimeSettings,
    ) -> Self {
        let connector: Arc<dyn Connector> = Arc::new(connector);
        let (session_active, active_rx) = watch::channel(false);

        let global = ChannelSupervisor::new(
            Arc::clone(&connector),
            ChannelOptions::global(settings.reconnect_delay, settings.ping_delay),
            events_tx.clone(),
            active_rx.clone(),
        );
        let task_log = ChannelSupervisor::new(
            connector,
            ChannelOptions::task_log(),
            events_tx.clone(),
            active_rx,
        );

        Self {
            core,
            events_tx,
            events_rx,
            backend: Arc::new(backend),
            presenter,
            endpoints: settings.endpoints,
            poll_interval: settings.poll_interval,
            session_active,
            global,
            task_log,
            polling: None,
            timers: HashMap::new(),
            timer_generation: 0,
            rendered_revision: 0,
        }
    }

    /// Sender for feeding user intents (open view, run, stop, shutdown).
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Main event loop.
    ///
    /// - Consumes `SessionEvent`s from the event channel.
    /// - Feeds them into the core.
    /// - Executes commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("pinchy-live runtime started");

        loop {
            let Some(event) = self.events_rx.recv().await else {
                info!("session event channel closed; exiting");
                break;
            };

            let event = match event {
                SessionEvent::TimerElapsed { timer, generation } => {
                    if !self.disarm(timer, generation) {
                        debug!(?timer, generation, "ignoring superseded timer");
                        continue;
                    }
                    SessionEvent::TimerFired(timer)
                }
                other => other,
            };
            debug!(?event, "runtime received event");

            let step = self.core.step(event, Utc::now().timestamp_millis());
            self.session_active.send_if_modified(|active| {
                let now = self.core.session_active();
                std::mem::replace(active, now) != now
            });

            for command in step.commands {
                self.execute_command(command).await?;
            }
            self.render_view();

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.release().await;
        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Notify(toast) => self.presenter.toast(&toast),
            CoreCommand::OpenGlobalChannel => {
                let url = self.endpoints.global()?;
                self.global.open(ChannelKind::Global, url).await;
            }
            CoreCommand::CloseGlobalChannel => self.global.close().await,
            CoreCommand::OpenTaskChannel(task_id) => {
                let url = self.endpoints.task_log(task_id)?;
                self.task_log.open(ChannelKind::TaskLog(task_id), url).await;
            }
            CoreCommand::CloseTaskChannel => self.task_log.close().await,
            CoreCommand::StartPolling(task_id) => {
                debug!(task_id, interval = ?self.poll_interval, "polling started");
                self.polling = Some(TimerHandle::every(
                    self.poll_interval,
                    self.events_tx.clone(),
                    move || SessionEvent::PollTick { task_id },
                ));
            }
            CoreCommand::StopPolling => {
                if let Some(handle) = self.polling.take() {
                    handle.cancel();
                }
            }
            CoreCommand::FetchTaskLog {
                task_id,
                prefer_running,
                purpose,
            } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "fetch task log",
                    async move { load_task_log(backend.as_ref(), task_id, prefer_running).await },
                    move |result| {
                        Some(SessionEvent::LogFetched {
                            task_id,
                            purpose,
                            result,
                        })
                    },
                );
            }
            CoreCommand::Schedule { timer, delay } => {
                self.timer_generation += 1;
                let generation = self.timer_generation;
                let handle = TimerHandle::after(
                    delay,
                    self.events_tx.clone(),
                    SessionEvent::TimerElapsed { timer, generation },
                );
                self.timers.insert(
                    timer,
                    ArmedTimer {
                        generation,
                        _handle: handle,
                    },
                );
            }
            CoreCommand::CancelTimer(timer) => {
                self.timers.remove(&timer);
            }
            CoreCommand::CancelAllTimers => {
                self.timers.clear();
                self.polling = None;
            }
            CoreCommand::RefreshStats => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "fetch stats",
                    async move { backend.fetch_stats().await },
                    |result| result.ok().map(SessionEvent::StatsFetched),
                );
            }
            CoreCommand::ShowStats(stats) => self.presenter.stats(&stats),
            CoreCommand::ReloadPackages => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "reload packages",
                    async move { backend.reload_packages().await },
                    |_| None,
                );
            }
            CoreCommand::ReloadSubscriptions => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "reload subscriptions",
                    async move { backend.reload_subscriptions().await },
                    |_| None,
                );
            }
            CoreCommand::ResyncRunningTasks => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "resync running tasks",
                    async move { backend.fetch_running_tasks().await },
                    |result| Some(SessionEvent::RunningTasksSynced(result)),
                );
            }
            CoreCommand::SubmitRun(task_id) => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "run task",
                    async move { backend.run_task(task_id).await },
                    move |result| Some(SessionEvent::RunSubmitted { task_id, result }),
                );
            }
            CoreCommand::SubmitStop { task_id, force } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_request(
                    "stop task",
                    async move { backend.stop_task(task_id, force).await },
                    move |result| {
                        Some(SessionEvent::StopSubmitted {
                            task_id,
                            force,
                            result,
                        })
                    },
                );
            }
            CoreCommand::PackageLine(line) => self.presenter.package_line(&line),
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    /// Forget the armed timer of this kind if `generation` is the armed one.
    fn disarm(&mut self, timer: TimerKind, generation: u64) -> bool {
        match self.timers.get(&timer) {
            Some(armed) if armed.generation == generation => {
                self.timers.remove(&timer);
                true
            }
            _ => false,
        }
    }

    /// Run one REST call off the loop and post its outcome back as an event.
    ///
    /// An unauthorized answer ends the session regardless of the call.
    fn spawn_request<T, Fut, F>(&self, what: &'static str, request: Fut, to_event: F)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        F: FnOnce(std::result::Result<T, String>) -> Option<SessionEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match request.await {
                Ok(value) => to_event(Ok(value)),
                Err(err) if err.ends_session() => {
                    warn!(what, "session no longer authorized");
                    Some(SessionEvent::SessionEnded)
                }
                Err(err) => {
                    warn!(what, error = %err, "request failed");
                    to_event(Err(err.to_string()))
                }
            };
            if let Some(event) = event {
                let _ = tx.send(event).await;
            }
        });
    }

    fn render_view(&mut self) {
        let view = self.core.view();
        if view.revision() == self.rendered_revision {
            return;
        }
        self.rendered_revision = view.revision();
        if let Some(task_id) = view.viewed_task() {
            self.presenter.log_view(task_id, view.snapshot());
        }
    }

    /// Make sure nothing outlives the loop.
    async fn release(&mut self) {
        self.session_active.send_replace(false);
        self.polling = None;
        self.timers.clear();
        self.task_log.close().await;
        self.global.close().await;
    }
}
