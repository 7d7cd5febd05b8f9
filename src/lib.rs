// src/lib.rs

pub mod backend;
pub mod channel;
pub mod cli;
pub mod config;
pub mod cron;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod logview;
pub mod present;
pub mod protocol;
pub mod timer;
pub mod types;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tracing::info;

use crate::backend::HttpBackend;
use crate::channel::{Endpoints, WsConnector};
use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{CoreOptions, LiveCore, Runtime, RuntimeSettings, SessionEvent};
use crate::present::TerminalPresenter;
use crate::types::TaskId;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - REST backend and websocket connector
/// - the live core and its runtime
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    if let Command::Cron { expr, at } = &args.command {
        return print_cron_estimate(expr, at.as_deref());
    }

    let cfg = load_or_default(&args.config)?;

    let follow_task = match args.command {
        Command::Run { task_id } => Some(task_id),
        _ => None,
    };
    let core = LiveCore::new(core_options(&cfg, follow_task));
    let settings = runtime_settings(&cfg)?;

    let backend = HttpBackend::new(cfg.server.base_url.clone(), cfg.server.access_token.as_deref())?;
    let connector = WsConnector::new(cfg.server.access_token.clone());

    let (tx, rx) = mpsc::channel::<SessionEvent>(64);

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(SessionEvent::ShutdownRequested).await;
        });
    }

    let seed = initial_events(&args.command);
    info!(base_url = %cfg.server.base_url, events = seed.len(), "starting live session");
    for event in seed {
        tx.send(event).await?;
    }

    let runtime = Runtime::new(
        core,
        tx,
        rx,
        backend,
        connector,
        TerminalPresenter::new(),
        settings,
    );
    runtime.run().await?;
    Ok(())
}

/// Core options derived from the validated config.
pub fn core_options(cfg: &ConfigFile, follow_task: Option<TaskId>) -> CoreOptions {
    CoreOptions {
        completion_grace: cfg.log_view.completion_grace,
        finalize_delay: cfg.log_view.finalize_delay,
        package_reload_delay: cfg.timers.package_reload_delay,
        force_stop_after: cfg.timers.force_stop_after,
        dedup_capacity: cfg.dedup.capacity,
        dedup_retain: cfg.dedup.retain,
        follow_task,
    }
}

/// Runtime settings derived from the validated config.
pub fn runtime_settings(cfg: &ConfigFile) -> crate::errors::Result<RuntimeSettings> {
    Ok(RuntimeSettings {
        endpoints: Endpoints::from_base(&cfg.server.base_url)?,
        poll_interval: cfg.log_view.poll_interval,
        reconnect_delay: cfg.channel.reconnect_delay,
        ping_delay: cfg.channel.ping_delay,
    })
}

/// Events that open a session for the given subcommand.
pub fn initial_events(command: &Command) -> Vec<SessionEvent> {
    let mut events = vec![SessionEvent::SessionStarted];

    match *command {
        Command::Watch {
            task,
            subscriptions,
        } => {
            if let Some(task_id) = task {
                events.push(open_view(task_id));
            }
            if subscriptions {
                events.push(SessionEvent::SetSubscriptionsView(true));
            }
        }
        Command::Run { task_id } => {
            events.push(open_view(task_id));
            events.push(SessionEvent::RunTask { task_id });
        }
        Command::Stop { task_id } => {
            events.push(SessionEvent::StopTask { task_id });
        }
        Command::Cron { .. } => {}
    }

    events
}

fn open_view(task_id: TaskId) -> SessionEvent {
    SessionEvent::OpenLogView {
        task_id,
        task_name: String::new(),
    }
}

fn print_cron_estimate(expr: &str, at: Option<&str>) -> Result<()> {
    let now = match at {
        Some(text) => NaiveDateTime::parse_from_str(text, cron::TIMESTAMP_FORMAT)
            .with_context(|| format!("invalid --at time '{text}'"))?,
        None => Local::now().naive_local(),
    };

    let estimate = cron::estimate(expr, now)?;
    println!("{}", estimate.description);
    match estimate.next {
        Some(next) => println!("next: {}", next.format(cron::TIMESTAMP_FORMAT)),
        None => println!("next: unknown"),
    }
    Ok(())
}
