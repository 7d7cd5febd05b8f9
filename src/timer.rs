// src/timer.rs

//! Cancellable timer handles.
//!
//! A timer is a spawned Tokio task that posts an event back into the
//! runtime's mpsc channel. Dropping or cancelling the handle aborts it, so
//! replacing a stored handle is enough to guarantee a single live timer per
//! owner.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Post `event` once after `delay`.
    pub fn after<E>(delay: Duration, tx: mpsc::Sender<E>, event: E) -> Self
    where
        E: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(event).await;
        });
        Self { handle }
    }

    /// Post `make()` every `period`, first time one period from now.
    pub fn every<E, F>(period: Duration, tx: mpsc::Sender<E>, make: F) -> Self
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(make()).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
