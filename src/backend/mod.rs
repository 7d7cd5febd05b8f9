// src/backend/mod.rs

//! REST collaborators consumed by the live layer.
//!
//! The runtime talks to a [`Backend`] instead of a concrete HTTP client so
//! tests can swap in a scripted fake. [`HttpBackend`] is the production
//! implementation.

pub mod http;

use crate::errors::Result;
use crate::protocol::{LogSnapshot, StatsSummary};
use crate::types::{BoxFuture, RunStatus, TaskId};

pub use http::HttpBackend;

/// Filter for `/api/logs/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub task_id: TaskId,
    pub status: Option<RunStatus>,
    pub limit: u32,
}

impl LogQuery {
    /// Most recent log of `task_id`, whatever its status.
    pub fn latest(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: None,
            limit: 1,
        }
    }

    /// The log of the run currently in progress, if any.
    pub fn running(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: Some(RunStatus::Running),
            limit: 1,
        }
    }
}

/// Request/response pairs the live layer needs from the server.
///
/// Every method is a single round trip; retries are the caller's business.
pub trait Backend: Send + Sync {
    fn fetch_task_logs(&self, query: LogQuery) -> BoxFuture<'_, Result<Vec<LogSnapshot>>>;

    /// Ids the server currently considers running.
    fn fetch_running_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskId>>>;

    fn fetch_stats(&self) -> BoxFuture<'_, Result<StatsSummary>>;

    /// Refresh the installed-package listings (python and nodejs).
    fn reload_packages(&self) -> BoxFuture<'_, Result<()>>;

    fn reload_subscriptions(&self) -> BoxFuture<'_, Result<()>>;

    fn run_task(&self, task_id: TaskId) -> BoxFuture<'_, Result<()>>;

    fn stop_task(&self, task_id: TaskId, force: bool) -> BoxFuture<'_, Result<()>>;
}
