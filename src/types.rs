// src/types.rs

//! Small shared vocabulary types.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

/// Backend task identifier.
pub type TaskId = i64;

/// Backend execution-log identifier.
pub type LogId = i64;

/// Backend script-subscription identifier.
pub type SubscriptionId = i64;

/// Boxed, sendable future used at the trait seams (backend, transport).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle of one logical socket, owned by a single channel supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Which logical push channel a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Session-wide lifecycle events (`/ws`).
    Global,
    /// Output of one viewed task (`/api/logs/ws/{task_id}`).
    TaskLog(TaskId),
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Global => write!(f, "global"),
            ChannelKind::TaskLog(id) => write!(f, "task-log[{id}]"),
        }
    }
}

/// Which stream an output line was printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Stdout,
    Stderr,
}

/// Status reported by the backend for runs and syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Stopped,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
            RunStatus::Error => "error",
            RunStatus::Unknown => "unknown",
        }
    }
}

/// Colour/severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Success,
    Info,
    Error,
}

/// A transient, non-blocking user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub tone: ToastTone,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            tone: ToastTone::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            tone: ToastTone::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tone: ToastTone::Error,
            message: message.into(),
        }
    }
}
