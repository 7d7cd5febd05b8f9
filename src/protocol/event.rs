// src/protocol/event.rs

use serde::Deserialize;

use crate::errors::Result;
use crate::types::{LogId, OutputKind, RunStatus, SubscriptionId, TaskId};

/// A message pushed by the backend over either channel.
///
/// Dispatch is keyed by the JSON `type` field. Anything the client does not
/// recognise (including the server's `pong` reply) decodes as
/// [`Event::Unknown`] and is ignored downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskStart(TaskStarted),
    TaskOutput(TaskOutputLine),
    TaskComplete(TaskCompleted),
    TaskError(TaskFailed),
    PackageInstallStart(PackageStarted),
    PackageInstallOutput(PackageOutput),
    PackageInstallComplete(PackageFinished),
    PackageUninstallStart(PackageStarted),
    PackageUninstallOutput(PackageOutput),
    PackageUninstallComplete(PackageFinished),
    SubscriptionSyncStart(SubscriptionSyncStarted),
    SubscriptionSyncComplete(SubscriptionSyncFinished),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskStarted {
    pub task_id: TaskId,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub log_id: Option<LogId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskOutputLine {
    pub task_id: TaskId,
    #[serde(default)]
    pub log_id: Option<LogId>,
    pub output_line: String,
    pub output_type: OutputKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskCompleted {
    pub task_id: TaskId,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub log_id: Option<LogId>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskFailed {
    pub task_id: TaskId,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub log_id: Option<LogId>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageStarted {
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageOutput {
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageFinished {
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionSyncStarted {
    pub subscription_id: SubscriptionId,
    #[serde(default)]
    pub subscription_name: String,
    #[serde(default)]
    pub log_id: Option<LogId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionSyncFinished {
    pub subscription_id: SubscriptionId,
    #[serde(default)]
    pub subscription_name: String,
    #[serde(default)]
    pub log_id: Option<LogId>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Fieldless mirror of [`Event`] used for logging and key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TaskStart,
    TaskOutput,
    TaskComplete,
    TaskError,
    PackageInstallStart,
    PackageInstallOutput,
    PackageInstallComplete,
    PackageUninstallStart,
    PackageUninstallOutput,
    PackageUninstallComplete,
    SubscriptionSyncStart,
    SubscriptionSyncComplete,
    Unknown,
}

impl EventKind {
    /// The wire `type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskStart => "task_start",
            EventKind::TaskOutput => "task_output",
            EventKind::TaskComplete => "task_complete",
            EventKind::TaskError => "task_error",
            EventKind::PackageInstallStart => "package_install_start",
            EventKind::PackageInstallOutput => "package_install_output",
            EventKind::PackageInstallComplete => "package_install_complete",
            EventKind::PackageUninstallStart => "package_uninstall_start",
            EventKind::PackageUninstallOutput => "package_uninstall_output",
            EventKind::PackageUninstallComplete => "package_uninstall_complete",
            EventKind::SubscriptionSyncStart => "subscription_sync_start",
            EventKind::SubscriptionSyncComplete => "subscription_sync_complete",
            EventKind::Unknown => "unknown",
        }
    }
}

impl Event {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::TaskStart(_) => EventKind::TaskStart,
            Event::TaskOutput(_) => EventKind::TaskOutput,
            Event::TaskComplete(_) => EventKind::TaskComplete,
            Event::TaskError(_) => EventKind::TaskError,
            Event::PackageInstallStart(_) => EventKind::PackageInstallStart,
            Event::PackageInstallOutput(_) => EventKind::PackageInstallOutput,
            Event::PackageInstallComplete(_) => EventKind::PackageInstallComplete,
            Event::PackageUninstallStart(_) => EventKind::PackageUninstallStart,
            Event::PackageUninstallOutput(_) => EventKind::PackageUninstallOutput,
            Event::PackageUninstallComplete(_) => EventKind::PackageUninstallComplete,
            Event::SubscriptionSyncStart(_) => EventKind::SubscriptionSyncStart,
            Event::SubscriptionSyncComplete(_) => EventKind::SubscriptionSyncComplete,
            Event::Unknown => EventKind::Unknown,
        }
    }

    /// Task the event refers to, for task-scoped events.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Event::TaskStart(e) => Some(e.task_id),
            Event::TaskOutput(e) => Some(e.task_id),
            Event::TaskComplete(e) => Some(e.task_id),
            Event::TaskError(e) => Some(e.task_id),
            _ => None,
        }
    }
}
