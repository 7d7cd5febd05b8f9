// src/protocol/snapshot.rs

use serde::{Deserialize, Deserializer};

use crate::types::{LogId, RunStatus, TaskId};

/// Full current state of one execution log, as the REST API returns it.
///
/// Pull fetches replace it wholesale; push lines append to its buffers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogSnapshot {
    #[serde(default)]
    pub id: Option<LogId>,
    pub task_id: TaskId,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(rename = "output", default, deserialize_with = "null_as_empty")]
    pub stdout: String,
    #[serde(rename = "error_output", default, deserialize_with = "null_as_empty")]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

impl LogSnapshot {
    /// An empty snapshot for a run that has started but printed nothing yet.
    pub fn running(
        task_id: TaskId,
        task_name: impl Into<String>,
        log_id: Option<LogId>,
        start_time: Option<String>,
    ) -> Self {
        Self {
            id: log_id,
            task_id,
            task_name: task_name.into(),
            status: RunStatus::Running,
            start_time,
            end_time: None,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `/api/logs/` answers either a paginated envelope or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LogPage {
    Paginated { items: Vec<LogSnapshot> },
    Bare(Vec<LogSnapshot>),
}

impl LogPage {
    pub fn into_items(self) -> Vec<LogSnapshot> {
        match self {
            LogPage::Paginated { items } => items,
            LogPage::Bare(items) => items,
        }
    }
}

/// `/api/tasks/running/status` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RunningTasks {
    #[serde(default)]
    pub running_tasks: Vec<TaskId>,
}

/// `/api/logs/stats/summary` payload (only the fields the dashboard shows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct StatsSummary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub failed: u64,
}
