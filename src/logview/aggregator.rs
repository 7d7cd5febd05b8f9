// src/logview/aggregator.rs

use chrono::{DateTime, SecondsFormat};

use crate::protocol::LogSnapshot;
use crate::types::{LogId, OutputKind, TaskId};

/// Shown in stdout while a running log has produced nothing yet.
pub const WAITING_FOR_OUTPUT: &str = "Task is running, waiting for output...";

/// Reconciles push lines and pull snapshots for the single open log view.
///
/// Pull results always replace the snapshot wholesale; push lines append.
/// The first stdout line after the placeholder replaces the placeholder.
#[derive(Debug, Default)]
pub struct LogAggregator {
    task_id: Option<TaskId>,
    task_name: String,
    snapshot: Option<LogSnapshot>,
    revision: u64,
}

impl LogAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the view at `task_id`, dropping whatever was shown before.
    pub fn open(&mut self, task_id: TaskId, task_name: impl Into<String>) {
        self.task_id = Some(task_id);
        self.task_name = task_name.into();
        self.snapshot = None;
        self.bump();
    }

    pub fn close(&mut self) {
        self.task_id = None;
        self.task_name.clear();
        self.snapshot = None;
        self.bump();
    }

    pub fn viewed_task(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn is_viewing(&self, task_id: TaskId) -> bool {
        self.task_id == Some(task_id)
    }

    pub fn snapshot(&self) -> Option<&LogSnapshot> {
        self.snapshot.as_ref()
    }

    /// Incremented on every visible change; presenters redraw on change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Reset to an empty running snapshot (run started or live stream
    /// attached). The server replays history after a stream connects, so
    /// anything shown before is discarded.
    pub fn begin_live(&mut self, task_name: Option<&str>, log_id: Option<LogId>, now_ms: i64) {
        let Some(task_id) = self.task_id else {
            return;
        };
        if let Some(name) = task_name.filter(|n| !n.is_empty()) {
            self.task_name = name.to_string();
        }
        self.snapshot = Some(LogSnapshot::running(
            task_id,
            self.task_name.clone(),
            log_id,
            iso_timestamp(now_ms),
        ));
        self.bump();
    }

    /// Append one pushed line. Returns `false` if it does not belong to the
    /// open view.
    pub fn push_line(
        &mut self,
        task_id: TaskId,
        log_id: Option<LogId>,
        kind: OutputKind,
        line: &str,
        now_ms: i64,
    ) -> bool {
        if !self.is_viewing(task_id) {
            return false;
        }
        if self.snapshot.is_none() {
            self.begin_live(None, log_id, now_ms);
        }
        let Some(snapshot) = self.snapshot.as_mut() else {
            return false;
        };

        match kind {
            OutputKind::Stdout => {
                if snapshot.stdout == WAITING_FOR_OUTPUT {
                    snapshot.stdout.clear();
                }
                snapshot.stdout.push_str(line);
                snapshot.stdout.push('\n');
            }
            OutputKind::Stderr => {
                snapshot.stderr.push_str(line);
                snapshot.stderr.push('\n');
            }
        }
        self.bump();
        true
    }

    /// Replace the snapshot with a pulled one (or clear it when the server
    /// has no log). Returns `false` if the view moved on meanwhile.
    pub fn replace(&mut self, task_id: TaskId, snapshot: Option<LogSnapshot>) -> bool {
        if !self.is_viewing(task_id) {
            return false;
        }
        if let Some(name) = snapshot.as_ref().map(|s| s.task_name.as_str()) {
            if !name.is_empty() {
                self.task_name = name.to_string();
            }
        }
        self.snapshot = snapshot;
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn iso_timestamp(now_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(now_ms)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
