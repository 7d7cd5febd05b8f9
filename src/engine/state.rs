// src/engine/state.rs

//! Mutable session state owned by the core.

use std::collections::{BTreeSet, HashSet};

use crate::dedup::DedupCache;
use crate::logview::{LogAggregator, PollingSupervisor};
use crate::protocol::{PackageOutput, PackageStarted};
use crate::types::{LogId, SubscriptionId, TaskId};

/// What the client believes is running, and which of those runs the local
/// user started.
#[derive(Debug, Default)]
pub struct RunState {
    running: BTreeSet<TaskId>,
    manual: HashSet<TaskId>,
}

impl RunState {
    pub fn is_running(&self, task_id: TaskId) -> bool {
        self.running.contains(&task_id)
    }

    pub fn is_manual(&self, task_id: TaskId) -> bool {
        self.manual.contains(&task_id)
    }

    pub fn running(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.running.iter().copied()
    }

    pub fn mark_manual(&mut self, task_id: TaskId) {
        self.manual.insert(task_id);
    }

    pub fn clear_manual(&mut self, task_id: TaskId) {
        self.manual.remove(&task_id);
    }

    pub fn mark_running(&mut self, task_id: TaskId) {
        self.running.insert(task_id);
    }

    /// Returns whether the task was known to be running.
    pub fn mark_stopped(&mut self, task_id: TaskId) -> bool {
        self.running.remove(&task_id)
    }

    /// Run finished (completion or error): forget it in both sets.
    pub fn mark_finished(&mut self, task_id: TaskId) -> bool {
        self.manual.remove(&task_id);
        self.running.remove(&task_id)
    }

    /// Replace the running set with the server's authoritative list.
    pub fn resync(&mut self, running: impl IntoIterator<Item = TaskId>) {
        self.running = running.into_iter().collect();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageAction {
    #[default]
    Install,
    Uninstall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackagePhase {
    #[default]
    Idle,
    Installing,
    Success,
    Failed,
}

/// The package install/uninstall currently (or last) shown.
#[derive(Debug, Clone, Default)]
pub struct PackageOperation {
    pub action: PackageAction,
    pub phase: PackagePhase,
    pub package_type: Option<String>,
    pub package_name: Option<String>,
    pub version: Option<String>,
    pub log: Vec<String>,
}

impl PackageOperation {
    /// Start tracking a new operation; returns the log line announcing it.
    pub fn begin(&mut self, action: PackageAction, started: &PackageStarted) -> String {
        *self = PackageOperation {
            action,
            phase: PackagePhase::Installing,
            package_type: started.package_type.clone(),
            package_name: started.package_name.clone(),
            version: match action {
                PackageAction::Install => started.version.clone(),
                PackageAction::Uninstall => None,
            },
            log: Vec::new(),
        };

        let verb = match action {
            PackageAction::Install => "installing",
            PackageAction::Uninstall => "uninstalling",
        };
        let mut line = format!(
            "{verb} {} package {}",
            self.package_type.as_deref().unwrap_or("unknown"),
            self.name()
        );
        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            line.push_str(&format!(" (version {version})"));
        }
        self.log.push(line.clone());
        line
    }

    /// Append an output line; returns it when there was something to add.
    pub fn push_output(&mut self, output: &PackageOutput) -> Option<String> {
        let line = output.output.clone()?;
        self.log.push(line.clone());
        Some(line)
    }

    pub fn finish(&mut self, success: bool) -> String {
        self.phase = if success {
            PackagePhase::Success
        } else {
            PackagePhase::Failed
        };
        let line = match (self.action, success) {
            (PackageAction::Install, true) => "installed successfully",
            (PackageAction::Install, false) => "installation failed",
            (PackageAction::Uninstall, true) => "uninstalled successfully",
            (PackageAction::Uninstall, false) => "uninstallation failed",
        }
        .to_string();
        self.log.push(line.clone());
        line
    }

    pub fn name(&self) -> &str {
        self.package_name.as_deref().unwrap_or("unknown")
    }
}

/// Which per-task channel is wanted, and whether it reported open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskChannel {
    pub task_id: Option<TaskId>,
    pub open: bool,
}

impl TaskChannel {
    pub fn is_for(&self, task_id: TaskId) -> bool {
        self.task_id == Some(task_id)
    }

    pub fn is_open_for(&self, task_id: TaskId) -> bool {
        self.open && self.is_for(task_id)
    }
}

/// Everything the core mutates, grouped so handlers can borrow it as one.
#[derive(Debug)]
pub struct SessionState {
    pub dedup: DedupCache,
    pub runs: RunState,
    pub package: PackageOperation,
    pub syncing: HashSet<SubscriptionId>,
    pub view: LogAggregator,
    pub polling: PollingSupervisor,
    pub task_channel: TaskChannel,
    pub subscriptions_view: bool,
    pub session_active: bool,
    /// `run` mode: the followed run was accepted by the server.
    pub follow_started: bool,
    /// `run` mode: log id of the run shown before ours was submitted.
    pub follow_baseline: Option<LogId>,
}

impl SessionState {
    pub fn new(dedup_capacity: usize, dedup_retain: usize) -> Self {
        Self {
            dedup: DedupCache::new(dedup_capacity, dedup_retain),
            runs: RunState::default(),
            package: PackageOperation::default(),
            syncing: HashSet::new(),
            view: LogAggregator::new(),
            polling: PollingSupervisor::new(),
            task_channel: TaskChannel::default(),
            subscriptions_view: false,
            session_active: false,
            follow_started: false,
            follow_baseline: None,
        }
    }
}
