// src/present.rs

//! Output side of a session: toasts, the task-log view, package output and
//! dashboard counters.

use std::io::{self, Write};

use crate::protocol::{LogSnapshot, StatsSummary};
use crate::types::{TaskId, Toast, ToastTone};

pub trait Presenter: Send {
    fn toast(&mut self, toast: &Toast);

    /// The open log view changed (`None`: nothing to show).
    fn log_view(&mut self, task_id: TaskId, snapshot: Option<&LogSnapshot>);

    fn package_line(&mut self, line: &str);

    fn stats(&mut self, stats: &StatsSummary);
}

/// Writes toasts and status lines to stderr and streams the viewed log's
/// output to stdout.
///
/// Only the part of the buffers not printed yet is written; when a pull
/// replaces the snapshot with something that does not extend what was
/// printed, the whole buffer is printed again under a header.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    task_id: Option<TaskId>,
    printed_stdout: String,
    printed_stderr: String,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, task_id: TaskId) {
        self.task_id = Some(task_id);
        self.printed_stdout.clear();
        self.printed_stderr.clear();
    }
}

/// Portion of `current` not yet covered by `printed`, or `None` when
/// `current` no longer extends it.
fn unseen<'a>(printed: &str, current: &'a str) -> Option<&'a str> {
    current.strip_prefix(printed)
}

impl Presenter for TerminalPresenter {
    fn toast(&mut self, toast: &Toast) {
        let tag = match toast.tone {
            ToastTone::Success => "ok",
            ToastTone::Info => "info",
            ToastTone::Error => "error",
        };
        eprintln!("[{tag}] {}", toast.message);
    }

    fn log_view(&mut self, task_id: TaskId, snapshot: Option<&LogSnapshot>) {
        if self.task_id != Some(task_id) {
            self.reset(task_id);
        }
        let Some(snapshot) = snapshot else {
            return;
        };

        let mut out = io::stdout().lock();

        match unseen(&self.printed_stdout, &snapshot.stdout) {
            Some(tail) => {
                let _ = out.write_all(tail.as_bytes());
            }
            None => {
                let _ = writeln!(out, "--- {} (log {:?}) ---", snapshot.task_name, snapshot.id);
                let _ = out.write_all(snapshot.stdout.as_bytes());
                self.printed_stderr.clear();
            }
        }
        self.printed_stdout.clone_from(&snapshot.stdout);

        let tail = unseen(&self.printed_stderr, &snapshot.stderr).unwrap_or(&snapshot.stderr);
        for line in tail.lines() {
            eprintln!("[stderr] {line}");
        }
        self.printed_stderr.clone_from(&snapshot.stderr);

        if !snapshot.is_running() {
            eprintln!(
                "[{}] exit code {}",
                snapshot.status.as_str(),
                snapshot
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        let _ = out.flush();
    }

    fn package_line(&mut self, line: &str) {
        eprintln!("[package] {line}");
    }

    fn stats(&mut self, stats: &StatsSummary) {
        eprintln!("[stats] {} runs, {} failed", stats.total, stats.failed);
    }
}
