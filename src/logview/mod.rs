// src/logview/mod.rs

//! Single task-log view: push/pull reconciliation and the pull fallback.

pub mod aggregator;
pub mod fetch;
pub mod polling;

pub use aggregator::{LogAggregator, WAITING_FOR_OUTPUT};
pub use fetch::load_task_log;
pub use polling::{PollDecision, PollingSupervisor};
