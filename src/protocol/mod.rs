// src/protocol/mod.rs

//! Wire formats shared by the push channels and the REST collaborators.
//!
//! - [`event`] is the closed set of push messages.
//! - [`snapshot`] holds the pull-side payloads (`LogSnapshot` and friends).

pub mod event;
pub mod snapshot;

pub use event::{
    Event, EventKind, PackageFinished, PackageOutput, PackageStarted, SubscriptionSyncFinished,
    SubscriptionSyncStarted, TaskCompleted, TaskFailed, TaskOutputLine, TaskStarted,
};
pub use snapshot::{LogPage, LogSnapshot, RunningTasks, StatsSummary};
