#![allow(dead_code)]

use serde_json::{json, Map, Value};

use pinchy_live::config::{ConfigFile, RawConfigFile};
use pinchy_live::errors::Result;
use pinchy_live::protocol::{Event, LogSnapshot};
use pinchy_live::types::{LogId, RunStatus, SubscriptionId, TaskId};

/// Builder for wire messages, as JSON text or as a decoded [`Event`].
///
/// ```ignore
/// let text = EventBuilder::task_output(7, "hello").log_id(3).text();
/// ```
#[derive(Debug, Clone)]
pub struct EventBuilder {
    fields: Map<String, Value>,
}

impl EventBuilder {
    pub fn new(kind: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!(kind));
        Self { fields }
    }

    pub fn task_start(task_id: TaskId, task_name: &str) -> Self {
        Self::new("task_start")
            .field("task_id", task_id)
            .field("task_name", task_name)
    }

    pub fn task_output(task_id: TaskId, line: &str) -> Self {
        Self::new("task_output")
            .field("task_id", task_id)
            .field("output_line", line)
            .field("output_type", "stdout")
    }

    pub fn task_complete(task_id: TaskId, task_name: &str, status: &str) -> Self {
        Self::new("task_complete")
            .field("task_id", task_id)
            .field("task_name", task_name)
            .field("status", status)
    }

    pub fn task_error(task_id: TaskId, task_name: &str, error: &str) -> Self {
        Self::new("task_error")
            .field("task_id", task_id)
            .field("task_name", task_name)
            .field("error", error)
    }

    /// `kind` is `install` or `uninstall`; `phase` is `start`, `output` or
    /// `complete`.
    pub fn package(kind: &str, phase: &str, package_type: &str, package_name: &str) -> Self {
        Self::new(&format!("package_{kind}_{phase}"))
            .field("package_type", package_type)
            .field("package_name", package_name)
    }

    pub fn subscription_start(subscription_id: SubscriptionId, name: &str) -> Self {
        Self::new("subscription_sync_start")
            .field("subscription_id", subscription_id)
            .field("subscription_name", name)
    }

    pub fn subscription_complete(subscription_id: SubscriptionId, name: &str, status: &str) -> Self {
        Self::new("subscription_sync_complete")
            .field("subscription_id", subscription_id)
            .field("subscription_name", name)
            .field("status", status)
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn log_id(self, log_id: LogId) -> Self {
        self.field("log_id", log_id)
    }

    pub fn stderr(self) -> Self {
        self.field("output_type", "stderr")
    }

    pub fn text(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }

    pub fn build(&self) -> Event {
        Event::parse(&self.text()).expect("builder produced an undecodable event")
    }
}

/// Builder for REST log snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: LogSnapshot,
}

impl SnapshotBuilder {
    pub fn new(task_id: TaskId) -> Self {
        let mut snapshot = LogSnapshot::running(task_id, format!("task-{task_id}"), None, None);
        snapshot.status = RunStatus::Success;
        Self { snapshot }
    }

    pub fn id(mut self, log_id: LogId) -> Self {
        self.snapshot.id = Some(log_id);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.snapshot.task_name = name.to_string();
        self
    }

    pub fn status(mut self, status: RunStatus) -> Self {
        self.snapshot.status = status;
        self
    }

    pub fn running(self) -> Self {
        self.status(RunStatus::Running)
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.snapshot.stdout = text.to_string();
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.snapshot.stderr = text.to_string();
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.snapshot.exit_code = Some(code);
        self
    }

    pub fn build(self) -> LogSnapshot {
        self.snapshot
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.server.base_url = url.to_string();
        self
    }

    pub fn access_token(mut self, token: &str) -> Self {
        self.config.server.access_token = Some(token.to_string());
        self
    }

    pub fn reconnect_delay(mut self, value: &str) -> Self {
        self.config.channel.reconnect_delay = value.to_string();
        self
    }

    pub fn poll_interval(mut self, value: &str) -> Self {
        self.config.log_view.poll_interval = value.to_string();
        self
    }

    pub fn dedup(mut self, capacity: usize, retain: usize) -> Self {
        self.config.dedup.capacity = capacity;
        self.config.dedup.retain = retain;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
