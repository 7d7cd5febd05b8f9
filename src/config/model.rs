// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [server]
/// base_url = "http://127.0.0.1:8000"
/// access_token = "..."
///
/// [channel]
/// reconnect_delay = "5s"
/// ping_delay = "100ms"
///
/// [log_view]
/// poll_interval = "1s"
/// completion_grace = "1s"
/// finalize_delay = "1s"
///
/// [timers]
/// package_reload_delay = "1s"
/// force_stop_after = "5s"
///
/// [dedup]
/// capacity = 100
/// retain = 50
/// ```
///
/// All sections are optional and have the defaults shown above.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: RawServerSection,
    #[serde(default)]
    pub channel: RawChannelSection,
    #[serde(default)]
    pub log_view: RawLogViewSection,
    #[serde(default)]
    pub timers: RawTimersSection,
    #[serde(default)]
    pub dedup: DedupSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawServerSection {
    /// HTTP origin of the backend; websocket URLs are derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session token, sent as the `access_token` cookie.
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for RawServerSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
        }
    }
}

/// `[channel]` section (global channel only).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawChannelSection {
    /// Fixed delay before reconnecting after an abnormal close.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: String,

    /// Delay between connect and the `ping` probe.
    #[serde(default = "default_ping_delay")]
    pub ping_delay: String,
}

fn default_reconnect_delay() -> String {
    "5s".to_string()
}

fn default_ping_delay() -> String {
    "100ms".to_string()
}

impl Default for RawChannelSection {
    fn default() -> Self {
        Self {
            reconnect_delay: default_reconnect_delay(),
            ping_delay: default_ping_delay(),
        }
    }
}

/// `[log_view]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLogViewSection {
    #[serde(default = "one_second")]
    pub poll_interval: String,

    /// After a global `task_complete`, polling stops once this has passed.
    #[serde(default = "one_second")]
    pub completion_grace: String,

    /// After the per-task channel reports completion, the final pull waits
    /// this long.
    #[serde(default = "one_second")]
    pub finalize_delay: String,
}

fn one_second() -> String {
    "1s".to_string()
}

impl Default for RawLogViewSection {
    fn default() -> Self {
        Self {
            poll_interval: one_second(),
            completion_grace: one_second(),
            finalize_delay: one_second(),
        }
    }
}

/// `[timers]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTimersSection {
    #[serde(default = "one_second")]
    pub package_reload_delay: String,

    /// A stop request still running after this long is forced.
    #[serde(default = "default_force_stop_after")]
    pub force_stop_after: String,
}

fn default_force_stop_after() -> String {
    "5s".to_string()
}

impl Default for RawTimersSection {
    fn default() -> Self {
        Self {
            package_reload_delay: one_second(),
            force_stop_after: default_force_stop_after(),
        }
    }
}

/// `[dedup]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DedupSection {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_retain")]
    pub retain: usize,
}

fn default_capacity() -> usize {
    crate::dedup::DEFAULT_CAPACITY
}

fn default_retain() -> usize {
    crate::dedup::DEFAULT_RETAIN
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            retain: default_retain(),
        }
    }
}

/// Validated configuration used by the rest of the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub channel: ChannelConfig,
    pub log_view: LogViewConfig,
    pub timers: TimersConfig,
    pub dedup: DedupSection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub base_url: Url,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub reconnect_delay: Duration,
    pub ping_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogViewConfig {
    pub poll_interval: Duration,
    pub completion_grace: Duration,
    pub finalize_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimersConfig {
    pub package_reload_delay: Duration,
    pub force_stop_after: Duration,
}

impl ConfigFile {
    /// Build from already-checked parts.
    pub fn new_unchecked(
        server: ServerConfig,
        channel: ChannelConfig,
        log_view: LogViewConfig,
        timers: TimersConfig,
        dedup: DedupSection,
    ) -> Self {
        Self {
            server,
            channel,
            log_view,
            timers,
            dedup,
        }
    }
}
