// src/config/validate.rs

use std::time::Duration;

use url::Url;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ChannelConfig, ConfigFile, DedupSection, LogViewConfig, RawConfigFile, ServerConfig,
    TimersConfig,
};
use crate::errors::{LiveError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LiveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let server = validate_server(&raw)?;
        let channel = ChannelConfig {
            reconnect_delay: duration_field("channel.reconnect_delay", &raw.channel.reconnect_delay)?,
            ping_delay: duration_field("channel.ping_delay", &raw.channel.ping_delay)?,
        };
        let log_view = LogViewConfig {
            poll_interval: duration_field("log_view.poll_interval", &raw.log_view.poll_interval)?,
            completion_grace: duration_field(
                "log_view.completion_grace",
                &raw.log_view.completion_grace,
            )?,
            finalize_delay: duration_field("log_view.finalize_delay", &raw.log_view.finalize_delay)?,
        };
        let timers = TimersConfig {
            package_reload_delay: duration_field(
                "timers.package_reload_delay",
                &raw.timers.package_reload_delay,
            )?,
            force_stop_after: duration_field(
                "timers.force_stop_after",
                &raw.timers.force_stop_after,
            )?,
        };

        if log_view.poll_interval.is_zero() {
            return Err(LiveError::ConfigError(
                "[log_view].poll_interval must be greater than zero".to_string(),
            ));
        }
        validate_dedup(&raw.dedup)?;

        Ok(ConfigFile::new_unchecked(
            server, channel, log_view, timers, raw.dedup,
        ))
    }
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| LiveError::ConfigError(format!("invalid duration for `{name}`: {e}")))
}

fn validate_server(raw: &RawConfigFile) -> Result<ServerConfig> {
    let base_url = Url::parse(&raw.server.base_url).map_err(|e| {
        LiveError::ConfigError(format!(
            "[server].base_url '{}' is not a valid URL: {e}",
            raw.server.base_url
        ))
    })?;

    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LiveError::ConfigError(format!(
            "[server].base_url must use http or https (got '{}')",
            base_url.scheme()
        )));
    }

    let access_token = raw
        .server
        .access_token
        .clone()
        .filter(|token| !token.trim().is_empty());

    Ok(ServerConfig {
        base_url,
        access_token,
    })
}

fn validate_dedup(dedup: &DedupSection) -> Result<()> {
    if dedup.retain == 0 {
        return Err(LiveError::ConfigError(
            "[dedup].retain must be >= 1 (got 0)".to_string(),
        ));
    }
    if dedup.retain >= dedup.capacity {
        return Err(LiveError::ConfigError(format!(
            "[dedup].retain ({}) must be smaller than [dedup].capacity ({})",
            dedup.retain, dedup.capacity
        )));
    }
    Ok(())
}
