// src/dedup/key.rs

//! DedupKey derivation.
//!
//! The three categories fingerprint differently:
//! - package events: `type_pkgtype_pkgname_<hash of output | now>`
//! - subscription sync: `type_subscription_<log id | now>`
//! - task events: `type_task_<log id | now>`
//!
//! Missing package identity is spelled `unknown`. Start/complete markers with
//! no log id fall back to the wall-clock millisecond, so two of them are only
//! collapsed when they land within the same millisecond.

use crate::dedup::hash::rolling_hash;
use crate::protocol::Event;
use crate::types::LogId;

/// Derived fingerprint for one logical occurrence of an event.
pub type DedupKey = String;

/// Derive the key for `event`, or `None` for unrecognised events.
pub fn dedup_key(event: &Event, now_ms: i64) -> Option<DedupKey> {
    let kind = event.kind().as_str();

    let key = match event {
        Event::TaskStart(e) => task_key(kind, e.task_id, e.log_id, now_ms),
        Event::TaskOutput(e) => task_key(kind, e.task_id, e.log_id, now_ms),
        Event::TaskComplete(e) => task_key(kind, e.task_id, e.log_id, now_ms),
        Event::TaskError(e) => task_key(kind, e.task_id, e.log_id, now_ms),
        Event::PackageInstallStart(e) | Event::PackageUninstallStart(e) => {
            package_key(kind, &e.package_type, &e.package_name, None, now_ms)
        }
        Event::PackageInstallOutput(e) | Event::PackageUninstallOutput(e) => package_key(
            kind,
            &e.package_type,
            &e.package_name,
            e.output.as_deref(),
            now_ms,
        ),
        Event::PackageInstallComplete(e) | Event::PackageUninstallComplete(e) => {
            package_key(kind, &e.package_type, &e.package_name, None, now_ms)
        }
        Event::SubscriptionSyncStart(e) => {
            subscription_key(kind, e.subscription_id, e.log_id, now_ms)
        }
        Event::SubscriptionSyncComplete(e) => {
            subscription_key(kind, e.subscription_id, e.log_id, now_ms)
        }
        Event::Unknown => return None,
    };

    Some(key)
}

fn task_key(kind: &str, task_id: i64, log_id: Option<LogId>, now_ms: i64) -> DedupKey {
    format!("{kind}_{task_id}_{}", log_id.unwrap_or(now_ms))
}

fn subscription_key(kind: &str, subscription_id: i64, log_id: Option<LogId>, now_ms: i64) -> DedupKey {
    format!("{kind}_{subscription_id}_{}", log_id.unwrap_or(now_ms))
}

fn package_key(
    kind: &str,
    package_type: &Option<String>,
    package_name: &Option<String>,
    output: Option<&str>,
    now_ms: i64,
) -> DedupKey {
    let package_type = package_type.as_deref().unwrap_or("unknown");
    let package_name = package_name.as_deref().unwrap_or("unknown");

    match output {
        Some(text) if !text.is_empty() => {
            format!("{kind}_{package_type}_{package_name}_{}", rolling_hash(text))
        }
        _ => format!("{kind}_{package_type}_{package_name}_{now_ms}"),
    }
}
