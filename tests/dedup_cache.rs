// tests/dedup_cache.rs

use pinchy_live::dedup::{dedup_key, rolling_hash, DedupCache};
use pinchy_live::protocol::Event;
use pinchy_live_test_utils::builders::EventBuilder;

#[test]
fn rolling_hash_matches_known_values() {
    assert_eq!(rolling_hash(""), 0);
    assert_eq!(rolling_hash("a"), 97);
    assert_eq!(rolling_hash("abc"), 96354);
    assert_ne!(rolling_hash("line one"), rolling_hash("line two"));
}

#[test]
fn task_keys_use_log_id_when_present() {
    let start = EventBuilder::task_start(7, "backup").log_id(42).build();
    assert_eq!(dedup_key(&start, 1_000).as_deref(), Some("task_start_7_42"));

    let start = EventBuilder::task_start(7, "backup").build();
    assert_eq!(dedup_key(&start, 1_000).as_deref(), Some("task_start_7_1000"));
}

#[test]
fn package_keys_hash_output_and_default_identity() {
    let out = EventBuilder::package("install", "output", "python", "requests")
        .field("output", "abc")
        .build();
    assert_eq!(
        dedup_key(&out, 5).as_deref(),
        Some("package_install_output_python_requests_96354")
    );

    let anonymous = EventBuilder::new("package_uninstall_complete")
        .field("success", true)
        .build();
    assert_eq!(
        dedup_key(&anonymous, 5).as_deref(),
        Some("package_uninstall_complete_unknown_unknown_5")
    );
}

#[test]
fn subscription_keys() {
    let done = EventBuilder::subscription_complete(3, "feeds", "success")
        .log_id(9)
        .build();
    assert_eq!(
        dedup_key(&done, 1).as_deref(),
        Some("subscription_sync_complete_3_9")
    );
}

#[test]
fn unknown_events_have_no_key_and_always_pass() {
    let mut cache = DedupCache::default();
    assert_eq!(dedup_key(&Event::Unknown, 1), None);
    assert!(cache.should_process(&Event::Unknown, 1));
    assert!(cache.should_process(&Event::Unknown, 1));
    assert!(cache.is_empty());
}

#[test]
fn repeated_occurrence_is_suppressed() {
    let mut cache = DedupCache::default();
    let event = EventBuilder::task_complete(1, "a", "success").log_id(5).build();

    assert!(cache.should_process(&event, 10));
    assert!(!cache.should_process(&event, 20));
    assert_eq!(cache.len(), 1);
}

#[test]
fn same_millisecond_without_log_id_collapses() {
    let mut cache = DedupCache::default();
    let event = EventBuilder::task_start(1, "a").build();

    assert!(cache.should_process(&event, 10));
    assert!(!cache.should_process(&event, 10));
    assert!(cache.should_process(&event, 11));
}

#[test]
fn trim_keeps_the_most_recent_keys() {
    let mut cache = DedupCache::new(100, 50);
    for i in 0..100 {
        assert!(cache.insert_key(format!("k{i}")));
    }
    assert_eq!(cache.len(), 100);

    assert!(cache.insert_key("k100".to_string()));
    assert_eq!(cache.len(), 50);
    assert!(!cache.contains("k50"));
    assert!(cache.contains("k51"));
    assert!(cache.contains("k100"));

    // Forgotten keys are accepted again.
    assert!(cache.insert_key("k0".to_string()));
}
