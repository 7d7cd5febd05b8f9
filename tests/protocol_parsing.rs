// tests/protocol_parsing.rs

use pinchy_live::protocol::{Event, EventKind, LogPage, LogSnapshot};
use pinchy_live::types::{OutputKind, RunStatus};

#[test]
fn parses_task_output_line() {
    let event = Event::parse(
        r#"{"type":"task_output","task_id":4,"log_id":12,"output_line":"hi","output_type":"stderr"}"#,
    )
    .unwrap();

    let Event::TaskOutput(line) = &event else {
        panic!("expected task_output, got {event:?}");
    };
    assert_eq!(line.task_id, 4);
    assert_eq!(line.log_id, Some(12));
    assert_eq!(line.output_type, OutputKind::Stderr);
    assert_eq!(event.kind(), EventKind::TaskOutput);
    assert_eq!(event.task_id(), Some(4));
}

#[test]
fn unknown_status_is_tolerated() {
    let event =
        Event::parse(r#"{"type":"task_complete","task_id":1,"status":"timeout"}"#).unwrap();
    let Event::TaskComplete(done) = event else {
        panic!("expected task_complete");
    };
    assert_eq!(done.status, RunStatus::Unknown);
    assert_eq!(done.task_name, "");
}

#[test]
fn unrecognised_types_decode_as_unknown() {
    assert_eq!(Event::parse(r#"{"type":"pong"}"#).unwrap(), Event::Unknown);
    assert_eq!(
        Event::parse(r#"{"type":"notification","id":3}"#).unwrap(),
        Event::Unknown
    );
}

#[test]
fn malformed_payloads_are_errors() {
    assert!(Event::parse("ping").is_err());
    assert!(Event::parse(r#"{"task_id":1}"#).is_err());
    // Task events must name their task.
    assert!(Event::parse(r#"{"type":"task_start","task_name":"x"}"#).is_err());
}

#[test]
fn package_identity_is_optional() {
    let event = Event::parse(r#"{"type":"package_install_start"}"#).unwrap();
    let Event::PackageInstallStart(started) = event else {
        panic!("expected package_install_start");
    };
    assert_eq!(started.package_name, None);
    assert_eq!(started.version, None);
}

#[test]
fn snapshot_maps_output_fields_and_nulls() {
    let snapshot: LogSnapshot = serde_json::from_str(
        r#"{"id":8,"task_id":2,"task_name":"sync","status":"failed",
            "output":"a\nb\n","error_output":null,"exit_code":1}"#,
    )
    .unwrap();

    assert_eq!(snapshot.stdout, "a\nb\n");
    assert_eq!(snapshot.stderr, "");
    assert_eq!(snapshot.status, RunStatus::Failed);
    assert!(!snapshot.is_running());
}

#[test]
fn log_page_accepts_both_shapes() {
    let paged: LogPage =
        serde_json::from_str(r#"{"items":[{"task_id":1,"status":"running"}],"total":1}"#).unwrap();
    assert_eq!(paged.into_items().len(), 1);

    let bare: LogPage = serde_json::from_str(r#"[{"task_id":1},{"task_id":1}]"#).unwrap();
    assert_eq!(bare.into_items().len(), 2);
}
