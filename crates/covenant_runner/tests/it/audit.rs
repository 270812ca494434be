//! Audit-trail behavior: retention, journal layout, event ordering,
//! publisher wiring.

use covenant_runner::{AuditRetention, TestStatus};

use crate::helpers::{base_catalog, policy_at, read_lines, register_adder, run_catalog};

#[test]
fn always_retention_snapshots_under_traces() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let mut policy = policy_at(dir.path());
    policy.auditing.retention = AuditRetention::Always;

    let (_, events) = run_catalog(catalog, policy);
    assert_eq!(events.len(), 1);
    let snapshot = std::path::PathBuf::from(&events[0].journal_path);
    assert!(snapshot.display().to_string().contains("traces"));
    assert!(snapshot
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(&format!("run-{}", events[0].run_id)));
    assert!(snapshot.exists());
}

#[test]
fn archive_mode_suffixes_snapshot_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let mut policy = policy_at(dir.path());
    policy.auditing.retention = AuditRetention::Always;
    policy.auditing.archive = true;

    let (_, events) = run_catalog(catalog, policy);
    let name = std::path::PathBuf::from(&events[0].journal_path)
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    // run-<id>-<timestamp>.log
    let run_prefix = format!("run-{}-", events[0].run_id);
    assert!(name.starts_with(&run_prefix), "got {name}");
    assert!(name.ends_with(".log"));
}

#[test]
fn none_retention_keeps_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let mut policy = policy_at(dir.path());
    policy.auditing.retention = AuditRetention::None;

    let (outcome, events) = run_catalog(catalog, policy);
    assert_eq!(outcome.results["demo.Adder"].status, TestStatus::Passed);
    assert!(!dir.path().join("traces").exists());
    assert!(!dir.path().join("failures").exists());
    // The published journal path points at the recycled worker journal.
    assert!(events[0].journal_path.contains("logs"));
}

#[test]
fn snapshot_lines_are_in_emit_order_with_nondecreasing_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let mut policy = policy_at(dir.path());
    policy.auditing.retention = AuditRetention::Always;
    policy.auditing.depth = covenant_runner::AuditDepth::Explainable;

    let (_, events) = run_catalog(catalog, policy);
    let lines = read_lines(std::path::Path::new(&events[0].journal_path));
    assert!(!lines.is_empty());

    let mut previous = i64::MIN;
    for line in &lines {
        let parsed: serde_json::Value = serde_json::from_str(line).expect("valid ndjson");
        let ts = parsed["ts"].as_i64().expect("every event carries ts");
        assert!(ts >= previous, "timestamps must not go backwards");
        previous = ts;
    }
    // The verdict is the final line.
    assert!(lines.last().unwrap().contains("\"Verdict\""));
}

#[test]
fn published_events_carry_worker_seed_and_duration() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let (_, events) = run_catalog(catalog, policy_at(dir.path()));
    let event = &events[0];
    assert_eq!(event.test_name, "demo.Adder");
    assert_eq!(event.seed, 42);
    assert_eq!(event.status, TestStatus::Passed);
    assert!(event.timestamp > 0);
}
