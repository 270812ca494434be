//! End-to-end scenarios over the demo catalog.

use std::sync::Arc;

use covenant_runner::{
    AssertionRule, DiscoveryPolicy, DiscoveryService, TestMode, TestStatus,
};
use covenant_type_graph::{
    names, Annotation, AnnotationSet, MethodBody, Parameter, RawClass, RawType, TargetFailure,
    Value,
};

use crate::helpers::{
    base_catalog, method, policy_at, read_lines, reference, register_adder, register_contract,
    run_catalog, standard_method, struct_ctor,
};

#[test]
fn adder_passes_and_records_its_designed_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    let mut policy = policy_at(dir.path());
    policy.auditing.retention = covenant_runner::AuditRetention::Always;
    policy.auditing.depth = covenant_runner::AuditDepth::Explainable;

    let (outcome, events) = run_catalog(catalog, policy);
    let result = outcome.results.get("demo.Adder").expect("adder ran");
    assert_eq!(result.status, TestStatus::Passed);
    assert!(result.execution.arguments.contains_key("user.a"));
    assert!(result.execution.arguments.contains_key("user.b"));

    // The persisted journal snapshot carries the full audit trail.
    let lines = read_lines(std::path::Path::new(&events[0].journal_path));
    let designs = lines.iter().filter(|line| line.contains("\"Design\"")).count();
    assert!(designs >= 2, "expected design events for a and b");
    assert!(lines.iter().any(|line| line.contains("\"Execution\"") && line.contains("sum()")));
    assert!(lines.iter().any(|line| line.contains("\"Verdict\"")));
}

#[test]
fn conforming_contract_implementation_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_contract(&mut catalog, true);

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = outcome.results.get("demo.GoodOps").expect("impl ran");
    assert_eq!(result.status, TestStatus::Passed);
    assert!(result
        .execution
        .records
        .iter()
        .all(|record| !record.is_failed()));
}

#[test]
fn violating_contract_implementation_fails_with_the_rule() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_contract(&mut catalog, false);

    let mut policy = policy_at(dir.path());
    policy.auditing.depth = covenant_runner::AuditDepth::Explainable;

    let (outcome, _) = run_catalog(catalog, policy);
    let result = outcome.results.get("demo.BadOps").expect("impl ran");
    assert!(matches!(result.status, TestStatus::AssertionFailed { .. }));

    let record = &result.execution.records[0];
    assert_eq!(
        record.rule,
        AssertionRule::Annotation {
            name: names::POSITIVE.to_owned()
        }
    );
    assert!(record.message.starts_with("Contract violated"));
    // Trace mode points the failure at the implementation.
    assert!(matches!(
        &record.location,
        covenant_runner::SourceLocation::Approximate { class, .. } if class == "demo.BadOps"
    ));
}

#[test]
fn non_nullable_dependency_cycle_is_a_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    catalog.register(RawType::class(
        "demo.B",
        RawClass {
            constructors: vec![struct_ctor(
                "demo.B",
                &["a"],
                vec![Parameter::new("a", reference("demo.A"))],
            )],
            ..RawClass::default()
        },
    ));
    catalog.register(
        RawType::class(
            "demo.A",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.A",
                    &["b"],
                    vec![Parameter::new("b", reference("demo.B"))],
                )],
                methods: vec![method(
                    "noop",
                    vec![],
                    AnnotationSet::of([Annotation::marker(names::TEST)]),
                    AnnotationSet::empty(),
                    MethodBody::from_fn(|_| Ok(Value::Null)),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = outcome.results.get("demo.A").expect("target ran");
    match &result.status {
        TestStatus::ExecutionError { message, .. } => {
            assert!(message.contains("A -> B -> A"), "got: {message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn per_mode_specs_merge_modes_and_seed() {
    let mut catalog = base_catalog();
    register_contract(&mut catalog, true);
    // The implementation is also a user-scenario target, without a seed of
    // its own.
    let raw = catalog.get("demo.GoodOps").unwrap().clone();
    catalog.register(
        raw.annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
    );

    let discovery = DiscoveryService::new(Arc::new(catalog));
    let specs = discovery
        .discover(&DiscoveryPolicy::default(), names::CONTRACT)
        .unwrap();
    let merged = specs
        .iter()
        .find(|spec| spec.target.fully_qualified_name == "demo.GoodOps")
        .unwrap();
    assert_eq!(merged.modes.len(), 2);
    assert!(merged.modes.contains(&TestMode::UserScenario));
    assert!(merged.modes.contains(&TestMode::ContractAuto {
        contract: "demo.Ops".into()
    }));
    assert_eq!(merged.seed, Some(42));
}

#[test]
fn passing_test_leaves_no_failure_snapshot_and_no_design_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_adder(&mut catalog, 42);

    // Defaults: retention on failure, simple depth.
    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    assert_eq!(outcome.results["demo.Adder"].status, TestStatus::Passed);
    assert!(!dir.path().join("failures").exists());
    // Nothing persisted anywhere may carry a design event under simple
    // depth: the recycled journal is empty, and no snapshot exists.
    assert!(!dir.path().join("traces").exists());
    let journal = read_lines(&dir.path().join("logs/workers/worker-0.ndjson"));
    assert!(journal.is_empty());
}

#[test]
fn failing_test_snapshots_under_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    register_contract(&mut catalog, false);

    let (outcome, events) = run_catalog(catalog, policy_at(dir.path()));
    assert!(matches!(
        outcome.results["demo.BadOps"].status,
        TestStatus::AssertionFailed { .. }
    ));
    let snapshot = std::path::PathBuf::from(&events[0].journal_path);
    assert!(snapshot.display().to_string().contains("failures"));
    let lines = read_lines(&snapshot);
    assert!(lines.iter().any(|line| line.contains("\"Exception\"")));
    assert!(lines.iter().any(|line| line.contains("\"Verdict\"")));
}

#[test]
fn async_targets_are_blocking_adapted() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    catalog.register(
        RawType::class(
            "demo.AsyncTarget",
            RawClass {
                constructors: vec![struct_ctor("demo.AsyncTarget", &[], vec![])],
                methods: vec![method(
                    "eventually",
                    vec![],
                    AnnotationSet::of([Annotation::marker(names::TEST)]),
                    AnnotationSet::empty(),
                    MethodBody::from_async(|_| {
                        Box::pin(async {
                            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                            Ok(Value::Null)
                        })
                    }),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::COVENANT_TEST).with("seed", 5i64)
        ])),
    );

    let (outcome, events) = run_catalog(catalog, policy_at(dir.path()));
    assert_eq!(outcome.results["demo.AsyncTarget"].status, TestStatus::Passed);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, TestStatus::Passed);
}

#[test]
fn slow_targets_abort_on_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    catalog.register(
        RawType::class(
            "demo.Sleeper",
            RawClass {
                constructors: vec![struct_ctor("demo.Sleeper", &[], vec![])],
                methods: vec![method(
                    "forever",
                    vec![],
                    AnnotationSet::of([Annotation::marker(names::TEST)]),
                    AnnotationSet::empty(),
                    MethodBody::from_async(|_| {
                        Box::pin(async {
                            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                            Ok(Value::Null)
                        })
                    }),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
    );

    let mut policy = policy_at(dir.path());
    policy.resources.timeout_ms = 50;
    let (outcome, _) = run_catalog(catalog, policy);
    assert_eq!(
        outcome.results["demo.Sleeper"].status,
        TestStatus::Aborted {
            reason: "timeout".into()
        }
    );
}

#[test]
fn crash_during_invocation_keeps_argument_forensics() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    catalog.register(
        RawType::class(
            "demo.Crasher",
            RawClass {
                constructors: vec![struct_ctor("demo.Crasher", &[], vec![])],
                methods: vec![method(
                    "explode",
                    vec![
                        Parameter::new("x", reference("covenant.Int")),
                        Parameter::new("tag", reference("covenant.String")),
                    ],
                    AnnotationSet::of([Annotation::marker(names::TEST)]),
                    AnnotationSet::empty(),
                    MethodBody::from_fn(|_| {
                        Err(TargetFailure::error("IllegalState", "boom"))
                    }),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::COVENANT_TEST).with("seed", 13i64)
        ])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = &outcome.results["demo.Crasher"];
    match &result.status {
        TestStatus::ExecutionError { cause, .. } => assert_eq!(cause, "IllegalState"),
        other => panic!("unexpected {other:?}"),
    }
    // The pre-invocation snapshots survive the crash.
    assert!(result.execution.arguments.contains_key("user.x"));
    assert!(result.execution.arguments.contains_key("user.tag"));
    let record = &result.execution.records[0];
    assert_eq!(
        record.rule,
        AssertionRule::UserException {
            type_name: "IllegalState".into()
        }
    );
    assert!(record.message.starts_with("Unexpected Exception"));
}

#[test]
fn identical_seeds_reproduce_identical_runs() {
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = base_catalog();
        register_adder(&mut catalog, 42);
        let (outcome, events) = run_catalog(catalog, policy_at(dir.path()));
        (
            outcome.results["demo.Adder"].execution.clone(),
            events[0].run_id,
        )
    };
    let (first, first_run_id) = run();
    let (second, second_run_id) = run();
    assert_eq!(first.records, second.records);
    assert_eq!(first.arguments, second.arguments);
    assert_eq!(first.seed, second.seed);
    assert_eq!(first_run_id, second_run_id);
}

#[test]
fn data_compliance_emits_one_record_per_rule() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    let mut ctor = struct_ctor("demo.Point", &["x", "y"], vec![]);
    ctor.parameters = vec![
        Parameter::new("x", reference("covenant.Int")),
        Parameter::new("y", reference("covenant.Int")),
    ];
    catalog.register(
        RawType::class(
            "demo.Point",
            RawClass {
                constructors: vec![ctor],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::DATA_CONTRACT).with("seed", 3i64)
        ])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = &outcome.results["demo.Point"];
    assert_eq!(result.status, TestStatus::Passed);
    let data_records = result
        .execution
        .records
        .iter()
        .filter(|record| matches!(record.rule, AssertionRule::DataContract { .. }))
        .count();
    assert_eq!(data_records, 7);
    assert!(result.execution.arguments.contains_key("data.instance"));
}

#[test]
fn data_compliance_replays_mock_backed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    // An interface with no implementations: the field bottoms out in the
    // mocking engine, whose instance identity must replay under one seed.
    catalog.register(RawType::class("demo.Notifier", RawClass::default()).interface());
    let mut ctor = struct_ctor("demo.Audit", &["id", "sink"], vec![]);
    ctor.parameters = vec![
        Parameter::new("id", reference("covenant.Int")),
        Parameter::new("sink", reference("demo.Notifier")),
    ];
    catalog.register(
        RawType::class(
            "demo.Audit",
            RawClass {
                constructors: vec![ctor],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::DATA_CONTRACT).with("seed", 11i64)
        ])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = &outcome.results["demo.Audit"];
    assert_eq!(result.status, TestStatus::Passed);
    assert!(result
        .execution
        .records
        .iter()
        .all(|record| !record.is_failed()));
    // The generated instance really carries the mock.
    assert!(result.execution.arguments["data.instance"].contains("Notifier@"));
}

#[test]
fn broken_equality_member_fails_its_rules() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    let mut ctor = struct_ctor("demo.Wobbly", &["x"], vec![]);
    ctor.parameters = vec![Parameter::new("x", reference("covenant.Int"))];
    catalog.register(
        RawType::class(
            "demo.Wobbly",
            RawClass {
                constructors: vec![ctor],
                methods: vec![standard_method(
                    "equals",
                    vec![Parameter::new("other", reference("demo.Wobbly"))],
                    // Nothing is ever equal, not even the instance itself.
                    MethodBody::from_fn(|_| Ok(Value::Bool(false))),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::DATA_CONTRACT).with("seed", 4i64)
        ])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = &outcome.results["demo.Wobbly"];
    assert!(matches!(result.status, TestStatus::AssertionFailed { .. }));

    let failed_kinds: Vec<_> = result
        .execution
        .records
        .iter()
        .filter(|record| record.is_failed())
        .map(|record| record.rule.clone())
        .collect();
    assert!(failed_kinds.contains(&AssertionRule::DataContract {
        kind: covenant_runner::DataContractKind::Equality
    }));
    assert!(failed_kinds.contains(&AssertionRule::DataContract {
        kind: covenant_runner::DataContractKind::Reflexivity
    }));
    // `equals(a, null)` is false, which is exactly what the rule demands.
    assert!(!failed_kinds.contains(&AssertionRule::DataContract {
        kind: covenant_runner::DataContractKind::NotNullEquality
    }));
}

#[test]
fn declared_equality_members_drive_the_checks() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = base_catalog();
    let mut ctor = struct_ctor("demo.Exact", &["x"], vec![]);
    ctor.parameters = vec![Parameter::new("x", reference("covenant.Int"))];
    catalog.register(
        RawType::class(
            "demo.Exact",
            RawClass {
                constructors: vec![ctor],
                methods: vec![
                    standard_method(
                        "equals",
                        vec![Parameter::new("other", reference("demo.Exact"))],
                        MethodBody::from_fn(|args| Ok(Value::Bool(args[0] == args[1]))),
                    ),
                    standard_method(
                        "hashCode",
                        vec![],
                        MethodBody::from_fn(|args| {
                            Ok(Value::Long(args[0].render().len() as i64))
                        }),
                    ),
                ],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::DATA_CONTRACT).with("seed", 6i64)
        ])),
    );

    let (outcome, _) = run_catalog(catalog, policy_at(dir.path()));
    let result = &outcome.results["demo.Exact"];
    assert_eq!(result.status, TestStatus::Passed);
    let data_records: Vec<_> = result
        .execution
        .records
        .iter()
        .filter(|record| matches!(record.rule, AssertionRule::DataContract { .. }))
        .collect();
    assert_eq!(data_records.len(), 7);
    assert!(data_records.iter().all(|record| !record.is_failed()));
}
