//! Shared fixtures: a demo catalog and a fully wired runner.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use covenant_fixtures::{FixtureGenerator, MockingEngine, OpaqueMockingEngine};
use covenant_runner::{
    build_sealed_index, BroadcastingPublisher, DiscoveryPolicy, DiscoveryService, ExecutionPolicy,
    MultiTargetRunner, PublishError, ResultPublisher, RunOutcome, TestFilterConfig,
    TestResultEvent,
};
use covenant_type_graph::{
    names, Annotation, AnnotationSet, Constructor, ConstructorHandle, Method, MethodBody,
    MethodKind, Parameter, RawClass, RawType, ResolverSession, TargetFailure, TypeCatalog, TypeId,
    TypeReference, Value, ValueKind,
};

pub fn reference(qualified_name: &str) -> TypeReference {
    TypeReference::by_name(TypeId::plain(qualified_name))
}

pub fn struct_ctor(type_id: &str, fields: &[&str], parameters: Vec<Parameter>) -> Constructor {
    let type_id = type_id.to_owned();
    let fields: Vec<String> = fields.iter().map(|name| (*name).to_owned()).collect();
    Constructor {
        primary: true,
        parameters,
        handle: ConstructorHandle::new(move |args| {
            Ok(Value::Struct {
                type_id: type_id.clone(),
                fields: fields.iter().cloned().zip(args.iter().cloned()).collect(),
            })
        }),
    }
}

pub fn method(
    name: &str,
    parameters: Vec<Parameter>,
    annotations: AnnotationSet,
    return_annotations: AnnotationSet,
    body: MethodBody,
) -> Method {
    Method {
        name: name.to_owned(),
        kind: MethodKind::Regular,
        parameters,
        return_type: None,
        annotations,
        return_annotations,
        body,
    }
}

/// A language-provided member (equality, hashing); never an entry point.
pub fn standard_method(name: &str, parameters: Vec<Parameter>, body: MethodBody) -> Method {
    Method {
        name: name.to_owned(),
        kind: MethodKind::Standard,
        parameters,
        return_type: None,
        annotations: AnnotationSet::empty(),
        return_annotations: AnnotationSet::empty(),
        body,
    }
}

pub fn field_long(value: &Value, field: &str) -> i64 {
    let Value::Struct { fields, .. } = value else {
        panic!("expected a struct, got {value:?}");
    };
    match fields.iter().find(|(name, _)| name == field) {
        Some((_, Value::Int(int))) => i64::from(*int),
        Some((_, Value::Long(long))) => *long,
        other => panic!("unexpected field {field}: {other:?}"),
    }
}

/// Registers the scalar set every demo type builds on.
pub fn base_catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    catalog.register(RawType::scalar("covenant.Bool", ValueKind::Bool));
    catalog.register(RawType::scalar("covenant.Int", ValueKind::Int));
    catalog.register(RawType::scalar("covenant.Long", ValueKind::Long));
    catalog.register(RawType::scalar("covenant.Double", ValueKind::Double));
    catalog.register(RawType::scalar("covenant.String", ValueKind::Str));
    catalog.register(RawType::scalar("covenant.Instant", ValueKind::Timestamp));
    catalog
}

/// `Adder(a: Int, b: Int)` with one annotated test method asserting that
/// addition agrees with itself.
pub fn register_adder(catalog: &mut TypeCatalog, seed: i64) {
    let mut ctor = struct_ctor("demo.Adder", &["a", "b"], vec![]);
    ctor.parameters = vec![
        Parameter::new("a", reference("covenant.Int")).annotated(AnnotationSet::of([
            Annotation::marker(names::INT_RANGE)
                .with("min", -1000i64)
                .with("max", 1000i64),
        ])),
        Parameter::new("b", reference("covenant.Int")).annotated(AnnotationSet::of([
            Annotation::marker(names::INT_RANGE)
                .with("min", -1000i64)
                .with("max", 1000i64),
        ])),
    ];
    catalog.register(
        RawType::class(
            "demo.Adder",
            RawClass {
                constructors: vec![ctor],
                methods: vec![method(
                    "sum",
                    vec![],
                    AnnotationSet::of([Annotation::marker(names::TEST)]),
                    AnnotationSet::empty(),
                    MethodBody::from_fn(|args| {
                        let a = field_long(&args[0], "a");
                        let b = field_long(&args[0], "b");
                        if a + b == a + b {
                            Ok(Value::Null)
                        } else {
                            Err(TargetFailure::assertion("addition disagrees with itself"))
                        }
                    }),
                )],
                ..RawClass::default()
            },
        )
        .annotated(AnnotationSet::of([
            Annotation::marker(names::COVENANT_TEST).with("seed", seed)
        ])),
    );
}

/// `Ops` contract: `ok(x: Int in [1,10]) -> @Positive Int`, with a
/// conforming and a violating implementation.
pub fn register_contract(catalog: &mut TypeCatalog, implementation_honors_contract: bool) {
    let contract_method = |body: MethodBody| {
        method(
            "ok",
            vec![Parameter::new("x", reference("covenant.Int")).annotated(
                AnnotationSet::of([Annotation::marker(names::INT_RANGE)
                    .with("min", 1i64)
                    .with("max", 10i64)]),
            )],
            AnnotationSet::empty(),
            AnnotationSet::of([Annotation::marker(names::POSITIVE)]),
            body,
        )
    };
    catalog.register(
        RawType::class(
            "demo.Ops",
            RawClass {
                methods: vec![contract_method(MethodBody::from_fn(|_| Ok(Value::Null)))],
                ..RawClass::default()
            },
        )
        .interface()
        .annotated(AnnotationSet::of([
            Annotation::marker(names::CONTRACT).with("seed", 42i64)
        ])),
    );

    let (name, body): (&str, MethodBody) = if implementation_honors_contract {
        (
            "demo.GoodOps",
            MethodBody::from_fn(|args| Ok(args[1].clone())),
        )
    } else {
        (
            "demo.BadOps",
            MethodBody::from_fn(|_| Ok(Value::Int(-1))),
        )
    };
    catalog.register(
        RawType::class(
            name,
            RawClass {
                constructors: vec![struct_ctor(name, &[], vec![])],
                methods: vec![contract_method(body)],
                ..RawClass::default()
            },
        )
        .implementing("demo.Ops"),
    );
}

/// Publisher that remembers every event it saw.
#[derive(Default)]
pub struct CollectingPublisher {
    pub events: Arc<Mutex<Vec<TestResultEvent>>>,
}

impl ResultPublisher for CollectingPublisher {
    fn name(&self) -> &str {
        "collecting"
    }

    fn publish(&self, event: &TestResultEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Wires discovery, the generator and the runner over a catalog, runs every
/// discovered spec and returns the outcome plus published events.
pub fn run_catalog(
    catalog: TypeCatalog,
    policy: ExecutionPolicy,
) -> (RunOutcome, Vec<TestResultEvent>) {
    let catalog = Arc::new(catalog);
    let discovery = DiscoveryService::new(Arc::clone(&catalog));
    let specs = discovery
        .discover(&DiscoveryPolicy::default(), names::CONTRACT)
        .expect("discovery should succeed");

    let session = Arc::new(ResolverSession::open(
        Arc::clone(&catalog) as Arc<dyn covenant_type_graph::SourceAdapter>
    ));
    let mocking: Arc<dyn MockingEngine> = Arc::new(OpaqueMockingEngine::new());
    let generator = Arc::new(FixtureGenerator::new(
        Arc::clone(&session),
        Arc::clone(&mocking),
        build_sealed_index(&catalog),
    ));

    let events = Arc::new(Mutex::new(Vec::new()));
    let publisher = Arc::new(BroadcastingPublisher::new(vec![Box::new(
        CollectingPublisher {
            events: Arc::clone(&events),
        },
    )]));

    let runner = MultiTargetRunner::new(
        specs,
        policy,
        session,
        generator,
        mocking,
        publisher,
    );
    let outcome = runner
        .run_collect(&TestFilterConfig::all())
        .expect("run should not fail to start");
    let events = events.lock().unwrap().clone();
    (outcome, events)
}

/// Policy rooted in a temp directory.
pub fn policy_at(root: &Path) -> ExecutionPolicy {
    let mut policy = ExecutionPolicy::default();
    policy.auditing.root = root.to_owned();
    policy.resources.parallelism = 2;
    policy
}

/// Reads a snapshot or journal file into lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}
