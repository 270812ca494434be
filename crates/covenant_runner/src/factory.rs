//! The instance factory: builds the system under test and its dependency
//! graph, then resolves the entry point for the first declared mode.

use std::{collections::BTreeMap, sync::Arc};

use covenant_fixtures::{FixtureGenerator, GenerationContext, MockingEngine};
use covenant_trace::ScenarioTrace;
use covenant_type_graph::{
    names, AnnotatedElement, FrozenClock, Method, MethodKind, Parameter, ResolverSession,
    TypeDescriptor, TypeId, TypeReference, Value,
};

use crate::{
    error::ConfigurationError,
    spec_model::{MockingStrategy, TestMode, TestSpecification},
};

/// What the executor will drive for this test.
#[derive(Clone, Debug)]
pub enum EntryPoint {
    Method(Method),
    /// Data-compliance runs exercise the primary constructor itself.
    Constructor,
}

/// Everything one test execution needs. Lifetime: a single run.
#[derive(Debug)]
pub struct EphemeralTestContext {
    pub specification: TestSpecification,
    pub target_descriptor: Arc<TypeDescriptor>,
    pub target_instance: Value,
    /// One instance per dependency type: a diamond in the dependency graph
    /// collapses onto the same instance.
    pub dependencies: BTreeMap<String, Value>,
    pub entry_point: EntryPoint,
    pub trace: Arc<ScenarioTrace>,
}

pub struct InstanceFactory {
    session: Arc<ResolverSession>,
    generator: Arc<FixtureGenerator>,
    mocking: Arc<dyn MockingEngine>,
}

impl InstanceFactory {
    pub fn new(
        session: Arc<ResolverSession>,
        generator: Arc<FixtureGenerator>,
        mocking: Arc<dyn MockingEngine>,
    ) -> Self {
        Self {
            session,
            generator,
            mocking,
        }
    }

    /// Builds the ephemeral context for one spec. Failures here are fatal
    /// for the spec: the entry point is never invoked.
    pub fn create(
        &self,
        spec: &TestSpecification,
        clock: FrozenClock,
        seed: i64,
        trace: Arc<ScenarioTrace>,
    ) -> Result<EphemeralTestContext, ConfigurationError> {
        let mut gen_ctx = GenerationContext::new(seed, clock, Arc::clone(&trace));
        let mut dependencies = BTreeMap::new();

        let target_descriptor = self.resolve_descriptor(&spec.target.ty)?;
        let Some(constructor) = target_descriptor.primary_or_first_constructor() else {
            return Err(ConfigurationError::MissingPrimaryConstructor {
                type_name: target_descriptor.qualified_name().to_owned(),
            });
        };

        // The target's own constructor arguments are part of the forensic
        // record, keyed under the first mode's namespace.
        let namespace = spec.first_mode().namespace();
        gen_ctx.push_history(target_descriptor.type_id().clone());
        let args: Result<Vec<Value>, ConfigurationError> = (|| {
            let mut args = Vec::with_capacity(constructor.parameters.len());
            for parameter in &constructor.parameters {
                let value =
                    self.resolve_dependency(parameter, spec, &mut dependencies, &mut gen_ctx)?;
                trace.record_argument(
                    &format!("{namespace}.{}", parameter.name),
                    &value.render(),
                );
                args.push(value);
            }
            Ok(args)
        })();
        gen_ctx.pop_history();
        let target_instance = constructor.handle.invoke(&args?).map_err(|failure| {
            ConfigurationError::Setup {
                detail: format!(
                    "constructor of `{}` failed: {}",
                    target_descriptor.qualified_name(),
                    failure.message()
                ),
            }
        })?;
        let entry_point = self.resolve_entry_point(spec, &target_descriptor)?;

        Ok(EphemeralTestContext {
            specification: spec.clone(),
            target_descriptor,
            target_instance,
            dependencies,
            entry_point,
            trace,
        })
    }

    fn resolve_descriptor(
        &self,
        ty: &TypeReference,
    ) -> Result<Arc<TypeDescriptor>, ConfigurationError> {
        self.session
            .resolve(ty)
            .map_err(|error| ConfigurationError::UnresolvableDependency {
                type_name: ty.type_id().as_str().to_owned(),
                detail: error.to_string(),
            })
    }

    fn create_by_constructor(
        &self,
        ty: &TypeReference,
        spec: &TestSpecification,
        dependencies: &mut BTreeMap<String, Value>,
        gen_ctx: &mut GenerationContext,
    ) -> Result<Value, ConfigurationError> {
        let descriptor = self.resolve_descriptor(ty)?;
        let type_id = descriptor.type_id();
        if gen_ctx.in_history(type_id) {
            return Err(ConfigurationError::CircularDependency {
                path: gen_ctx.render_cycle(type_id),
            });
        }
        let Some(constructor) = descriptor.primary_or_first_constructor() else {
            // No constructor to call; a mock is the only way to provide it.
            return self.mock(&descriptor, gen_ctx);
        };

        gen_ctx.push_history(type_id.clone());
        let args: Result<Vec<Value>, ConfigurationError> = (|| {
            let mut args = Vec::with_capacity(constructor.parameters.len());
            for parameter in &constructor.parameters {
                args.push(self.resolve_dependency(parameter, spec, dependencies, gen_ctx)?);
            }
            Ok(args)
        })();
        gen_ctx.pop_history();

        constructor
            .handle
            .invoke(&args?)
            .map_err(|failure| ConfigurationError::Setup {
                detail: format!(
                    "constructor of `{}` failed: {}",
                    descriptor.qualified_name(),
                    failure.message()
                ),
            })
    }

    /// The recursion of the factory: cache, explicit strategy, then the
    /// value/constructor/mock fallback ladder.
    fn resolve_dependency(
        &self,
        parameter: &Parameter,
        spec: &TestSpecification,
        dependencies: &mut BTreeMap<String, Value>,
        gen_ctx: &mut GenerationContext,
    ) -> Result<Value, ConfigurationError> {
        let qualified_name = parameter.ty.type_id().qualified_name().to_owned();
        if let Some(cached) = dependencies.get(&qualified_name) {
            return Ok(cached.clone());
        }

        let descriptor = self.resolve_descriptor(&parameter.ty)?;
        let instance = match spec.dependency_for(&qualified_name).map(|d| &d.strategy) {
            Some(MockingStrategy::StatefulFake) => {
                self.mocking
                    .create_fake(&descriptor, gen_ctx)
                    .map_err(|error| ConfigurationError::UnresolvableDependency {
                        type_name: qualified_name.clone(),
                        detail: error.to_string(),
                    })?
            }
            Some(MockingStrategy::StatelessMock | MockingStrategy::Environment { .. }) => {
                self.mock(&descriptor, gen_ctx)?
            }
            Some(MockingStrategy::Real { implementation }) => {
                let implementation = TypeReference::by_name(TypeId::plain(implementation));
                self.create_by_constructor(&implementation, spec, dependencies, gen_ctx)?
            }
            None => {
                if descriptor.value_kind().is_some() {
                    let request = self
                        .generator
                        .request_for(&parameter.name, &parameter.ty, &parameter.annotations)
                        .map_err(ConfigurationError::from)?;
                    // Plain values are per-slot draws, not shared
                    // dependencies: two int parameters get two fixtures.
                    return self
                        .generator
                        .generate(&request, gen_ctx)
                        .map_err(ConfigurationError::from);
                } else if descriptor.primary_or_first_constructor().is_some() {
                    self.create_by_constructor(&parameter.ty, spec, dependencies, gen_ctx)?
                } else {
                    self.mock(&descriptor, gen_ctx)?
                }
            }
        };

        dependencies.insert(qualified_name, instance.clone());
        Ok(instance)
    }

    fn mock(
        &self,
        descriptor: &TypeDescriptor,
        gen_ctx: &mut GenerationContext,
    ) -> Result<Value, ConfigurationError> {
        self.mocking
            .create_mock(descriptor, gen_ctx)
            .map_err(|error| ConfigurationError::UnresolvableDependency {
                type_name: descriptor.qualified_name().to_owned(),
                detail: error.to_string(),
            })
    }

    /// Entry-point resolution per the spec's first mode.
    fn resolve_entry_point(
        &self,
        spec: &TestSpecification,
        target: &TypeDescriptor,
    ) -> Result<EntryPoint, ConfigurationError> {
        match spec.first_mode() {
            TestMode::UserScenario => {
                let mut annotated: Vec<&Method> = target
                    .methods()
                    .iter()
                    .filter(|method| method.has_annotation(names::TEST))
                    .collect();
                annotated.sort_by(|a, b| a.name.cmp(&b.name));
                if let Some(first) = annotated.first() {
                    return Ok(EntryPoint::Method((*first).clone()));
                }
                target
                    .methods()
                    .iter()
                    .find(|method| method.kind == MethodKind::Regular)
                    .map(|method| EntryPoint::Method(method.clone()))
                    .ok_or_else(|| ConfigurationError::NoEntryPoint {
                        type_name: target.qualified_name().to_owned(),
                    })
            }
            TestMode::ContractAuto { contract } => {
                let contract_descriptor =
                    self.resolve_descriptor(&TypeReference::by_name(TypeId::plain(contract)))?;
                let mut declared: Vec<&Method> = contract_descriptor
                    .methods()
                    .iter()
                    .filter(|method| method.kind != MethodKind::Synthetic)
                    .collect();
                declared.sort_by(|a, b| a.name.cmp(&b.name));
                let Some(first) = declared.first() else {
                    return Err(ConfigurationError::NoEntryPoint {
                        type_name: contract.clone(),
                    });
                };
                // Direct signature lookup on the implementation.
                let implementations: BTreeMap<String, &Method> = target
                    .methods()
                    .iter()
                    .map(|method| (method.signature(), method))
                    .collect();
                implementations
                    .get(&first.signature())
                    .map(|method| EntryPoint::Method((*method).clone()))
                    .ok_or_else(|| ConfigurationError::MissingContractMethod {
                        contract: contract.clone(),
                        signature: first.signature(),
                        type_name: target.qualified_name().to_owned(),
                    })
            }
            TestMode::DataCompliance { .. } => {
                if target.primary_or_first_constructor().is_some() {
                    Ok(EntryPoint::Constructor)
                } else {
                    target
                        .methods()
                        .iter()
                        .find(|method| method.kind == MethodKind::Standard)
                        .map(|method| EntryPoint::Method(method.clone()))
                        .ok_or_else(|| ConfigurationError::NoEntryPoint {
                            type_name: target.qualified_name().to_owned(),
                        })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use covenant_fixtures::{OpaqueMockingEngine, SealedIndex};
    use covenant_type_graph::{
        Annotation, AnnotationSet, Constructor, ConstructorHandle, MethodBody, RawClass, RawType,
        TypeCatalog, TypeId,
    };
    use uuid::Uuid;

    use crate::spec_model::{DependencyMetadata, DiscoveredTestTarget, EnvironmentKind};

    use super::*;

    fn struct_ctor(type_id: &str, fields: &[&str], parameters: Vec<Parameter>) -> Constructor {
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

    fn reference(name: &str) -> TypeReference {
        TypeReference::by_name(TypeId::plain(name))
    }

    /// demo.Svc(b: demo.B, c: demo.C); B(d: demo.D); C(d: demo.D);
    /// D is an interface with no impls, so it resolves to a mock.
    fn diamond_catalog() -> Arc<TypeCatalog> {
        let mut catalog = TypeCatalog::new();
        catalog.register(RawType::class("demo.D", RawClass::default()).interface());
        catalog.register(RawType::class(
            "demo.B",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.B",
                    &["d"],
                    vec![Parameter::new("d", reference("demo.D"))],
                )],
                ..RawClass::default()
            },
        ));
        catalog.register(RawType::class(
            "demo.C",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.C",
                    &["d"],
                    vec![Parameter::new("d", reference("demo.D"))],
                )],
                ..RawClass::default()
            },
        ));
        catalog.register(RawType::class(
            "demo.Svc",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.Svc",
                    &["b", "c"],
                    vec![
                        Parameter::new("b", reference("demo.B")),
                        Parameter::new("c", reference("demo.C")),
                    ],
                )],
                methods: vec![Method {
                    name: "run".into(),
                    kind: MethodKind::Regular,
                    parameters: vec![],
                    return_type: None,
                    annotations: AnnotationSet::of([Annotation::marker(names::TEST)]),
                    return_annotations: AnnotationSet::empty(),
                    body: MethodBody::from_fn(|_| Ok(Value::Null)),
                }],
                ..RawClass::default()
            },
        ));
        Arc::new(catalog)
    }

    fn factory(catalog: &Arc<TypeCatalog>) -> InstanceFactory {
        let session = Arc::new(ResolverSession::open(
            Arc::clone(catalog) as Arc<dyn covenant_type_graph::SourceAdapter>
        ));
        let mocking: Arc<dyn MockingEngine> = Arc::new(OpaqueMockingEngine::new());
        let generator = Arc::new(FixtureGenerator::new(
            Arc::clone(&session),
            Arc::clone(&mocking),
            SealedIndex::new(),
        ));
        InstanceFactory::new(session, generator, mocking)
    }

    fn spec(fqn: &str, dependencies: Vec<DependencyMetadata>) -> TestSpecification {
        TestSpecification::new(
            DiscoveredTestTarget {
                ty: reference(fqn),
                display_name: fqn.rsplit('.').next().unwrap_or(fqn).to_owned(),
                fully_qualified_name: fqn.to_owned(),
            },
            TestMode::UserScenario,
            dependencies,
            Some(1),
        )
    }

    #[test]
    fn diamond_dependencies_share_one_instance() {
        let catalog = diamond_catalog();
        let factory = factory(&catalog);
        let spec = spec(
            "demo.Svc",
            vec![
                DependencyMetadata {
                    name: "b".into(),
                    ty: reference("demo.B"),
                    strategy: MockingStrategy::Real {
                        implementation: "demo.B".into(),
                    },
                },
                DependencyMetadata {
                    name: "c".into(),
                    ty: reference("demo.C"),
                    strategy: MockingStrategy::Real {
                        implementation: "demo.C".into(),
                    },
                },
            ],
        );
        let ctx = factory
            .create(
                &spec,
                FrozenClock::freeze(),
                1,
                Arc::new(ScenarioTrace::new(Uuid::nil())),
            )
            .unwrap();

        let token_of = |outer: &str| -> u64 {
            let Value::Struct { fields, .. } = &ctx.target_instance else {
                panic!("target should be a struct");
            };
            let inner = &fields
                .iter()
                .find(|(name, _)| name == outer)
                .expect("field")
                .1;
            let Value::Struct { fields, .. } = inner else {
                panic!("inner should be a struct");
            };
            let Value::Opaque { token, .. } = &fields[0].1 else {
                panic!("d should be a mock");
            };
            *token
        };
        assert_eq!(token_of("b"), token_of("c"));
        assert!(ctx.dependencies.contains_key("demo.D"));
        assert!(matches!(ctx.entry_point, EntryPoint::Method(_)));
    }

    #[test]
    fn non_nullable_cycle_is_a_setup_failure_with_the_full_path() {
        let mut catalog = TypeCatalog::new();
        catalog.register(RawType::class(
            "demo.A",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.A",
                    &["b"],
                    vec![Parameter::new("b", reference("demo.B"))],
                )],
                ..RawClass::default()
            },
        ));
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
        let catalog = Arc::new(catalog);
        let factory = factory(&catalog);
        let spec = spec("demo.A", Vec::new());
        let error = factory
            .create(
                &spec,
                FrozenClock::freeze(),
                1,
                Arc::new(ScenarioTrace::new(Uuid::nil())),
            )
            .unwrap_err();
        match error {
            ConfigurationError::CircularDependency { path } => {
                assert_eq!(path, "A -> B -> A");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn environment_and_fake_strategies_use_the_engine() {
        let mut catalog = TypeCatalog::new();
        catalog.register(RawType::class("covenant.Clock", RawClass::default()));
        catalog.register(
            RawType::class("demo.Store", RawClass::default())
                .annotated(AnnotationSet::of([Annotation::marker(names::STATEFUL)])),
        );
        catalog.register(RawType::class(
            "demo.Timed",
            RawClass {
                constructors: vec![struct_ctor(
                    "demo.Timed",
                    &["clock", "store"],
                    vec![
                        Parameter::new("clock", reference("covenant.Clock")),
                        Parameter::new("store", reference("demo.Store")),
                    ],
                )],
                methods: vec![Method {
                    name: "tick".into(),
                    kind: MethodKind::Regular,
                    parameters: vec![],
                    return_type: None,
                    annotations: AnnotationSet::empty(),
                    return_annotations: AnnotationSet::empty(),
                    body: MethodBody::from_fn(|_| Ok(Value::Null)),
                }],
                ..RawClass::default()
            },
        ));
        let catalog = Arc::new(catalog);
        let factory = factory(&catalog);
        let spec = spec(
            "demo.Timed",
            vec![
                DependencyMetadata {
                    name: "clock".into(),
                    ty: reference("covenant.Clock"),
                    strategy: MockingStrategy::Environment {
                        kind: EnvironmentKind::Time,
                    },
                },
                DependencyMetadata {
                    name: "store".into(),
                    ty: reference("demo.Store"),
                    strategy: MockingStrategy::StatefulFake,
                },
            ],
        );
        let ctx = factory
            .create(
                &spec,
                FrozenClock::freeze(),
                1,
                Arc::new(ScenarioTrace::new(Uuid::nil())),
            )
            .unwrap();
        assert!(matches!(
            ctx.dependencies.get("covenant.Clock"),
            Some(Value::Opaque { .. })
        ));
        assert!(matches!(
            ctx.dependencies.get("demo.Store"),
            Some(Value::Opaque { .. })
        ));
    }
}
