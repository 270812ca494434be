//! Discovery: scans the catalog for contract interfaces, annotated test
//! targets and data classes, infers dependency strategies, and assembles
//! merged specifications.

use std::{collections::BTreeSet, sync::Arc};

use covenant_fixtures::SealedIndex;
use covenant_type_graph::{
    names, AnnotationValue, RawShape, RawType, TypeCatalog, CLOCK_TYPE_NAME,
};

use crate::{
    error::ConfigurationError,
    spec_model::{
        merge_specifications, DependencyMetadata, DiscoveredTestTarget, EnvironmentKind,
        MockingStrategy, TestMode, TestSpecification,
    },
};

/// Which part of the catalog is scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanScope {
    All,
    Packages(BTreeSet<String>),
    Types(BTreeSet<String>),
}

impl ScanScope {
    pub fn admits(&self, qualified_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Packages(packages) => packages.iter().any(|package| {
                qualified_name
                    .strip_prefix(package.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            }),
            Self::Types(types) => types.contains(qualified_name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiscoveryPolicy {
    pub scope: ScanScope,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            scope: ScanScope::All,
        }
    }
}

/// Builds the polymorphic candidate index the sealed strategy consumes:
/// every scanned interface or abstract type with at least one concrete
/// implementation is linked to its candidates.
pub fn build_sealed_index(catalog: &TypeCatalog) -> SealedIndex {
    let mut index = SealedIndex::new();
    for raw in catalog.iter() {
        if !raw.is_interface && !raw.is_abstract {
            continue;
        }
        let implementations = catalog.implementations_of(&raw.qualified_name);
        if implementations.is_empty() {
            continue;
        }
        index.link(
            &raw.qualified_name,
            implementations
                .iter()
                .map(|implementation| catalog.reference(&implementation.qualified_name))
                .collect(),
        );
    }
    index
}

/// The discovery service. Scanning walks the whole catalog, so hosts
/// driving it from async code should use [`DiscoveryService::discover_async`]
/// which moves the walk onto a blocking-capable thread.
pub struct DiscoveryService {
    catalog: Arc<TypeCatalog>,
}

impl DiscoveryService {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    /// Discovers every specification within the policy's scope.
    pub fn discover(
        &self,
        policy: &DiscoveryPolicy,
        contract_marker: &str,
    ) -> Result<Vec<TestSpecification>, ConfigurationError> {
        let mut specs = Vec::new();

        // Contract-auto: one spec per implementation of a marked interface.
        for raw in self.scanned(policy) {
            if !raw.is_interface || !raw.annotations.has(contract_marker) {
                continue;
            }
            let seed = annotation_seed(raw, contract_marker);
            for implementation in self.catalog.implementations_of(&raw.qualified_name) {
                if !policy.scope.admits(&implementation.qualified_name) {
                    continue;
                }
                specs.push(self.spec_for(
                    implementation,
                    TestMode::ContractAuto {
                        contract: raw.qualified_name.clone(),
                    },
                    seed,
                )?);
            }
        }

        // Manual: annotated test classes.
        for raw in self.scanned(policy) {
            if raw.annotations.has(names::COVENANT_TEST) {
                let seed = annotation_seed(raw, names::COVENANT_TEST);
                specs.push(self.spec_for(raw, TestMode::UserScenario, seed)?);
            }
        }

        // Data-compliance: annotated data classes.
        for raw in self.scanned(policy) {
            if raw.annotations.has(names::DATA_CONTRACT) {
                let seed = annotation_seed(raw, names::DATA_CONTRACT);
                specs.push(self.spec_for(
                    raw,
                    TestMode::DataCompliance {
                        data_class: raw.qualified_name.clone(),
                    },
                    seed,
                )?);
            }
        }

        debug!(count = specs.len(), "discovered specifications");
        merge_specifications(specs)
    }

    /// Same as [`discover`](Self::discover), off the async runtime.
    pub async fn discover_async(
        self: Arc<Self>,
        policy: DiscoveryPolicy,
        contract_marker: String,
    ) -> Result<Vec<TestSpecification>, ConfigurationError> {
        tokio::task::spawn_blocking(move || self.discover(&policy, &contract_marker))
            .await
            .map_err(|join_error| ConfigurationError::Setup {
                detail: format!("discovery task failed: {join_error}"),
            })?
    }

    fn scanned<'a>(&'a self, policy: &'a DiscoveryPolicy) -> impl Iterator<Item = &'a RawType> {
        self.catalog
            .iter()
            .filter(move |raw| policy.scope.admits(&raw.qualified_name))
    }

    fn spec_for(
        &self,
        raw: &RawType,
        mode: TestMode,
        seed: Option<i64>,
    ) -> Result<TestSpecification, ConfigurationError> {
        let target = self.validated_target(raw)?;
        let required_dependencies = self.infer_dependencies(raw)?;
        Ok(TestSpecification::new(
            target,
            mode,
            required_dependencies,
            seed,
        ))
    }

    /// Anonymous and local classes cannot be targets; neither can classes
    /// without a primary constructor.
    fn validated_target(&self, raw: &RawType) -> Result<DiscoveredTestTarget, ConfigurationError> {
        if raw.qualified_name.is_empty() {
            return Err(ConfigurationError::AnonymousTarget {
                detail: "empty qualified name".to_owned(),
            });
        }
        if raw.qualified_name.contains('$') {
            return Err(ConfigurationError::AnonymousTarget {
                detail: format!("`{}` is local or anonymous", raw.qualified_name),
            });
        }
        if let RawShape::Class(class) = &raw.shape {
            if class.constructors.is_empty() {
                return Err(ConfigurationError::MissingPrimaryConstructor {
                    type_name: raw.qualified_name.clone(),
                });
            }
        }
        Ok(DiscoveredTestTarget {
            ty: self.catalog.reference(&raw.qualified_name),
            display_name: raw.simple_name.clone(),
            fully_qualified_name: raw.qualified_name.clone(),
        })
    }

    /// Per-parameter strategy inference over the primary constructor.
    fn infer_dependencies(
        &self,
        raw: &RawType,
    ) -> Result<Vec<DependencyMetadata>, ConfigurationError> {
        let RawShape::Class(class) = &raw.shape else {
            return Ok(Vec::new());
        };
        let constructor = class
            .constructors
            .iter()
            .find(|ctor| ctor.primary)
            .or_else(|| class.constructors.first());
        let Some(constructor) = constructor else {
            return Ok(Vec::new());
        };

        let mut dependencies = Vec::new();
        for parameter in &constructor.parameters {
            let qualified_name = parameter.ty.type_id().qualified_name().to_owned();
            let Some(strategy) = self.strategy_for(&qualified_name)? else {
                continue;
            };
            dependencies.push(DependencyMetadata {
                name: parameter.name.clone(),
                ty: parameter.ty.clone(),
                strategy,
            });
        }
        Ok(dependencies)
    }

    /// `None` means the parameter is a plain value slot: it gets a fixture,
    /// not a dependency.
    fn strategy_for(
        &self,
        qualified_name: &str,
    ) -> Result<Option<MockingStrategy>, ConfigurationError> {
        if qualified_name == CLOCK_TYPE_NAME {
            return Ok(Some(MockingStrategy::Environment {
                kind: EnvironmentKind::Time,
            }));
        }
        let raw = self.catalog.get(qualified_name).ok_or_else(|| {
            ConfigurationError::UnresolvableDependency {
                type_name: qualified_name.to_owned(),
                detail: "not registered in the scan catalog".to_owned(),
            }
        })?;
        if matches!(raw.shape, RawShape::Scalar(_) | RawShape::Array { .. }) {
            return Ok(None);
        }
        if raw.annotations.has(names::STATEFUL) {
            return Ok(Some(MockingStrategy::StatefulFake));
        }
        if raw.is_interface || raw.is_abstract {
            let implementations = self.catalog.implementations_of(qualified_name);
            return Ok(Some(match implementations.first() {
                // Deterministic: implementations come back in qualified-name
                // order.
                Some(first) => MockingStrategy::Real {
                    implementation: first.qualified_name.clone(),
                },
                None => MockingStrategy::StatelessMock,
            }));
        }
        if let Some(attrs) = raw.annotations.attributes(names::CONTRACT) {
            if let Some(implementation) = attrs
                .get("implementingClass")
                .and_then(AnnotationValue::as_str)
            {
                return Ok(Some(MockingStrategy::Real {
                    implementation: implementation.to_owned(),
                }));
            }
        }
        Ok(Some(MockingStrategy::Real {
            implementation: qualified_name.to_owned(),
        }))
    }
}

fn annotation_seed(raw: &RawType, annotation: &str) -> Option<i64> {
    raw.annotations
        .attributes(annotation)?
        .get("seed")?
        .as_long()
}

#[cfg(test)]
mod tests {
    use covenant_type_graph::{
        Annotation, AnnotationSet, Constructor, ConstructorHandle, Parameter, RawClass, TypeId,
        TypeReference, Value, ValueKind,
    };

    use super::*;

    fn reference(qualified_name: &str) -> TypeReference {
        TypeReference::by_name(TypeId::plain(qualified_name))
    }

    fn noop_constructor(parameters: Vec<Parameter>) -> Constructor {
        Constructor {
            primary: true,
            parameters,
            handle: ConstructorHandle::new(|_| Ok(Value::Null)),
        }
    }

    fn catalog() -> Arc<TypeCatalog> {
        let mut catalog = TypeCatalog::new();
        catalog.register(RawType::scalar("covenant.Int", ValueKind::Int));

        catalog.register(
            RawType::class("demo.Ops", RawClass::default())
                .interface()
                .annotated(AnnotationSet::of([
                    Annotation::marker(names::CONTRACT).with("seed", 7i64)
                ])),
        );
        catalog.register(RawType::class(
            "demo.OpsImpl",
            RawClass {
                constructors: vec![noop_constructor(vec![])],
                ..RawClass::default()
            },
        )
        .implementing("demo.Ops"));

        catalog.register(RawType::class(
            "demo.Repo",
            RawClass::default(),
        )
        .interface());

        catalog.register(
            RawType::class(
                "demo.Service",
                RawClass {
                    constructors: vec![noop_constructor(vec![
                        Parameter::new("clock", reference(CLOCK_TYPE_NAME)),
                        Parameter::new("ops", reference("demo.Ops")),
                        Parameter::new("repo", reference("demo.Repo")),
                        Parameter::new("n", reference("covenant.Int")),
                    ])],
                    ..RawClass::default()
                },
            )
            .annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
        );
        Arc::new(catalog)
    }

    #[test]
    fn emits_contract_and_user_specs() {
        let service = DiscoveryService::new(catalog());
        let specs = service
            .discover(&DiscoveryPolicy::default(), names::CONTRACT)
            .unwrap();
        let by_name: Vec<&str> = specs
            .iter()
            .map(|spec| spec.target.fully_qualified_name.as_str())
            .collect();
        assert_eq!(by_name, vec!["demo.OpsImpl", "demo.Service"]);
        assert_eq!(
            specs[0].modes.first().unwrap(),
            &TestMode::ContractAuto {
                contract: "demo.Ops".into()
            }
        );
        // Seed from the contract interface annotation.
        assert_eq!(specs[0].seed, Some(7));
    }

    #[test]
    fn infers_strategies_per_constructor_parameter() {
        let service = DiscoveryService::new(catalog());
        let specs = service
            .discover(&DiscoveryPolicy::default(), names::CONTRACT)
            .unwrap();
        let service_spec = specs
            .iter()
            .find(|spec| spec.target.fully_qualified_name == "demo.Service")
            .unwrap();
        let strategies: Vec<&MockingStrategy> = service_spec
            .required_dependencies
            .iter()
            .map(|dependency| &dependency.strategy)
            .collect();
        assert_eq!(
            strategies,
            vec![
                &MockingStrategy::Environment {
                    kind: EnvironmentKind::Time
                },
                &MockingStrategy::Real {
                    implementation: "demo.OpsImpl".into()
                },
                &MockingStrategy::StatelessMock,
            ]
        );
        // The plain int slot is a fixture, not a dependency.
        assert!(service_spec
            .required_dependencies
            .iter()
            .all(|dependency| dependency.name != "n"));
    }

    #[test]
    fn scope_narrows_the_scan() {
        let service = DiscoveryService::new(catalog());
        let policy = DiscoveryPolicy {
            scope: ScanScope::Packages(["nope".to_owned()].into()),
        };
        let specs = service.discover(&policy, names::CONTRACT).unwrap();
        assert!(specs.is_empty());
    }

    #[test]
    fn sealed_index_links_only_implemented_interfaces() {
        let catalog = catalog();
        let index = build_sealed_index(&catalog);
        assert!(index.contains("demo.Ops"));
        assert!(!index.contains("demo.Repo"));
        assert_eq!(index.candidates_of("demo.Ops").len(), 1);
    }

    #[test]
    fn rejects_local_classes_and_missing_constructors() {
        let mut raw_catalog = TypeCatalog::new();
        raw_catalog.register(
            RawType::class("demo.Outer$1", RawClass::default())
                .annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
        );
        let service = DiscoveryService::new(Arc::new(raw_catalog));
        let error = service
            .discover(&DiscoveryPolicy::default(), names::CONTRACT)
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::AnonymousTarget { .. }));

        let mut raw_catalog = TypeCatalog::new();
        raw_catalog.register(
            RawType::class("demo.NoCtor", RawClass::default())
                .annotated(AnnotationSet::of([Annotation::marker(names::COVENANT_TEST)])),
        );
        let service = DiscoveryService::new(Arc::new(raw_catalog));
        let error = service
            .discover(&DiscoveryPolicy::default(), names::CONTRACT)
            .unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::MissingPrimaryConstructor { .. }
        ));
    }
}
