//! The immutable test blueprint.

use std::collections::BTreeSet;

use covenant_type_graph::TypeReference;

use crate::error::ConfigurationError;

/// The kind of test to run for a target.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestMode {
    /// User-declared test methods.
    UserScenario,
    /// Contract-interface verification against an implementation.
    ContractAuto { contract: String },
    /// Data-class compliance checks.
    DataCompliance { data_class: String },
}

impl TestMode {
    /// Argument namespace prefix for this mode.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::UserScenario => "user",
            Self::ContractAuto { .. } => "contract",
            Self::DataCompliance { .. } => "data",
        }
    }
}

/// How a constructor dependency is satisfied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockingStrategy {
    StatelessMock,
    StatefulFake,
    /// Environment-provided resource.
    Environment { kind: EnvironmentKind },
    /// A real instance of the named implementation.
    Real { implementation: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvironmentKind {
    Time,
}

/// One required dependency of the target.
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyMetadata {
    pub name: String,
    pub ty: TypeReference,
    pub strategy: MockingStrategy,
}

/// A discovered target. The fully qualified name is never empty; anonymous
/// and local targets are rejected during discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredTestTarget {
    pub ty: TypeReference,
    pub display_name: String,
    pub fully_qualified_name: String,
}

/// The immutable blueprint of a single test target.
#[derive(Clone, Debug, PartialEq)]
pub struct TestSpecification {
    pub target: DiscoveredTestTarget,
    pub modes: BTreeSet<TestMode>,
    pub required_dependencies: Vec<DependencyMetadata>,
    pub seed: Option<i64>,
}

impl TestSpecification {
    pub fn new(
        target: DiscoveredTestTarget,
        mode: TestMode,
        required_dependencies: Vec<DependencyMetadata>,
        seed: Option<i64>,
    ) -> Self {
        Self {
            target,
            modes: BTreeSet::from([mode]),
            required_dependencies,
            seed,
        }
    }

    /// The first mode in canonical order; drives entry-point resolution.
    pub fn first_mode(&self) -> &TestMode {
        self.modes.first().expect("a spec always has a mode")
    }

    pub fn dependency_for(&self, qualified_name: &str) -> Option<&DependencyMetadata> {
        self.required_dependencies
            .iter()
            .find(|dependency| dependency.ty.type_id().qualified_name() == qualified_name)
    }
}

/// Merges per-mode specs that share a target FQN: modes are unioned, the
/// seed is the first non-null in input order, and the dependency lists must
/// be identical. Input order across different targets is preserved.
pub fn merge_specifications(
    specs: Vec<TestSpecification>,
) -> Result<Vec<TestSpecification>, ConfigurationError> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: Vec<TestSpecification> = Vec::new();

    for spec in specs {
        let fqn = spec.target.fully_qualified_name.clone();
        match order.iter().position(|existing| *existing == fqn) {
            None => {
                order.push(fqn);
                merged.push(spec);
            }
            Some(index) => {
                let existing = &mut merged[index];
                if existing.required_dependencies != spec.required_dependencies {
                    return Err(ConfigurationError::SpecMergeConflict {
                        target: fqn,
                        detail: "dependency lists differ between modes".to_owned(),
                    });
                }
                existing.modes.extend(spec.modes);
                if existing.seed.is_none() {
                    existing.seed = spec.seed;
                }
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use covenant_type_graph::TypeId;

    use super::*;

    fn target(fqn: &str) -> DiscoveredTestTarget {
        DiscoveredTestTarget {
            ty: TypeReference::by_name(TypeId::plain(fqn)),
            display_name: fqn.rsplit('.').next().unwrap_or(fqn).to_owned(),
            fully_qualified_name: fqn.to_owned(),
        }
    }

    fn spec(fqn: &str, mode: TestMode, seed: Option<i64>) -> TestSpecification {
        TestSpecification::new(target(fqn), mode, Vec::new(), seed)
    }

    #[test]
    fn merges_modes_and_takes_first_non_null_seed() {
        let merged = merge_specifications(vec![
            spec("demo.X", TestMode::UserScenario, None),
            spec(
                "demo.X",
                TestMode::ContractAuto {
                    contract: "demo.Ops".into(),
                },
                Some(7),
            ),
        ])
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].modes.len(), 2);
        assert_eq!(merged[0].seed, Some(7));
    }

    #[test]
    fn merge_is_permutation_insensitive() {
        let forward = merge_specifications(vec![
            spec("demo.X", TestMode::UserScenario, None),
            spec(
                "demo.X",
                TestMode::ContractAuto {
                    contract: "demo.Ops".into(),
                },
                Some(7),
            ),
            spec("demo.Y", TestMode::UserScenario, None),
        ])
        .unwrap();
        let backward = merge_specifications(vec![
            spec(
                "demo.X",
                TestMode::ContractAuto {
                    contract: "demo.Ops".into(),
                },
                Some(7),
            ),
            spec("demo.Y", TestMode::UserScenario, None),
            spec("demo.X", TestMode::UserScenario, None),
        ])
        .unwrap();
        let key = |specs: &[TestSpecification]| {
            let mut summary: Vec<(String, Vec<TestMode>, Option<i64>)> = specs
                .iter()
                .map(|spec| {
                    (
                        spec.target.fully_qualified_name.clone(),
                        spec.modes.iter().cloned().collect(),
                        spec.seed,
                    )
                })
                .collect();
            summary.sort();
            summary
        };
        assert_eq!(key(&forward), key(&backward));
    }

    #[test]
    fn divergent_dependencies_fail_loudly() {
        let mut left = spec("demo.X", TestMode::UserScenario, None);
        left.required_dependencies.push(DependencyMetadata {
            name: "clock".into(),
            ty: TypeReference::by_name(TypeId::plain("covenant.Clock")),
            strategy: MockingStrategy::Environment {
                kind: EnvironmentKind::Time,
            },
        });
        let right = spec(
            "demo.X",
            TestMode::ContractAuto {
                contract: "demo.Ops".into(),
            },
            None,
        );
        let error = merge_specifications(vec![left, right]).unwrap_err();
        assert!(matches!(
            error,
            ConfigurationError::SpecMergeConflict { .. }
        ));
    }
}
