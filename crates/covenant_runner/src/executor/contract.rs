//! Contract-auto execution: verify an implementation against its contract
//! interface, method by method.

use std::collections::BTreeMap;

use covenant_type_graph::{Method, MethodKind, TypeId, TypeReference};

use crate::{
    error::{ConfigurationError, ScenarioError},
    executor::ScenarioExecutor,
    factory::EphemeralTestContext,
    result::{AssertionRecord, AssertionRule},
    spec_model::TestMode,
};

pub(super) fn execute(
    executor: &ScenarioExecutor,
    ctx: &EphemeralTestContext,
    contract: &str,
) -> Result<Vec<AssertionRecord>, ScenarioError> {
    let contract_descriptor = executor
        .generator()
        .session()
        .resolve(&TypeReference::by_name(TypeId::plain(contract)))
        .map_err(|error| {
            ScenarioError::Configuration(ConfigurationError::UnresolvableDependency {
                type_name: contract.to_owned(),
                detail: error.to_string(),
            })
        })?;

    // Bridge and synthetic members are not part of the contract surface.
    let mut declared: Vec<&Method> = contract_descriptor
        .methods()
        .iter()
        .filter(|method| method.kind != MethodKind::Synthetic)
        .collect();
    declared.sort_by(|a, b| a.name.cmp(&b.name));

    // Signature-keyed lookup on the implementation, built once.
    let implementations: BTreeMap<String, &Method> = ctx
        .target_descriptor
        .methods()
        .iter()
        .map(|method| (method.signature(), method))
        .collect();

    let namespace = TestMode::ContractAuto {
        contract: contract.to_owned(),
    };
    let mut gen_ctx = executor.generation_context(ctx);
    let mut records = Vec::new();

    for declared_method in declared {
        let signature = declared_method.signature();
        let Some(&implementation) = implementations.get(&signature) else {
            return Err(ScenarioError::Configuration(
                ConfigurationError::MissingContractMethod {
                    contract: contract.to_owned(),
                    signature,
                    type_name: ctx.target_descriptor.qualified_name().to_owned(),
                },
            ));
        };
        debug!(contract, method = %declared_method.name, "verifying contract method");

        // Arguments honor the contract's parameter constraints.
        let (args, rendered) = executor.build_arguments(
            ctx,
            &mut gen_ctx,
            namespace.namespace(),
            &declared_method.parameters,
        )?;
        for (parameter, argument) in declared_method.parameters.iter().zip(&args) {
            if let Err(violation) = executor
                .validator()
                .validate(&parameter.annotations, argument)
            {
                return Err(ScenarioError::Internal {
                    message: format!(
                        "generated argument `{}` violates its own contract: {}",
                        parameter.name, violation.message
                    ),
                    frames: Vec::new(),
                });
            }
        }

        let returned = executor.execute_with_recording(ctx, &signature, rendered, || {
            executor.invoke(implementation, &ctx.target_instance, &args)
        })?;

        // Return-position constraints; a violation escapes to the chain.
        executor
            .validator()
            .validate(&declared_method.return_annotations, &returned)?;

        let mut validated = false;
        for annotation in declared_method.return_annotations.iter() {
            validated = true;
            records.push(AssertionRecord::passed(
                AssertionRule::Annotation {
                    name: annotation.name.clone(),
                },
                format!("`{}` upheld on `{}`", annotation.name, declared_method.name),
            ));
        }
        if !validated {
            records.push(AssertionRecord::passed(
                AssertionRule::DefensiveCheck,
                format!("`{}` returned without violation", declared_method.name),
            ));
        }
    }
    Ok(records)
}
