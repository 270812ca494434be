//! User-scenario execution: the target's own test methods.

use covenant_type_graph::{names, Method};

use crate::{
    error::ScenarioError,
    executor::{annotated_methods, ScenarioExecutor},
    factory::{EntryPoint, EphemeralTestContext},
    result::{AssertionRecord, AssertionRule},
    spec_model::TestMode,
};

pub(super) fn execute(
    executor: &ScenarioExecutor,
    ctx: &EphemeralTestContext,
) -> Result<Vec<AssertionRecord>, ScenarioError> {
    let annotated = annotated_methods(ctx.target_descriptor.methods(), names::TEST);
    let fallback;
    let methods: Vec<&Method> = if annotated.is_empty() {
        // No annotated tests: drive the resolved entry point.
        match &ctx.entry_point {
            EntryPoint::Method(method) => {
                fallback = method.clone();
                vec![&fallback]
            }
            EntryPoint::Constructor => Vec::new(),
        }
    } else {
        annotated
    };

    let mut gen_ctx = executor.generation_context(ctx);
    let mut records = Vec::new();
    for method in methods {
        debug!(method = %method.name, "running user scenario");
        let (args, rendered) = executor.build_arguments(
            ctx,
            &mut gen_ctx,
            TestMode::UserScenario.namespace(),
            &method.parameters,
        )?;
        // Failures propagate and are translated by the interceptor chain.
        executor.execute_with_recording(ctx, &method.signature(), rendered, || {
            executor.invoke(method, &ctx.target_instance, &args)
        })?;
        records.push(AssertionRecord::passed(
            AssertionRule::StandardAssertion,
            format!("`{}` completed without failure", method.name),
        ));
    }
    Ok(records)
}
