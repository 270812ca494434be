//! Structural (object) strategy.

use covenant_type_graph::{TypeDescriptor, Value};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{GenerationStrategy, Regen},
};

/// Assembles class and record instances through their primary constructor,
/// tracking the DFS ancestor path for cycle detection.
pub struct StructuralStrategy;

impl GenerationStrategy for StructuralStrategy {
    fn name(&self) -> &'static str {
        "StructuralStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(&*request.descriptor, TypeDescriptor::Structural { .. })
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let descriptor = &request.descriptor;
        let type_id = descriptor.type_id();

        if ctx.in_history(type_id) {
            if request.is_nullable() {
                return Ok(Value::Null);
            }
            return Err(GenerationError::Recursive {
                type_id: type_id.as_str().to_owned(),
                path: ctx.render_cycle(type_id),
            });
        }

        // Interfaces and other constructor-less shapes are recoverable: the
        // dispatcher falls back to the mocking engine.
        let constructor = descriptor.primary_or_first_constructor().ok_or_else(|| {
            GenerationError::Unconstructible {
                type_id: type_id.as_str().to_owned(),
            }
        })?;

        ctx.push_history(type_id.clone());
        let assembled = (|| {
            let mut args = Vec::with_capacity(constructor.parameters.len());
            for parameter in &constructor.parameters {
                let child = regen.child(&parameter.name, &parameter.ty, &parameter.annotations)?;
                args.push(regen.produce(&child, ctx)?);
            }
            Ok(args)
        })();
        ctx.pop_history();

        let args = assembled?;
        constructor
            .handle
            .invoke(&args)
            .map_err(|failure| GenerationError::ConstructorFailed {
                type_id: type_id.as_str().to_owned(),
                message: failure.message().to_owned(),
            })
    }

    fn edge_cases(
        &self,
        _request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        // Structural boundaries are the boundaries of the parts; the
        // dispatcher's fallback sample covers the whole.
        Vec::new()
    }

    fn invalid(
        &self,
        _request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        Vec::new()
    }
}
