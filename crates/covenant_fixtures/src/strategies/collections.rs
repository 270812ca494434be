//! Container, map and array strategies.
//!
//! These produce the shell and delegate element production to the
//! regenerator, so element constraints, cycle policy and design recording
//! stay uniform with every other slot.

use covenant_type_graph::{AnnotationSet, TypeDescriptor, Value};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{GenerationStrategy, Regen},
};

/// Upper element count used when no `Size` annotation narrows it.
pub const DEFAULT_MAX_ELEMENTS: usize = 8;

fn size_bounds(request: &GenerationRequest) -> (usize, usize) {
    let declared = request.annotations.size();
    let min = declared.map(|size| size.min.max(0) as usize).unwrap_or(0);
    let max = declared
        .map(|size| size.max.clamp(min as i64, 1 << 16) as usize)
        .unwrap_or(DEFAULT_MAX_ELEMENTS.max(min));
    (min, max)
}

fn draw_len(request: &GenerationRequest, ctx: &mut GenerationContext) -> usize {
    let (min, max) = size_bounds(request);
    ctx.next_long_inclusive(min as i64, max as i64) as usize
}

pub struct ContainerStrategy;

impl GenerationStrategy for ContainerStrategy {
    fn name(&self) -> &'static str {
        "ContainerStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(&*request.descriptor, TypeDescriptor::Container { .. })
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let TypeDescriptor::Container { element, .. } = &*request.descriptor else {
            unreachable!("guarded by supports");
        };
        let len = draw_len(request, ctx);
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let child = regen.child(
                &format!("{}[{index}]", request.name),
                element,
                &AnnotationSet::empty(),
            )?;
            items.push(regen.produce(&child, ctx)?);
        }
        Ok(Value::List(items))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, _) = size_bounds(request);
        if min == 0 {
            vec![Value::List(Vec::new())]
        } else {
            Vec::new()
        }
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, _) = size_bounds(request);
        if min > 0 {
            // One element short of the declared minimum.
            vec![Value::List(Vec::new())]
        } else {
            Vec::new()
        }
    }
}

pub struct MapStrategy;

impl GenerationStrategy for MapStrategy {
    fn name(&self) -> &'static str {
        "MapStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(&*request.descriptor, TypeDescriptor::MapType { .. })
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let TypeDescriptor::MapType { key, value, .. } = &*request.descriptor else {
            unreachable!("guarded by supports");
        };
        let len = draw_len(request, ctx);
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(len);
        for index in 0..len {
            let key_request = regen.child(
                &format!("{}<key {index}>", request.name),
                key,
                &AnnotationSet::empty(),
            )?;
            let value_request = regen.child(
                &format!("{}[{index}]", request.name),
                value,
                &AnnotationSet::empty(),
            )?;
            let drawn_key = regen.produce(&key_request, ctx)?;
            // Key collisions shrink the map below the drawn size; keep the
            // first entry for a stable result.
            if entries
                .iter()
                .any(|(existing, _)| existing.render() == drawn_key.render())
            {
                continue;
            }
            let drawn_value = regen.produce(&value_request, ctx)?;
            entries.push((drawn_key, drawn_value));
        }
        Ok(Value::Map(entries))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, _) = size_bounds(request);
        if min == 0 {
            vec![Value::Map(Vec::new())]
        } else {
            Vec::new()
        }
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let (min, _) = size_bounds(request);
        if min > 0 {
            vec![Value::Map(Vec::new())]
        } else {
            Vec::new()
        }
    }
}

pub struct ArrayStrategy;

impl GenerationStrategy for ArrayStrategy {
    fn name(&self) -> &'static str {
        "ArrayStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(&*request.descriptor, TypeDescriptor::ArrayType { .. })
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let TypeDescriptor::ArrayType {
            component,
            allocator,
            ..
        } = &*request.descriptor
        else {
            unreachable!("guarded by supports");
        };
        let len = draw_len(request, ctx);
        let mut array = allocator.instantiate(len);
        for index in 0..len {
            let child = regen.child(
                &format!("{}[{index}]", request.name),
                component,
                &AnnotationSet::empty(),
            )?;
            let element = regen.produce(&child, ctx)?;
            allocator.set(&mut array, index, element);
        }
        Ok(array)
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let TypeDescriptor::ArrayType { allocator, .. } = &*request.descriptor else {
            return Vec::new();
        };
        let (min, _) = size_bounds(request);
        if min == 0 {
            vec![allocator.instantiate(0)]
        } else {
            Vec::new()
        }
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let TypeDescriptor::ArrayType { allocator, .. } = &*request.descriptor else {
            return Vec::new();
        };
        let (min, _) = size_bounds(request);
        if min > 0 {
            vec![allocator.instantiate(min - 1)]
        } else {
            Vec::new()
        }
    }
}
