//! Terminal strategies for booleans, uuids and enums.

use covenant_type_graph::{names, Value, ValueKind};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{GenerationStrategy, Regen},
};

pub struct BoolStrategy;

impl GenerationStrategy for BoolStrategy {
    fn name(&self) -> &'static str {
        "BoolStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Bool))
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        if request.annotations.has(names::ASSERT_TRUE) {
            return Ok(Value::Bool(true));
        }
        if request.annotations.has(names::ASSERT_FALSE) {
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(ctx.chance(0.5)))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        if request.annotations.has(names::ASSERT_TRUE) {
            vec![Value::Bool(true)]
        } else if request.annotations.has(names::ASSERT_FALSE) {
            vec![Value::Bool(false)]
        } else {
            vec![Value::Bool(false), Value::Bool(true)]
        }
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        if request.annotations.has(names::ASSERT_TRUE) {
            vec![Value::Bool(false)]
        } else if request.annotations.has(names::ASSERT_FALSE) {
            vec![Value::Bool(true)]
        } else {
            Vec::new()
        }
    }
}

pub struct UuidStrategy;

impl GenerationStrategy for UuidStrategy {
    fn name(&self) -> &'static str {
        "UuidStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(request.descriptor.value_kind(), Some(ValueKind::Uuid))
    }

    fn generate(
        &self,
        _request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        Ok(Value::Uuid(ctx.next_uuid()))
    }

    fn edge_cases(
        &self,
        _request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        vec![Value::Uuid(uuid::Uuid::nil()), Value::Uuid(uuid::Uuid::max())]
    }

    fn invalid(
        &self,
        _request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        // Every well-formed uuid is a valid uuid; invalidity only exists at
        // the nullability level, which the dispatcher injects.
        Vec::new()
    }
}

pub struct EnumStrategy;

impl EnumStrategy {
    fn variants(request: &GenerationRequest) -> Vec<String> {
        match request.descriptor.value_kind() {
            Some(ValueKind::Enum { variants }) => variants.clone(),
            _ => Vec::new(),
        }
    }

    fn instance(request: &GenerationRequest, variant: &str) -> Value {
        Value::Enum {
            type_id: request.type_id_str().to_owned(),
            variant: variant.to_owned(),
        }
    }
}

impl GenerationStrategy for EnumStrategy {
    fn name(&self) -> &'static str {
        "EnumStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        matches!(
            request.descriptor.value_kind(),
            Some(ValueKind::Enum { .. })
        )
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let variants = Self::variants(request);
        if variants.is_empty() {
            return Err(GenerationError::NoStrategy {
                subject: request.name.clone(),
                type_id: request.type_id_str().to_owned(),
            });
        }
        let pick = ctx.pick_index(variants.len());
        Ok(Self::instance(request, &variants[pick]))
    }

    fn edge_cases(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let variants = Self::variants(request);
        let mut edges = Vec::new();
        if let Some(first) = variants.first() {
            edges.push(Self::instance(request, first));
        }
        if let Some(last) = variants.last() {
            if variants.len() > 1 {
                edges.push(Self::instance(request, last));
            }
        }
        edges
    }

    fn invalid(
        &self,
        request: &GenerationRequest,
        _ctx: &mut GenerationContext,
        _regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        vec![Self::instance(request, "UNKNOWN_VARIANT")]
    }
}
