//! The mocking engine port.
//!
//! The engine itself is an external collaborator; the core only consumes
//! this interface. Mocks are stateless stand-ins, fakes carry working state.
//! The engine receives the generation context so instance identity comes
//! from the seeded stream: repeated generation under one seed must hand out
//! the same instances, or determinism of the whole run breaks.

use covenant_type_graph::{TypeDescriptor, Value};

use crate::context::GenerationContext;

#[derive(Clone, Debug, thiserror::Error)]
#[error("mocking engine cannot instantiate `{type_id}`: {reason}")]
pub struct MockingError {
    pub type_id: String,
    pub reason: String,
}

impl MockingError {
    pub fn new(type_id: &str, reason: &str) -> Self {
        Self {
            type_id: type_id.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// What the core consumes from the mocking engine adapter.
pub trait MockingEngine: Send + Sync {
    /// A stateless stand-in for the given type.
    fn create_mock(
        &self,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<Value, MockingError>;

    /// A stateful fake for the given type.
    fn create_fake(
        &self,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<Value, MockingError>;
}

/// Minimal in-tree engine: hands out opaque instances whose tokens are
/// drawn from the context's seeded stream. Enough for dependency wiring and
/// the recursion fallback; behavior-bearing mocks come from a real adapter.
#[derive(Debug, Default)]
pub struct OpaqueMockingEngine;

impl OpaqueMockingEngine {
    pub fn new() -> Self {
        Self
    }

    fn next_instance(&self, descriptor: &TypeDescriptor, ctx: &mut GenerationContext) -> Value {
        Value::Opaque {
            type_id: descriptor.type_id().as_str().to_owned(),
            token: ctx.next_token(),
        }
    }
}

impl MockingEngine for OpaqueMockingEngine {
    fn create_mock(
        &self,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<Value, MockingError> {
        Ok(self.next_instance(descriptor, ctx))
    }

    fn create_fake(
        &self,
        descriptor: &TypeDescriptor,
        ctx: &mut GenerationContext,
    ) -> Result<Value, MockingError> {
        Ok(self.next_instance(descriptor, ctx))
    }
}
