//! The strategy registry.
//!
//! Selection is first-match over a fixed priority order, so dispatch is
//! deterministic for any request. Terminal strategies produce a leaf value in
//! one call; recursive strategies ask the [`Regenerator`] for children.

use std::collections::BTreeSet;

use covenant_type_graph::{AnnotationSet, TypeReference, Value};

use crate::{context::GenerationContext, error::GenerationError, request::GenerationRequest};

mod collections;
pub use collections::{ArrayStrategy, ContainerStrategy, MapStrategy, DEFAULT_MAX_ELEMENTS};

mod numeric;
pub use numeric::{DecimalStrategy, DoubleStrategy, IntStrategy, LongStrategy};

mod sealed;
pub use sealed::{SealedIndex, SealedStrategy};

mod simple;
pub use simple::{BoolStrategy, EnumStrategy, UuidStrategy};

mod string;
pub use string::{StringStrategy, PHYSICAL_STRING_LIMIT};

mod structural;
pub use structural::StructuralStrategy;

mod time;
pub use time::TimeStrategy;

/// Callbacks through which a recursive strategy requests children from the
/// dispatcher. Going back through the dispatcher keeps validation, cycle
/// policy and design recording uniform at every depth.
pub struct Regenerator<'a> {
    produce_fn:
        &'a dyn Fn(&GenerationRequest, &mut GenerationContext) -> Result<Value, GenerationError>,
    child_fn: &'a dyn Fn(
        &str,
        &TypeReference,
        &AnnotationSet,
    ) -> Result<GenerationRequest, GenerationError>,
    invalid_fn: &'a dyn Fn(&GenerationRequest, &mut GenerationContext) -> Vec<Value>,
}

impl<'a> Regenerator<'a> {
    pub fn new(
        produce_fn: &'a dyn Fn(
            &GenerationRequest,
            &mut GenerationContext,
        ) -> Result<Value, GenerationError>,
        child_fn: &'a dyn Fn(
            &str,
            &TypeReference,
            &AnnotationSet,
        ) -> Result<GenerationRequest, GenerationError>,
        invalid_fn: &'a dyn Fn(&GenerationRequest, &mut GenerationContext) -> Vec<Value>,
    ) -> Self {
        Self {
            produce_fn,
            child_fn,
            invalid_fn,
        }
    }

    /// Builds a child request, resolving the lazy type edge. `overlay`
    /// annotations shadow same-named annotations on the child type.
    pub fn child(
        &self,
        name: &str,
        ty: &TypeReference,
        overlay: &AnnotationSet,
    ) -> Result<GenerationRequest, GenerationError> {
        (self.child_fn)(name, ty, overlay)
    }

    /// Generates a value for a child request through the dispatcher.
    pub fn produce(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        (self.produce_fn)(request, ctx)
    }

    /// The invalid set of a child request, used by polymorphic aggregation.
    pub fn invalid_of(&self, request: &GenerationRequest, ctx: &mut GenerationContext) -> Vec<Value> {
        (self.invalid_fn)(request, ctx)
    }
}

/// Shorthand for the regenerator parameter threaded through the strategy
/// surface.
pub type Regen<'a, 'b> = &'a Regenerator<'b>;

/// A typed production strategy.
pub trait GenerationStrategy: Send + Sync {
    /// Name recorded in design events.
    fn name(&self) -> &'static str;

    fn supports(&self, request: &GenerationRequest) -> bool;

    /// Draws one value satisfying the request's constraints.
    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError>;

    /// Boundary samples, every one of them valid under the constraints.
    fn edge_cases(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Vec<Value>;

    /// Samples that deliberately break the constraints.
    fn invalid(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Vec<Value>;
}

/// The registry in its deterministic priority order.
pub fn registry(sealed: SealedIndex) -> Vec<Box<dyn GenerationStrategy>> {
    vec![
        Box::new(BoolStrategy),
        Box::new(IntStrategy),
        Box::new(LongStrategy),
        Box::new(DoubleStrategy),
        Box::new(DecimalStrategy),
        Box::new(StringStrategy),
        Box::new(UuidStrategy),
        Box::new(TimeStrategy),
        Box::new(EnumStrategy),
        Box::new(SealedStrategy::new(sealed)),
        Box::new(ContainerStrategy),
        Box::new(MapStrategy),
        Box::new(ArrayStrategy),
        Box::new(StructuralStrategy),
    ]
}

/// Union helper: appends `candidates` to `into`, dropping values already
/// present (by rendered form, which is total where `PartialEq` is not).
pub(crate) fn extend_unique(into: &mut Vec<Value>, candidates: Vec<Value>) {
    let mut seen: BTreeSet<String> = into.iter().map(Value::render).collect();
    for candidate in candidates {
        if seen.insert(candidate.render()) {
            into.push(candidate);
        }
    }
}
