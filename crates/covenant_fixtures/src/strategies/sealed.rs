//! Sealed/polymorphic strategy.

use std::collections::BTreeMap;

use covenant_type_graph::{AnnotationSet, TypeReference, Value};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    request::GenerationRequest,
    strategies::{extend_unique, GenerationStrategy, Regen},
};

/// Candidate lists for polymorphic types, linked and validated by the
/// discovery phase. Only non-empty lists are admitted, so the strategy never
/// faces an abstract type it cannot instantiate.
#[derive(Clone, Debug, Default)]
pub struct SealedIndex {
    candidates: BTreeMap<String, Vec<TypeReference>>,
}

impl SealedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links a polymorphic type to its concrete candidates. Empty candidate
    /// lists are rejected by the caller before linking.
    pub fn link(&mut self, qualified_name: &str, candidates: Vec<TypeReference>) {
        debug_assert!(!candidates.is_empty());
        self.candidates
            .insert(qualified_name.to_owned(), candidates);
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.candidates.contains_key(qualified_name)
    }

    pub fn candidates_of(&self, qualified_name: &str) -> &[TypeReference] {
        self.candidates
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub struct SealedStrategy {
    index: SealedIndex,
}

impl SealedStrategy {
    pub fn new(index: SealedIndex) -> Self {
        Self { index }
    }

    fn candidates<'a>(&'a self, request: &GenerationRequest) -> &'a [TypeReference] {
        self.index
            .candidates_of(request.descriptor.qualified_name())
    }
}

impl GenerationStrategy for SealedStrategy {
    fn name(&self) -> &'static str {
        "SealedStrategy"
    }

    fn supports(&self, request: &GenerationRequest) -> bool {
        self.index.contains(request.descriptor.qualified_name())
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Result<Value, GenerationError> {
        let candidates = self.candidates(request);
        let pick = ctx.pick_index(candidates.len());
        let child = regen.child(&request.name, &candidates[pick], &AnnotationSet::empty())?;
        regen.produce(&child, ctx)
    }

    /// Breadth over depth: one instance per candidate.
    fn edge_cases(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let mut edges = Vec::new();
        for candidate in self.candidates(request) {
            let produced = regen
                .child(&request.name, candidate, &AnnotationSet::empty())
                .and_then(|child| regen.produce(&child, ctx));
            if let Ok(value) = produced {
                edges.push(value);
            }
        }
        edges
    }

    /// Union of the candidates' invalid sets.
    fn invalid(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
        regen: Regen<'_, '_>,
    ) -> Vec<Value> {
        let mut samples = Vec::new();
        for candidate in self.candidates(request) {
            if let Ok(child) = regen.child(&request.name, candidate, &AnnotationSet::empty()) {
                extend_unique(&mut samples, regen.invalid_of(&child, ctx));
            }
        }
        samples
    }
}
