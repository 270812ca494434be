//! The fixture generator: dispatch, cycle policy, fallbacks, recording.

use std::sync::Arc;

use covenant_type_graph::{
    AnnotatedElement, AnnotationSet, Parameter, ResolverSession, TypeReference, Value,
};

use crate::{
    context::GenerationContext,
    error::GenerationError,
    mocking::MockingEngine,
    request::GenerationRequest,
    strategies::{self, extend_unique, GenerationStrategy, Regenerator, SealedIndex},
    validator::validate_configuration,
};

/// Dispatcher over the strategy registry.
///
/// Every generated value flows through here, including the children that
/// recursive strategies request, so the constraint pre-pass, the null policy
/// and design recording apply at every depth of the object graph.
pub struct FixtureGenerator {
    session: Arc<ResolverSession>,
    mocking: Arc<dyn MockingEngine>,
    strategies: Vec<Box<dyn GenerationStrategy>>,
}

impl FixtureGenerator {
    pub fn new(
        session: Arc<ResolverSession>,
        mocking: Arc<dyn MockingEngine>,
        sealed: SealedIndex,
    ) -> Self {
        Self {
            session,
            mocking,
            strategies: strategies::registry(sealed),
        }
    }

    pub fn session(&self) -> &ResolverSession {
        &self.session
    }

    /// Builds a request for an arbitrary slot, resolving the type edge.
    pub fn request_for(
        &self,
        name: &str,
        ty: &TypeReference,
        overlay: &AnnotationSet,
    ) -> Result<GenerationRequest, GenerationError> {
        let descriptor =
            self.session
                .resolve(ty)
                .map_err(|error| GenerationError::Unresolvable {
                    subject: name.to_owned(),
                    type_id: ty.type_id().as_str().to_owned(),
                    message: error.to_string(),
                })?;
        let annotations = overlay.merged_over(descriptor.annotations());
        Ok(GenerationRequest {
            descriptor,
            name: name.to_owned(),
            annotations,
        })
    }

    /// Generates a value for a constructor or method parameter.
    pub fn generate_for_param(
        &self,
        parameter: &Parameter,
        ctx: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        let request = GenerationRequest::for_parameter(parameter, &self.session)?;
        self.generate(&request, ctx)
    }

    /// Generates a value satisfying the request.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &mut GenerationContext,
    ) -> Result<Value, GenerationError> {
        validate_configuration(request)?;
        let strategy = self.strategy_for(request)?;

        let outcome = self.with_regen(|regen| strategy.generate(request, ctx, regen));
        let value = match outcome {
            Ok(value) => {
                ctx.record_design(&request.name, strategy.name(), &value.render());
                value
            }
            Err(error) if error.is_recursive() => {
                let GenerationError::Recursive { path, .. } = &error else {
                    unreachable!("is_recursive guards the variant");
                };
                trace!(type_id = request.type_id_str(), %path, "cycle, falling back to mock");
                match self.mocking.create_mock(&request.descriptor, ctx) {
                    Ok(mock) => {
                        ctx.record_design(&request.name, "MockFallback", &mock.render());
                        mock
                    }
                    Err(mock_error) => {
                        return Err(GenerationError::RecursionFallbackFailed {
                            type_id: request.type_id_str().to_owned(),
                            path: path.clone(),
                            message: mock_error.to_string(),
                        })
                    }
                }
            }
            Err(GenerationError::Unconstructible { type_id }) => {
                trace!(%type_id, "no constructor, falling back to mock");
                match self.mocking.create_mock(&request.descriptor, ctx) {
                    Ok(mock) => {
                        ctx.record_design(&request.name, "MockFallback", &mock.render());
                        mock
                    }
                    Err(mock_error) => {
                        return Err(GenerationError::Unresolvable {
                            subject: request.name.clone(),
                            type_id,
                            message: format!(
                                "no constructor and the mocking engine refused: {mock_error}"
                            ),
                        })
                    }
                }
            }
            Err(error) => return Err(error),
        };

        if value.is_null() && !request.is_nullable() {
            return Err(GenerationError::NullForNonNullable {
                strategy: strategy.name().to_owned(),
                subject: request.name.clone(),
            });
        }
        Ok(value)
    }

    /// The union of the supporting strategy's edge cases, plus `null` when
    /// the slot is nullable, plus a singleton random sample when the union
    /// would otherwise be empty.
    pub fn valid_boundaries(
        &self,
        parameter: &Parameter,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Value>, GenerationError> {
        let request = GenerationRequest::for_parameter(parameter, &self.session)?;
        validate_configuration(&request)?;
        let strategy = self.strategy_for(&request)?;

        let mut union = Vec::new();
        let edges = self.with_regen(|regen| strategy.edge_cases(&request, ctx, regen));
        extend_unique(&mut union, edges);
        if request.is_nullable() {
            extend_unique(&mut union, vec![Value::Null]);
        }
        if union.is_empty() {
            union.push(self.generate(&request, ctx)?);
        }
        Ok(union)
    }

    /// The union of the supporting strategy's invalid samples; a `null`
    /// injected into a non-nullable slot is inherently invalid, so it is
    /// always part of the set there.
    pub fn invalid_samples(
        &self,
        parameter: &Parameter,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Value>, GenerationError> {
        let request = GenerationRequest::for_parameter(parameter, &self.session)?;
        validate_configuration(&request)?;
        let strategy = self.strategy_for(&request)?;

        let mut union = Vec::new();
        let samples = self.with_regen(|regen| strategy.invalid(&request, ctx, regen));
        extend_unique(&mut union, samples);
        if !request.is_nullable() {
            extend_unique(&mut union, vec![Value::Null]);
        }
        Ok(union)
    }

    fn strategy_for(
        &self,
        request: &GenerationRequest,
    ) -> Result<&dyn GenerationStrategy, GenerationError> {
        self.strategies
            .iter()
            .map(Box::as_ref)
            .find(|strategy| strategy.supports(request))
            .ok_or_else(|| GenerationError::NoStrategy {
                subject: request.name.clone(),
                type_id: request.type_id_str().to_owned(),
            })
    }

    fn invalid_for(&self, request: &GenerationRequest, ctx: &mut GenerationContext) -> Vec<Value> {
        match self.strategy_for(request) {
            Ok(strategy) => self.with_regen(|regen| strategy.invalid(request, ctx, regen)),
            Err(_) => Vec::new(),
        }
    }

    fn with_regen<T>(&self, f: impl FnOnce(&Regenerator<'_>) -> T) -> T {
        let produce = |request: &GenerationRequest, ctx: &mut GenerationContext| {
            self.generate(request, ctx)
        };
        let child = |name: &str, ty: &TypeReference, overlay: &AnnotationSet| {
            self.request_for(name, ty, overlay)
        };
        let invalid = |request: &GenerationRequest, ctx: &mut GenerationContext| {
            self.invalid_for(request, ctx)
        };
        let regen = Regenerator::new(&produce, &child, &invalid);
        f(&regen)
    }
}
