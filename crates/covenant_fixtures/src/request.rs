//! Generation requests.

use std::sync::Arc;

use covenant_type_graph::{
    AnnotatedElement, AnnotationSet, Parameter, ResolverSession, TypeDescriptor,
};

use crate::error::GenerationError;

/// What a strategy is asked to produce: a resolved descriptor, the name of
/// the slot being filled, and the effective annotations (slot annotations
/// shadowing same-named type annotations).
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub descriptor: Arc<TypeDescriptor>,
    pub name: String,
    pub annotations: AnnotationSet,
}

impl GenerationRequest {
    pub fn new(descriptor: Arc<TypeDescriptor>, name: &str) -> Self {
        let annotations = descriptor.annotations().clone();
        Self {
            descriptor,
            name: name.to_owned(),
            annotations,
        }
    }

    /// Request for a parameter slot; resolves the parameter's lazy type edge.
    pub fn for_parameter(
        parameter: &Parameter,
        session: &ResolverSession,
    ) -> Result<Self, GenerationError> {
        let descriptor =
            session
                .resolve(&parameter.ty)
                .map_err(|error| GenerationError::Unresolvable {
                    subject: parameter.name.clone(),
                    type_id: parameter.ty.type_id().as_str().to_owned(),
                    message: error.to_string(),
                })?;
        let annotations = parameter
            .annotations
            .merged_over(descriptor.annotations());
        Ok(Self {
            descriptor,
            name: parameter.name.clone(),
            annotations,
        })
    }

    pub fn is_nullable(&self) -> bool {
        self.descriptor.is_nullable()
    }

    pub fn type_id_str(&self) -> &str {
        self.descriptor.type_id().as_str()
    }
}
