//! The session-scoped type resolver and its source adapter port.
//!
//! Resolution turns a [`TypeReference`] into a canonical, immutable
//! [`TypeDescriptor`]. The session owns its cache; there is no global cache,
//! so closing the session releases every descriptor it produced.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{
    annotations::AnnotationSet,
    descriptor::{
        ArrayAllocator, Constructor, Method, Property, TypeAttributes, TypeDescriptor, ValueKind,
    },
    reference::{TypeId, TypeReference},
};

/// Failure reported by a source adapter.
#[derive(Clone, Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("type `{type_id}` is missing a required generic argument at position {position}")]
    MissingTypeArgument { type_id: String, position: usize },
    #[error("{0}")]
    Unsupported(String),
}

/// Resolution failure.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("malformed type reference `{0}`")]
    MalformedType(String),
    #[error("source adapter rejected `{reference}`: {reason}")]
    UnsupportedSource { reference: String, reason: String },
    #[error("resolver session is closed")]
    SessionClosed,
}

/// Raw shape of a type as reported by the source adapter, before taxonomy
/// classification.
#[derive(Clone, Debug)]
pub enum RawShape {
    /// Member of the value-type set.
    Scalar(ValueKind),
    Array {
        component: TypeReference,
        primitive: bool,
        allocator: ArrayAllocator,
    },
    Class(RawClass),
}

/// Raw class facts. Map- and iterable-subtyping is reported as resolved
/// entry/element references so the session never inspects host type
/// hierarchies itself.
#[derive(Clone, Debug, Default)]
pub struct RawClass {
    pub type_arguments: Vec<TypeReference>,
    pub map_entry: Option<(TypeReference, TypeReference)>,
    pub iterable_element: Option<TypeReference>,
    pub constructors: Vec<Constructor>,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
}

/// A type as registered with the source adapter.
#[derive(Clone, Debug)]
pub struct RawType {
    pub qualified_name: String,
    pub simple_name: String,
    pub is_inline: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Qualified names of directly implemented contract interfaces.
    pub implements: Vec<String>,
    pub annotations: AnnotationSet,
    pub shape: RawShape,
}

impl RawType {
    pub fn new(qualified_name: &str, shape: RawShape) -> Self {
        Self {
            qualified_name: qualified_name.to_owned(),
            simple_name: qualified_name
                .rsplit('.')
                .next()
                .unwrap_or(qualified_name)
                .to_owned(),
            is_inline: false,
            is_interface: false,
            is_abstract: false,
            implements: Vec::new(),
            annotations: AnnotationSet::empty(),
            shape,
        }
    }

    pub fn scalar(qualified_name: &str, kind: ValueKind) -> Self {
        Self::new(qualified_name, RawShape::Scalar(kind))
    }

    pub fn class(qualified_name: &str, class: RawClass) -> Self {
        Self::new(qualified_name, RawShape::Class(class))
    }

    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn implementing(mut self, interface: &str) -> Self {
        self.implements.push(interface.to_owned());
        self
    }

    pub fn annotated(mut self, annotations: AnnotationSet) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Port through which the resolver loads raw type facts.
pub trait SourceAdapter: Send + Sync {
    fn load(&self, reference: &TypeReference) -> Result<RawType, AdapterError>;
}

/// The in-tree source adapter: a registry the host populates with raw types,
/// keyed by qualified name. This is the reflection stand-in; discovery scans
/// it and the resolver loads from it.
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: BTreeMap<String, RawType>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, raw: RawType) {
        self.types.insert(raw.qualified_name.clone(), raw);
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains_key(qualified_name)
    }

    pub fn get(&self, qualified_name: &str) -> Option<&RawType> {
        self.types.get(qualified_name)
    }

    /// All registered types in qualified-name order.
    pub fn iter(&self) -> impl Iterator<Item = &RawType> {
        self.types.values()
    }

    /// Plain (non-generic, non-nullable) reference to a registered name.
    pub fn reference(&self, qualified_name: &str) -> TypeReference {
        TypeReference::by_name(TypeId::plain(qualified_name))
    }

    /// Concrete types implementing the given interface, in qualified-name
    /// order so downstream selection is deterministic.
    pub fn implementations_of(&self, interface: &str) -> Vec<&RawType> {
        self.types
            .values()
            .filter(|raw| {
                !raw.is_interface
                    && !raw.is_abstract
                    && raw.implements.iter().any(|name| name == interface)
            })
            .collect()
    }
}

impl SourceAdapter for TypeCatalog {
    fn load(&self, reference: &TypeReference) -> Result<RawType, AdapterError> {
        self.types
            .get(reference.source())
            .cloned()
            .ok_or_else(|| AdapterError::UnknownType(reference.source().to_owned()))
    }
}

/// A resolver session: adapter + session-local cache + closed flag.
pub struct ResolverSession {
    adapter: Arc<dyn SourceAdapter>,
    cache: Mutex<HashMap<TypeId, Arc<TypeDescriptor>>>,
    closed: AtomicBool,
}

impl ResolverSession {
    pub fn open(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            adapter,
            cache: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Closes the session and releases every cached descriptor. Further
    /// `resolve` calls are rejected.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.cache.lock().clear();
    }

    /// Resolves a reference to its canonical descriptor. Within one session,
    /// the same reference always yields the same descriptor.
    pub fn resolve(&self, reference: &TypeReference) -> Result<Arc<TypeDescriptor>, ResolveError> {
        if !self.is_open() {
            return Err(ResolveError::SessionClosed);
        }
        if !reference.type_id().is_well_formed() {
            return Err(ResolveError::MalformedType(
                reference.type_id().as_str().to_owned(),
            ));
        }
        if let Some(hit) = self.cache.lock().get(reference.type_id()) {
            return Ok(Arc::clone(hit));
        }

        let raw = self.adapter.load(reference).map_err(|error| match error {
            AdapterError::MissingTypeArgument { type_id, .. } => {
                ResolveError::MalformedType(type_id)
            }
            other => ResolveError::UnsupportedSource {
                reference: reference.type_id().as_str().to_owned(),
                reason: other.to_string(),
            },
        })?;
        let descriptor = Arc::new(classify(reference, raw));

        let mut cache = self.cache.lock();
        let entry = cache
            .entry(reference.type_id().clone())
            .or_insert_with(|| Arc::clone(&descriptor));
        Ok(Arc::clone(entry))
    }
}

/// Taxonomy classification: value set first, then arrays, then map-subtypes,
/// then iterable-subtypes, everything else structural.
fn classify(reference: &TypeReference, raw: RawType) -> TypeDescriptor {
    let attrs = TypeAttributes {
        type_id: reference.type_id().clone(),
        simple_name: raw.simple_name,
        qualified_name: raw.qualified_name,
        is_nullable: reference.is_nullable(),
        is_inline: raw.is_inline,
        annotations: raw.annotations,
    };
    match raw.shape {
        RawShape::Scalar(kind) => TypeDescriptor::Value { attrs, kind },
        RawShape::Array {
            component,
            primitive,
            allocator,
        } => TypeDescriptor::ArrayType {
            attrs,
            component,
            primitive,
            allocator,
        },
        RawShape::Class(class) => {
            if let Some((key, value)) = class.map_entry {
                TypeDescriptor::MapType { attrs, key, value }
            } else if let Some(element) = class.iterable_element {
                TypeDescriptor::Container { attrs, element }
            } else {
                TypeDescriptor::Structural {
                    attrs,
                    type_arguments: class.type_arguments,
                    constructors: class.constructors,
                    properties: class.properties,
                    methods: class.methods,
                }
            }
        }
    }
}
