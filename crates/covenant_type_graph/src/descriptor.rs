//! Canonical, immutable type descriptors.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    annotations::{AnnotationSet, AnnotationValue},
    invoke::{ConstructorHandle, MethodBody},
    reference::{TypeId, TypeReference},
    values::Value,
};

/// Capability shared by every element that can carry annotations.
pub trait AnnotatedElement {
    fn annotations(&self) -> &AnnotationSet;

    fn has_annotation(&self, name: &str) -> bool {
        self.annotations().has(name)
    }

    fn annotation_attributes(&self, name: &str) -> Option<&BTreeMap<String, AnnotationValue>> {
        self.annotations().attributes(name)
    }
}

/// Attributes shared by all descriptor variants.
#[derive(Clone, Debug)]
pub struct TypeAttributes {
    pub type_id: TypeId,
    pub simple_name: String,
    pub qualified_name: String,
    pub is_nullable: bool,
    pub is_inline: bool,
    pub annotations: AnnotationSet,
}

/// The atomic value kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Long,
    Double,
    Decimal,
    Str,
    Uuid,
    Timestamp,
    Enum { variants: Vec<String> },
}

impl ValueKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Str => "string",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Enum { .. } => "enum",
        }
    }

    /// Zero element used when allocating primitive arrays.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }
}

/// A constructor or method parameter. Edges are lazy: the parameter holds a
/// reference, not a descriptor.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeReference,
    /// Parameters with a declared default are skipped from the invocation
    /// vector and logged with a `[Default]` marker.
    pub optional: bool,
    pub annotations: AnnotationSet,
}

impl Parameter {
    pub fn new(name: &str, ty: TypeReference) -> Self {
        Self {
            name: name.to_owned(),
            ty,
            optional: false,
            annotations: AnnotationSet::empty(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn annotated(mut self, annotations: AnnotationSet) -> Self {
        self.annotations = annotations;
        self
    }
}

impl AnnotatedElement for Parameter {
    fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }
}

/// A constructor of a structural type.
#[derive(Clone, Debug)]
pub struct Constructor {
    pub primary: bool,
    pub parameters: Vec<Parameter>,
    pub handle: ConstructorHandle,
}

/// A readable property of a structural type.
#[derive(Clone, Debug)]
pub struct Property {
    pub name: String,
    pub ty: TypeReference,
    pub annotations: AnnotationSet,
}

impl AnnotatedElement for Property {
    fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }
}

/// Classification of a method within its declaring type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    /// Ordinary user-declared method.
    Regular,
    /// Language-provided member (equality, display); never an entry point.
    Standard,
    /// Compiler-generated bridge; excluded from contract enumeration.
    Synthetic,
}

/// A method of a structural type.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeReference>,
    /// Method-level annotations (`Test`, …).
    pub annotations: AnnotationSet,
    /// Annotations on the return position, evaluated by the contract
    /// validator against the returned value.
    pub return_annotations: AnnotationSet,
    pub body: MethodBody,
}

impl Method {
    /// `name(paramTypeId,paramTypeId)` — the identity used for O(1)
    /// implementation lookup in contract mode.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|param| param.ty.type_id().as_str())
            .collect();
        format!("{}({})", self.name, params.join(","))
    }
}

impl AnnotatedElement for Method {
    fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }
}

/// Allocation port for array values, so strategies stay free of
/// platform-array handling. Primitive arrays pre-fill with the kind's zero
/// element; object arrays pre-fill with nulls.
#[derive(Clone)]
pub struct ArrayAllocator {
    instantiate: Arc<dyn Fn(usize) -> Value + Send + Sync>,
    set: Arc<dyn Fn(&mut Value, usize, Value) + Send + Sync>,
}

impl ArrayAllocator {
    pub fn new(
        instantiate: impl Fn(usize) -> Value + Send + Sync + 'static,
        set: impl Fn(&mut Value, usize, Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            instantiate: Arc::new(instantiate),
            set: Arc::new(set),
        }
    }

    /// Allocator for object arrays.
    pub fn object() -> Self {
        Self::fill_with(Value::Null)
    }

    /// Allocator for primitive arrays of the given kind.
    pub fn primitive(kind: &ValueKind) -> Self {
        Self::fill_with(kind.zero_value())
    }

    fn fill_with(zero: Value) -> Self {
        Self::new(
            move |size| Value::Array(vec![zero.clone(); size]),
            |array, index, value| {
                if let Value::Array(items) = array {
                    if let Some(slot) = items.get_mut(index) {
                        *slot = value;
                    }
                }
            },
        )
    }

    pub fn instantiate(&self, size: usize) -> Value {
        (self.instantiate)(size)
    }

    pub fn set(&self, array: &mut Value, index: usize, value: Value) {
        (self.set)(array, index, value);
    }
}

impl fmt::Debug for ArrayAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArrayAllocator")
    }
}

/// The canonical intermediate representation of a type.
#[derive(Clone, Debug)]
pub enum TypeDescriptor {
    /// Atomic values: primitives, strings, uuids, enums, inline wrappers.
    Value {
        attrs: TypeAttributes,
        kind: ValueKind,
    },
    /// Linear collection with a single element type.
    Container {
        attrs: TypeAttributes,
        element: TypeReference,
    },
    /// Keyed collection.
    MapType {
        attrs: TypeAttributes,
        key: TypeReference,
        value: TypeReference,
    },
    /// Fixed-component array. Primitive arrays carry their own allocator.
    ArrayType {
        attrs: TypeAttributes,
        component: TypeReference,
        primitive: bool,
        allocator: ArrayAllocator,
    },
    /// Class or record.
    Structural {
        attrs: TypeAttributes,
        type_arguments: Vec<TypeReference>,
        constructors: Vec<Constructor>,
        properties: Vec<Property>,
        methods: Vec<Method>,
    },
}

impl TypeDescriptor {
    pub fn attributes(&self) -> &TypeAttributes {
        match self {
            Self::Value { attrs, .. }
            | Self::Container { attrs, .. }
            | Self::MapType { attrs, .. }
            | Self::ArrayType { attrs, .. }
            | Self::Structural { attrs, .. } => attrs,
        }
    }

    pub fn type_id(&self) -> &TypeId {
        &self.attributes().type_id
    }

    pub fn simple_name(&self) -> &str {
        &self.attributes().simple_name
    }

    pub fn qualified_name(&self) -> &str {
        &self.attributes().qualified_name
    }

    pub fn is_nullable(&self) -> bool {
        self.attributes().is_nullable
    }

    pub fn is_inline(&self) -> bool {
        self.attributes().is_inline
    }

    /// Discriminator used for dispatch and serialization.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Value { kind, .. } => kind.label(),
            Self::Container { .. } => "container",
            Self::MapType { .. } => "map",
            Self::ArrayType { .. } => "array",
            Self::Structural { .. } => "structural",
        }
    }

    pub fn value_kind(&self) -> Option<&ValueKind> {
        match self {
            Self::Value { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn constructors(&self) -> &[Constructor] {
        match self {
            Self::Structural { constructors, .. } => constructors,
            _ => &[],
        }
    }

    pub fn methods(&self) -> &[Method] {
        match self {
            Self::Structural { methods, .. } => methods,
            _ => &[],
        }
    }

    pub fn properties(&self) -> &[Property] {
        match self {
            Self::Structural { properties, .. } => properties,
            _ => &[],
        }
    }

    /// The primary constructor if declared, otherwise the first.
    pub fn primary_or_first_constructor(&self) -> Option<&Constructor> {
        let constructors = self.constructors();
        constructors
            .iter()
            .find(|ctor| ctor.primary)
            .or_else(|| constructors.first())
    }

    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods().iter().find(|method| method.name == name)
    }
}

impl AnnotatedElement for TypeDescriptor {
    fn annotations(&self) -> &AnnotationSet {
        &self.attributes().annotations
    }
}
