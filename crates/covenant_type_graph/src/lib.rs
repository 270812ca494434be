//! The canonical type graph: an immutable intermediate representation of the
//! types under test, the dynamic values flowing through them, and the
//! session-scoped resolver that turns type references into descriptors.
//!
//! The rest of the framework manipulates only [`TypeDescriptor`] and
//! [`TypeReference`]; nothing outside the [`resolver`] adapter ever inspects
//! how a host registered its types.

mod annotations;
pub use annotations::{
    names, Annotation, AnnotationSet, AnnotationValue, DecimalBound, DigitsRule, EmailRule,
    IntBounds, LengthBounds, PatternRule, RealBounds, SizeBounds, TemporalBounds, UrlRule,
};

mod clock;
pub use clock::{FrozenClock, CLOCK_TYPE_NAME};

mod descriptor;
pub use descriptor::{
    AnnotatedElement, ArrayAllocator, Constructor, Method, MethodKind, Parameter, Property,
    TypeAttributes, TypeDescriptor, ValueKind,
};

mod invoke;
pub use invoke::{
    ConstructorHandle, FrameRecord, InvokeResult, MethodBody, MethodFuture, TargetFailure,
};

mod reference;
pub use reference::{GenericArg, TypeId, TypeReference, Variance};

mod resolver;
pub use resolver::{
    AdapterError, RawClass, RawShape, RawType, ResolveError, ResolverSession, SourceAdapter,
    TypeCatalog,
};

mod values;
pub use values::{Decimal, Value};
