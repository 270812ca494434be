//! Invokable handles.
//!
//! Constructors and methods of structural types carry their behavior as
//! opaque callables over [`Value`] slices. This is the single seam between
//! the framework and host code: the domain stays free of platform
//! reflection, and a different adapter can provide handles from any source.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use crate::values::Value;

/// A single frame of a captured failure location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRecord {
    pub module: String,
    pub file: String,
    pub line: u32,
    pub method: String,
}

impl FrameRecord {
    pub fn new(module: &str, file: &str, line: u32, method: &str) -> Self {
        Self {
            module: module.to_owned(),
            file: file.to_owned(),
            line,
            method: method.to_owned(),
        }
    }
}

impl fmt::Display for FrameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}:{})",
            self.module, self.method, self.file, self.line
        )
    }
}

/// A failure raised by target code during an invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetFailure {
    /// A broken assertion inside a user test body.
    Assertion {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
        frames: Vec<FrameRecord>,
    },
    /// Any other failure escaping the target, identified by its short type
    /// name.
    Error {
        type_name: String,
        message: String,
        frames: Vec<FrameRecord>,
    },
}

impl TargetFailure {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: None,
            actual: None,
            frames: Vec::new(),
        }
    }

    pub fn assertion_with(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            frames: Vec::new(),
        }
    }

    pub fn error(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            type_name: type_name.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, new_frames: Vec<FrameRecord>) -> Self {
        match &mut self {
            Self::Assertion { frames, .. } | Self::Error { frames, .. } => *frames = new_frames,
        }
        self
    }

    pub fn frames(&self) -> &[FrameRecord] {
        match self {
            Self::Assertion { frames, .. } | Self::Error { frames, .. } => frames,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Assertion { message, .. } | Self::Error { message, .. } => message,
        }
    }
}

/// Result of invoking a handle.
pub type InvokeResult = Result<Value, TargetFailure>;

/// Future returned by an async method body.
pub type MethodFuture = Pin<Box<dyn Future<Output = InvokeResult> + Send>>;

/// An invokable constructor.
#[derive(Clone)]
pub struct ConstructorHandle(Arc<dyn Fn(&[Value]) -> InvokeResult + Send + Sync>);

impl ConstructorHandle {
    pub fn new(f: impl Fn(&[Value]) -> InvokeResult + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, args: &[Value]) -> InvokeResult {
        (self.0)(args)
    }
}

impl fmt::Debug for ConstructorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConstructorHandle")
    }
}

/// An invokable method body: synchronous, or asynchronous and adapted by the
/// executor's blocking boundary.
#[derive(Clone)]
pub enum MethodBody {
    Sync(Arc<dyn Fn(&[Value]) -> InvokeResult + Send + Sync>),
    Async(Arc<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>),
}

impl MethodBody {
    pub fn from_fn(f: impl Fn(&[Value]) -> InvokeResult + Send + Sync + 'static) -> Self {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async(f: impl Fn(Vec<Value>) -> MethodFuture + Send + Sync + 'static) -> Self {
        Self::Async(Arc::new(f))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("MethodBody::Sync"),
            Self::Async(_) => f.write_str("MethodBody::Async"),
        }
    }
}
