//! The failure taxonomy of the execution pipeline.

use covenant_fixtures::GenerationError;
use covenant_type_graph::FrameRecord;

use crate::result::AssertionRule;

/// User input is invalid: the test cannot even be set up.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("`{type_name}` has no primary constructor")]
    MissingPrimaryConstructor { type_name: String },

    #[error("target has no usable qualified name: {detail}")]
    AnonymousTarget { detail: String },

    #[error("`{type_name}` declares no test entry point")]
    NoEntryPoint { type_name: String },

    #[error("contract `{contract}` method `{signature}` has no implementation in `{type_name}`")]
    MissingContractMethod {
        contract: String,
        signature: String,
        type_name: String,
    },

    #[error("circular dependency: {path}")]
    CircularDependency { path: String },

    #[error("specs for `{target}` cannot be merged: {detail}")]
    SpecMergeConflict { target: String, detail: String },

    #[error("dependency `{type_name}` cannot be provided: {detail}")]
    UnresolvableDependency { type_name: String, detail: String },

    #[error("invalid annotation on `{subject}`: {reason}")]
    InvalidAnnotation { subject: String, reason: String },

    /// An unexpected failure during setup, with the root cause preserved.
    #[error("setup failed: {detail}")]
    Setup { detail: String },
}

impl From<GenerationError> for ConfigurationError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::InvalidAnnotationValue { subject, reason } => {
                Self::InvalidAnnotation { subject, reason }
            }
            other => Self::Setup {
                detail: other.to_string(),
            },
        }
    }
}

/// A broken declared constraint, carrying the specific rule.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ContractViolation {
    pub rule: AssertionRule,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl ContractViolation {
    pub fn new(rule: AssertionRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

/// The single failure word inside the interceptor chain. Consumers match
/// exhaustively; only the Result-Resolver translates it into records.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("contract violated: {0}")]
    Contract(#[from] ContractViolation),

    #[error("assertion failed: {message}")]
    Assertion {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
        frames: Vec<FrameRecord>,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("internal framework error: {message}")]
    Internal {
        message: String,
        frames: Vec<FrameRecord>,
    },

    #[error("unexpected exception `{type_name}`: {message}")]
    User {
        type_name: String,
        message: String,
        frames: Vec<FrameRecord>,
    },

    #[error("timed out after {millis}ms")]
    Timeout { millis: u64 },
}

impl ScenarioError {
    pub fn frames(&self) -> &[FrameRecord] {
        match self {
            Self::Assertion { frames, .. }
            | Self::Internal { frames, .. }
            | Self::User { frames, .. } => frames,
            Self::Contract(_) | Self::Configuration(_) | Self::Timeout { .. } => &[],
        }
    }

    /// Short class-style name used in `ExecutionError` causes.
    pub fn cause_name(&self) -> &str {
        match self {
            Self::Contract(_) => "ContractViolation",
            Self::Assertion { .. } => "AssertionError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Internal { .. } => "InternalError",
            Self::User { type_name, .. } => type_name,
            Self::Timeout { .. } => "Timeout",
        }
    }
}
