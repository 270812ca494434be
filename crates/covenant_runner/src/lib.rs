//! The scenario pipeline: discovery, specification assembly, instance
//! construction and the intercepted execution of every declared test mode.

#[macro_use]
extern crate tracing;

mod config;
pub use config::{configure_console, RunnerOptions, Verbosity};

mod discovery;
pub use discovery::{build_sealed_index, DiscoveryPolicy, DiscoveryService, ScanScope};

mod error;
pub use error::{ConfigurationError, ContractViolation, ScenarioError};

pub mod executor;
pub use executor::{BlockingAdapter, ScenarioExecutor};

mod factory;
pub use factory::{EntryPoint, EphemeralTestContext, InstanceFactory};

mod filter;
pub use filter::{TestFilter, TestFilterConfig};

mod interceptor;
pub use interceptor::{Auditing, Chain, ExecutorInterceptor, Interceptor, ResultResolver};

mod multi_runner;
pub use multi_runner::{MultiTargetRunner, OnTargetCompletedFn, TargetCompletion};

mod policy;
pub use policy::{AuditConfig, AuditDepth, AuditRetention, DeterminismConfig, ExecutionPolicy, ResourceConfig};

mod publisher;
pub use publisher::{BroadcastingPublisher, PublishError, ResultPublisher};

mod result;
pub use result::{
    AssertionRecord, AssertionRule, DataContractKind, ExecutionResult, RecordStatus, RunOutcome,
    SourceLocation, TargetResult, TestResultEvent, TestStatus,
};

mod runner;
pub use runner::ScenarioRunner;

mod sanitize;
pub use sanitize::{extract_location, sanitize_frames};

mod spec_model;
pub use spec_model::{
    merge_specifications, DependencyMetadata, DiscoveredTestTarget, EnvironmentKind,
    MockingStrategy, TestMode, TestSpecification,
};

mod timer;
pub use timer::DeadlineTimer;

mod validator;
pub use validator::ContractValidator;

mod verdict;
pub use verdict::VerdictDecider;

mod worker;
pub use worker::{current_worker_id, WorkerContext};
