//! Scenario execution: per-mode method enumeration and invocation.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Instant};

use covenant_fixtures::{FixtureGenerator, GenerationContext, GenerationError};
use covenant_trace::TraceEvent;
use covenant_type_graph::{
    AnnotatedElement, FrozenClock, Method, MethodBody, Parameter, TargetFailure, Value,
};

use crate::{
    error::{ConfigurationError, ScenarioError},
    factory::EphemeralTestContext,
    result::AssertionRecord,
    spec_model::TestMode,
    timer::DeadlineTimer,
    validator::ContractValidator,
};

mod contract;
mod data;
mod user;

/// Adapts async target methods onto the worker thread. Blocking one worker
/// is fine; throughput comes from inter-worker parallelism.
pub struct BlockingAdapter {
    runtime: tokio::runtime::Runtime,
}

impl BlockingAdapter {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?,
        })
    }

    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Executes every declared mode of one ephemeral context.
///
/// Shared invariants: the clock is frozen for the whole run, the effective
/// seed never mutates the spec, methods are enumerated in lexicographic
/// order, and every argument is written to the trace before the invocation
/// it feeds.
pub struct ScenarioExecutor {
    generator: Arc<FixtureGenerator>,
    validator: ContractValidator,
    clock: FrozenClock,
    seed: i64,
    timer: DeadlineTimer,
    blocking: BlockingAdapter,
}

impl ScenarioExecutor {
    pub fn new(
        generator: Arc<FixtureGenerator>,
        clock: FrozenClock,
        seed: i64,
        timer: DeadlineTimer,
    ) -> Result<Self, ScenarioError> {
        let blocking = BlockingAdapter::new().map_err(|error| ScenarioError::Internal {
            message: format!("failed to build the blocking adapter: {error}"),
            frames: Vec::new(),
        })?;
        Ok(Self {
            generator,
            validator: ContractValidator::new(clock),
            clock,
            seed,
            timer,
            blocking,
        })
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn clock(&self) -> FrozenClock {
        self.clock
    }

    pub fn validator(&self) -> &ContractValidator {
        &self.validator
    }

    pub fn generator(&self) -> &FixtureGenerator {
        &self.generator
    }

    /// Runs every mode of the spec and concatenates their records.
    pub fn execute_scenarios(
        &self,
        ctx: &EphemeralTestContext,
    ) -> Result<Vec<AssertionRecord>, ScenarioError> {
        let mut records = Vec::new();
        for mode in &ctx.specification.modes {
            let mut produced = match mode {
                TestMode::UserScenario => user::execute(self, ctx)?,
                TestMode::ContractAuto { contract } => contract::execute(self, ctx, contract)?,
                TestMode::DataCompliance { .. } => data::execute(self, ctx)?,
            };
            records.append(&mut produced);
        }
        Ok(records)
    }

    fn generation_context(&self, ctx: &EphemeralTestContext) -> GenerationContext {
        GenerationContext::new(self.seed, self.clock, Arc::clone(&ctx.trace))
    }

    /// Builds the invocation argument vector for a method, recording every
    /// generated argument under `<namespace>.<name>` before any invocation.
    /// Optional parameters are skipped but logged with a default marker.
    fn build_arguments(
        &self,
        ctx: &EphemeralTestContext,
        gen_ctx: &mut GenerationContext,
        namespace: &str,
        parameters: &[Parameter],
    ) -> Result<(Vec<Value>, Vec<String>), ScenarioError> {
        let mut args = Vec::new();
        let mut rendered = Vec::new();
        for parameter in parameters {
            let key = format!("{namespace}.{}", parameter.name);
            if parameter.optional {
                ctx.trace.record_argument(&key, "[Default]");
                rendered.push(format!("{}=[Default]", parameter.name));
                continue;
            }
            let value = self
                .generator
                .generate_for_param(parameter, gen_ctx)
                .map_err(map_generation_error)?;
            let shown = value.render();
            ctx.trace.record_argument(&key, &shown);
            rendered.push(format!("{}={shown}", parameter.name));
            args.push(value);
        }
        rendered.sort();
        Ok((args, rendered))
    }

    /// Invokes a method body with the receiver as the leading element of
    /// the argument vector, adapting async bodies through the blocking
    /// boundary and enforcing the deadline.
    fn invoke(
        &self,
        method: &Method,
        receiver: &Value,
        args: &[Value],
    ) -> Result<Value, ScenarioError> {
        if self.timer.is_expired() {
            return Err(ScenarioError::Timeout {
                millis: self.timer.timeout_ms(),
            });
        }
        let mut vector = Vec::with_capacity(args.len() + 1);
        vector.push(receiver.clone());
        vector.extend_from_slice(args);

        let outcome = match &method.body {
            MethodBody::Sync(body) => {
                let call = AssertUnwindSafe(|| body(&vector));
                match std::panic::catch_unwind(call) {
                    Ok(result) => result,
                    Err(payload) => {
                        return Err(ScenarioError::User {
                            type_name: "Panic".to_owned(),
                            message: panic_message(payload.as_ref()),
                            frames: Vec::new(),
                        })
                    }
                }
            }
            MethodBody::Async(body) => {
                let future = body(vector);
                match self.timer.remaining() {
                    None => self.blocking.block_on(future),
                    Some(remaining) => {
                        match self
                            .blocking
                            .block_on(async move { tokio::time::timeout(remaining, future).await })
                        {
                            Ok(result) => result,
                            Err(_) => {
                                return Err(ScenarioError::Timeout {
                                    millis: self.timer.timeout_ms(),
                                })
                            }
                        }
                    }
                }
            }
        };
        // Sync bodies cannot be interrupted; an overrun is converted after
        // the fact.
        if self.timer.is_expired() && outcome.is_ok() {
            return Err(ScenarioError::Timeout {
                millis: self.timer.timeout_ms(),
            });
        }
        outcome.map_err(map_target_failure)
    }

    /// Wraps one invocation so an execution event exists in the trace for
    /// every outcome, including a throw.
    fn execute_with_recording(
        &self,
        ctx: &EphemeralTestContext,
        method_name: &str,
        sorted_args: Vec<String>,
        block: impl FnOnce() -> Result<Value, ScenarioError>,
    ) -> Result<Value, ScenarioError> {
        let started = Instant::now();
        let outcome = block();
        ctx.trace.record(TraceEvent::Execution {
            method: method_name.to_owned(),
            args: sorted_args,
            duration_ms: started.elapsed().as_millis() as u64,
            ts: self.clock.epoch_millis(),
        });
        outcome
    }
}

fn map_generation_error(error: GenerationError) -> ScenarioError {
    match error {
        GenerationError::InvalidAnnotationValue { subject, reason } => {
            ScenarioError::Configuration(ConfigurationError::InvalidAnnotation { subject, reason })
        }
        other => ScenarioError::Internal {
            message: other.to_string(),
            frames: Vec::new(),
        },
    }
}

fn map_target_failure(failure: TargetFailure) -> ScenarioError {
    match failure {
        TargetFailure::Assertion {
            message,
            expected,
            actual,
            frames,
        } => ScenarioError::Assertion {
            message,
            expected,
            actual,
            frames,
        },
        TargetFailure::Error {
            type_name,
            message,
            frames,
        } => {
            if type_name == "InternalError" {
                ScenarioError::Internal { message, frames }
            } else {
                ScenarioError::User {
                    type_name,
                    message,
                    frames,
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}

/// Lexicographically sorted methods carrying the given annotation.
fn annotated_methods<'a>(
    methods: &'a [Method],
    annotation: &str,
) -> Vec<&'a Method> {
    let mut selected: Vec<&Method> = methods
        .iter()
        .filter(|method| method.has_annotation(annotation))
        .collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));
    selected
}
