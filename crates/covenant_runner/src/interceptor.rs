//! The interceptor chain: a flat, ordered pipeline around scenario
//! execution. Top to bottom: Result-Resolver (outermost catch), Auditing
//! (flush, snapshot, publish), Executor (terminal).

use std::time::Instant;

use covenant_trace::{Phase, RecyclingFileSink, TraceEvent};
use covenant_type_graph::FrozenClock;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::{
    error::ScenarioError,
    executor::ScenarioExecutor,
    factory::EphemeralTestContext,
    policy::{AuditConfig, AuditDepth, AuditRetention},
    publisher::BroadcastingPublisher,
    result::{AssertionRecord, AssertionRule, SourceLocation, TestResultEvent, TestStatus},
    sanitize::{extract_location, sanitize_frames},
    verdict::VerdictDecider,
};

pub trait Interceptor {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Vec<AssertionRecord>, ScenarioError>;
}

/// A flat vector plus an index; `proceed` advances to the next element.
/// This is the only recursion in the pipeline.
pub struct Chain<'a> {
    interceptors: &'a [&'a dyn Interceptor],
    index: usize,
    pub ctx: &'a EphemeralTestContext,
}

impl<'a> Chain<'a> {
    pub fn new(interceptors: &'a [&'a dyn Interceptor], ctx: &'a EphemeralTestContext) -> Self {
        Self {
            interceptors,
            index: 0,
            ctx,
        }
    }

    /// Runs the chain from the top.
    pub fn run(mut self) -> Result<Vec<AssertionRecord>, ScenarioError> {
        self.proceed()
    }

    pub fn proceed(&mut self) -> Result<Vec<AssertionRecord>, ScenarioError> {
        let Some(next) = self.interceptors.get(self.index).copied() else {
            return Err(ScenarioError::Internal {
                message: "interceptor chain exhausted without a terminal".to_owned(),
                frames: Vec::new(),
            });
        };
        self.index += 1;
        let result = next.intercept(self);
        self.index -= 1;
        result
    }
}

/// Outermost element: translates an escaped error into a single failure
/// record and never re-throws. On success it enriches record locations when
/// trace mode is on.
pub struct ResultResolver {
    trace_mode: bool,
    debug: bool,
}

impl ResultResolver {
    pub fn new(depth: AuditDepth, debug: bool) -> Self {
        Self {
            trace_mode: depth == AuditDepth::Explainable,
            debug,
        }
    }

    fn resolve_failure(
        &self,
        error: &ScenarioError,
        ctx: &EphemeralTestContext,
    ) -> AssertionRecord {
        let sanitized = sanitize_frames(error.frames(), self.debug);
        let location = extract_location(
            &sanitized,
            self.trace_mode,
            &ctx.specification.target.fully_qualified_name,
            &ctx.specification.target.display_name,
        );
        let record = match error {
            ScenarioError::Contract(violation) => AssertionRecord::failed(
                violation.rule.clone(),
                format!("Contract violated: {}", violation.message),
            )
            .with_comparison(violation.expected.clone(), violation.actual.clone()),
            ScenarioError::Assertion {
                message,
                expected,
                actual,
                ..
            } => AssertionRecord::failed(
                AssertionRule::StandardAssertion,
                format!("Assertion failed: {message}"),
            )
            .with_comparison(expected.clone(), actual.clone()),
            ScenarioError::Configuration(cause) => AssertionRecord::failed(
                AssertionRule::ConfigurationError,
                format!("Configuration Error: {cause}"),
            ),
            ScenarioError::Internal { message, .. } => AssertionRecord::failed(
                AssertionRule::SystemError {
                    type_name: "InternalError".to_owned(),
                },
                format!("Internal Framework Error: {message}"),
            ),
            ScenarioError::Timeout { millis } => AssertionRecord::failed(
                AssertionRule::SystemError {
                    type_name: "Timeout".to_owned(),
                },
                format!("Aborted: timed out after {millis}ms"),
            ),
            ScenarioError::User {
                type_name, message, ..
            } => AssertionRecord::failed(
                AssertionRule::UserException {
                    type_name: type_name.clone(),
                },
                format!("Unexpected Exception: {message}"),
            ),
        };
        record.at(location)
    }
}

impl Interceptor for ResultResolver {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Vec<AssertionRecord>, ScenarioError> {
        match chain.proceed() {
            Ok(mut records) => {
                if self.trace_mode {
                    let target = &chain.ctx.specification.target;
                    for record in &mut records {
                        if record.location == SourceLocation::NotCaptured {
                            record.location = SourceLocation::Approximate {
                                class: target.fully_qualified_name.clone(),
                                display: target.display_name.clone(),
                            };
                        }
                    }
                }
                Ok(records)
            }
            Err(error) => Ok(vec![self.resolve_failure(&error, chain.ctx)]),
        }
    }
}

/// Middle element: flushes the trace to the worker journal, snapshots per
/// the retention policy, publishes the result event, and always recycles
/// the journal afterwards.
pub struct Auditing<'a> {
    policy: AuditConfig,
    sink: Mutex<&'a mut RecyclingFileSink>,
    publisher: &'a BroadcastingPublisher,
    clock: FrozenClock,
    run_id: Uuid,
    test_name: String,
    worker_id: usize,
    seed: i64,
    started: Instant,
    /// The decided status, read back by the runner after the chain returns.
    verdict: Mutex<Option<TestStatus>>,
    /// The journal path the published event carried.
    published_path: Mutex<Option<String>>,
}

impl<'a> Auditing<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy: AuditConfig,
        sink: &'a mut RecyclingFileSink,
        publisher: &'a BroadcastingPublisher,
        clock: FrozenClock,
        run_id: Uuid,
        test_name: &str,
        worker_id: usize,
        seed: i64,
    ) -> Self {
        Self {
            policy,
            sink: Mutex::new(sink),
            publisher,
            clock,
            run_id,
            test_name: test_name.to_owned(),
            worker_id,
            seed,
            started: Instant::now(),
            verdict: Mutex::new(None),
            published_path: Mutex::new(None),
        }
    }

    /// The status decided during finalization.
    pub fn decided_status(&self) -> Option<TestStatus> {
        self.verdict.lock().clone()
    }

    /// The journal path the published event carried: the snapshot when one
    /// was taken, the worker journal otherwise.
    pub fn journal_path(&self) -> String {
        self.published_path
            .lock()
            .clone()
            .unwrap_or_else(|| self.sink.lock().path().display().to_string())
    }

    fn finalize(
        &self,
        ctx: &EphemeralTestContext,
        error: Option<&ScenarioError>,
        records: &[AssertionRecord],
    ) {
        let mut sink = self.sink.lock();
        let ts = self.clock.epoch_millis();

        // Flush everything recorded so far; simple depth drops design
        // events.
        for event in ctx.trace.snapshot_events() {
            if self.policy.depth == AuditDepth::Simple && event.phase() == Phase::Design {
                continue;
            }
            sink.emit(&event);
        }
        for record in records {
            let event = TraceEvent::Verification {
                rule: record.rule.to_string(),
                status: record.status.as_str().to_owned(),
                detail: record.message.clone(),
                ts,
            };
            ctx.trace.record(event.clone());
            sink.emit(&event);
        }

        let status = VerdictDecider::decide(error, records);
        let verdict_event = TraceEvent::Verdict {
            status: serde_json::to_value(&status).expect("statuses serialize infallibly"),
            duration_total_ms: self.started.elapsed().as_millis() as u64,
            ts,
        };
        ctx.trace.record(verdict_event.clone());
        sink.emit(&verdict_event);

        let snapshot = match self.policy.retention {
            AuditRetention::None => None,
            AuditRetention::Always => Some(self.snapshot_name("traces")),
            AuditRetention::OnFailure => {
                (!status.is_passed()).then(|| self.snapshot_name("failures"))
            }
        };
        let journal_path = match snapshot {
            Some(target) => sink.snapshot_to(&target),
            None => sink.path().display().to_string(),
        };

        self.publisher.publish(&TestResultEvent {
            run_id: self.run_id,
            test_name: self.test_name.clone(),
            worker_id: self.worker_id,
            seed: self.seed,
            status: status.clone(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            journal_path: journal_path.clone(),
            timestamp: ts,
        });
        *self.verdict.lock() = Some(status);
        *self.published_path.lock() = Some(journal_path);

        // The journal is recycled for the next test no matter what
        // publishing did.
        sink.reset();
    }

    fn snapshot_name(&self, directory: &str) -> String {
        if self.policy.archive {
            format!(
                "{directory}/run-{}-{}.log",
                self.run_id,
                self.clock.epoch_millis()
            )
        } else {
            format!("{directory}/run-{}.log", self.run_id)
        }
    }
}

impl Interceptor for Auditing<'_> {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Vec<AssertionRecord>, ScenarioError> {
        let outcome = chain.proceed();
        if let Err(error) = &outcome {
            let frames: Vec<String> = error
                .frames()
                .iter()
                .map(|frame| frame.to_string())
                .collect();
            chain.ctx.trace.record(TraceEvent::exception(
                error.cause_name(),
                &error.to_string(),
                frames,
                self.clock.epoch_millis(),
            ));
        }
        let records = outcome.as_deref().unwrap_or_default().to_vec();
        self.finalize(chain.ctx, outcome.as_ref().err(), &records);
        outcome
    }
}

/// Terminal element: drives the scenario executor.
pub struct ExecutorInterceptor<'a> {
    executor: &'a ScenarioExecutor,
}

impl<'a> ExecutorInterceptor<'a> {
    pub fn new(executor: &'a ScenarioExecutor) -> Self {
        Self { executor }
    }
}

impl Interceptor for ExecutorInterceptor<'_> {
    fn intercept(&self, chain: &mut Chain<'_>) -> Result<Vec<AssertionRecord>, ScenarioError> {
        self.executor.execute_scenarios(chain.ctx)
    }
}
