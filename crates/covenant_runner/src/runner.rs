//! Per-spec orchestration: freeze the clock, fix the seed, build the
//! ephemeral context, and push it through the interceptor chain.

use std::{sync::Arc, time::Instant};

use covenant_fixtures::FixtureGenerator;
use covenant_trace::{ScenarioTrace, TraceEvent};
use covenant_type_graph::FrozenClock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::{
    error::ConfigurationError,
    executor::ScenarioExecutor,
    factory::InstanceFactory,
    interceptor::{Auditing, Chain, ExecutorInterceptor, Interceptor, ResultResolver},
    policy::{AuditRetention, ExecutionPolicy},
    publisher::BroadcastingPublisher,
    result::{
        AssertionRecord, AssertionRule, ExecutionResult, SourceLocation, TargetResult,
        TestResultEvent, TestStatus,
    },
    spec_model::TestSpecification,
    timer::DeadlineTimer,
    verdict::VerdictDecider,
    worker::WorkerContext,
};

/// Executes one specification end to end on the current worker.
pub struct ScenarioRunner<'a> {
    factory: &'a InstanceFactory,
    generator: Arc<FixtureGenerator>,
    policy: &'a ExecutionPolicy,
    publisher: &'a BroadcastingPublisher,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        factory: &'a InstanceFactory,
        generator: Arc<FixtureGenerator>,
        policy: &'a ExecutionPolicy,
        publisher: &'a BroadcastingPublisher,
    ) -> Self {
        Self {
            factory,
            generator,
            policy,
            publisher,
        }
    }

    pub fn run(&self, spec: &TestSpecification, worker: &mut WorkerContext) -> TargetResult {
        let started = Instant::now();
        let clock = FrozenClock::freeze();
        // Spec seed first, then the policy's, then the frozen instant. The
        // spec itself is never mutated.
        let seed = spec
            .seed
            .or(self.policy.determinism.seed)
            .unwrap_or_else(|| clock.epoch_millis());
        let run_id = run_id_from(seed);
        let trace = Arc::new(ScenarioTrace::new(run_id));
        let test_name = spec.target.fully_qualified_name.clone();

        debug!(%test_name, seed, %run_id, "executing specification");

        let ctx = match self
            .factory
            .create(spec, clock, seed, Arc::clone(&trace))
        {
            Ok(ctx) => ctx,
            Err(error) => {
                return self.setup_failed(
                    spec, worker, clock, run_id, seed, &trace, started, &error,
                );
            }
        };

        let executor = match ScenarioExecutor::new(
            Arc::clone(&self.generator),
            clock,
            seed,
            DeadlineTimer::new(self.policy.resources.timeout_ms),
        ) {
            Ok(executor) => executor,
            Err(error) => {
                let error = ConfigurationError::Setup {
                    detail: error.to_string(),
                };
                return self.setup_failed(
                    spec, worker, clock, run_id, seed, &trace, started, &error,
                );
            }
        };

        let resolver = ResultResolver::new(self.policy.auditing.depth, false);
        let auditing = Auditing::new(
            self.policy.auditing.clone(),
            &mut worker.sink,
            self.publisher,
            clock,
            run_id,
            &test_name,
            worker.worker_id,
            seed,
        );
        let terminal = ExecutorInterceptor::new(&executor);
        let interceptors: [&dyn Interceptor; 3] = [&resolver, &auditing, &terminal];

        // The Result-Resolver converts every failure; the chain only errors
        // if the pipeline itself is broken.
        let records = Chain::new(&interceptors, &ctx)
            .run()
            .unwrap_or_else(|error| {
                vec![AssertionRecord::failed(
                    AssertionRule::SystemError {
                        type_name: "InternalError".to_owned(),
                    },
                    format!("Internal Framework Error: {error}"),
                )]
            });
        let status = auditing
            .decided_status()
            .unwrap_or_else(|| VerdictDecider::decide(None, &records));
        let journal_path = auditing.journal_path();

        TargetResult {
            test_name,
            status,
            execution: ExecutionResult {
                records,
                arguments: trace.snapshot_arguments(),
                seed,
            },
            duration: started.elapsed(),
            journal_path,
            warnings: Vec::new(),
        }
    }

    /// Setup failures are fatal for the spec: the entry point is never
    /// invoked, and the report points at the class definition.
    #[allow(clippy::too_many_arguments)]
    fn setup_failed(
        &self,
        spec: &TestSpecification,
        worker: &mut WorkerContext,
        clock: FrozenClock,
        run_id: Uuid,
        seed: i64,
        trace: &Arc<ScenarioTrace>,
        started: Instant,
        error: &ConfigurationError,
    ) -> TargetResult {
        warn!(test = %spec.target.fully_qualified_name, %error, "setup failed");
        let ts = clock.epoch_millis();
        let status = TestStatus::ExecutionError {
            cause: "ConfigurationError".to_owned(),
            message: format!("Setup Failed: {error}"),
        };
        let record = AssertionRecord::failed(
            AssertionRule::ConfigurationError,
            format!("Configuration Error: {error}"),
        )
        .at(SourceLocation::Approximate {
            class: spec.target.fully_qualified_name.clone(),
            display: spec.target.display_name.clone(),
        });

        worker
            .sink
            .emit(&TraceEvent::exception("ConfigurationError", &error.to_string(), Vec::new(), ts));
        let verdict = TraceEvent::Verdict {
            status: serde_json::to_value(&status).expect("statuses serialize infallibly"),
            duration_total_ms: started.elapsed().as_millis() as u64,
            ts,
        };
        worker.sink.emit(&verdict);

        let journal_path = match self.policy.auditing.retention {
            AuditRetention::None => worker.sink.path().display().to_string(),
            AuditRetention::Always => worker.sink.snapshot_to(&format!("traces/run-{run_id}.log")),
            AuditRetention::OnFailure => worker
                .sink
                .snapshot_to(&format!("failures/run-{run_id}.log")),
        };
        self.publisher.publish(&TestResultEvent {
            run_id,
            test_name: spec.target.fully_qualified_name.clone(),
            worker_id: worker.worker_id,
            seed,
            status: status.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            journal_path: journal_path.clone(),
            timestamp: ts,
        });
        worker.sink.reset();

        TargetResult {
            test_name: spec.target.fully_qualified_name.clone(),
            status,
            execution: ExecutionResult {
                records: vec![record],
                arguments: trace.snapshot_arguments(),
                seed,
            },
            duration: started.elapsed(),
            journal_path,
            warnings: Vec::new(),
        }
    }
}

/// The run id is drawn from the seeded stream, so identical seeds produce
/// identical ids.
fn run_id_from(seed: i64) -> Uuid {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}
