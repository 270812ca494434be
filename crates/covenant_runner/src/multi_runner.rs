//! The multi-target runner: fans specifications out over the worker pool
//! and streams per-target completions back to the caller.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use covenant_fixtures::{FixtureGenerator, MockingEngine};
use covenant_type_graph::ResolverSession;
use rayon::prelude::*;

use crate::{
    error::ConfigurationError,
    factory::InstanceFactory,
    filter::TestFilter,
    policy::ExecutionPolicy,
    publisher::BroadcastingPublisher,
    result::{RunOutcome, TargetResult},
    runner::ScenarioRunner,
    spec_model::TestSpecification,
    worker::WorkerContext,
};

/// Completion notification for one target.
pub struct TargetCompletion {
    pub fully_qualified_name: String,
    pub result: TargetResult,
}

pub trait OnTargetCompletedFn: Fn(TargetCompletion) + Send + Sync {}

impl<FnT> OnTargetCompletedFn for FnT where FnT: Fn(TargetCompletion) + Send + Sync {}

/// Receives merged specifications and runs each one on exactly one worker,
/// end to end. Workers never share sinks; results are keyed by target FQN.
pub struct MultiTargetRunner {
    specs: Vec<TestSpecification>,
    policy: ExecutionPolicy,
    session: Arc<ResolverSession>,
    generator: Arc<FixtureGenerator>,
    mocking: Arc<dyn MockingEngine>,
    publisher: Arc<BroadcastingPublisher>,
}

impl MultiTargetRunner {
    pub fn new(
        specs: Vec<TestSpecification>,
        policy: ExecutionPolicy,
        session: Arc<ResolverSession>,
        generator: Arc<FixtureGenerator>,
        mocking: Arc<dyn MockingEngine>,
        publisher: Arc<BroadcastingPublisher>,
    ) -> Self {
        Self {
            specs,
            policy,
            session,
            generator,
            mocking,
            publisher,
        }
    }

    pub fn specs(&self) -> &[TestSpecification] {
        &self.specs
    }

    fn matching_specs<'a>(
        &'a self,
        filter: &'a dyn TestFilter,
    ) -> impl Iterator<Item = &'a TestSpecification> {
        self.specs
            .iter()
            .filter(|spec| filter.matches_target(&spec.target.fully_qualified_name))
    }

    /// Runs every matching spec. Each completion is streamed through the
    /// callback as its suite finishes; the aggregated outcome is returned
    /// once all workers are done.
    pub fn run(
        &self,
        filter: &dyn TestFilter,
        on_completed: &dyn OnTargetCompletedFn,
    ) -> Result<RunOutcome, ConfigurationError> {
        let find_timer = Instant::now();
        let selected: Vec<&TestSpecification> = self.matching_specs(filter).collect();
        debug!(
            selected = selected.len(),
            total = self.specs.len(),
            elapsed = ?find_timer.elapsed(),
            "selected test targets"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.policy.resources.parallelism.max(1))
            .build()
            .map_err(|error| ConfigurationError::Setup {
                detail: format!("failed to build the worker pool: {error}"),
            })?;

        let results: Vec<(String, TargetResult)> = pool.install(|| {
            selected
                .par_iter()
                .map(|spec| {
                    let mut worker = WorkerContext::open(&self.policy.auditing.root);
                    let factory = InstanceFactory::new(
                        Arc::clone(&self.session),
                        Arc::clone(&self.generator),
                        Arc::clone(&self.mocking),
                    );
                    let runner = ScenarioRunner::new(
                        &factory,
                        Arc::clone(&self.generator),
                        &self.policy,
                        &self.publisher,
                    );
                    let result = runner.run(spec, &mut worker);
                    worker.dispose();

                    on_completed(TargetCompletion {
                        fully_qualified_name: spec.target.fully_qualified_name.clone(),
                        result: result.clone(),
                    });
                    (spec.target.fully_qualified_name.clone(), result)
                })
                .collect()
        });

        Ok(RunOutcome::new(results.into_iter().collect::<BTreeMap<_, _>>()))
    }

    /// Runs everything and only returns the aggregated outcome.
    pub fn run_collect(&self, filter: &dyn TestFilter) -> Result<RunOutcome, ConfigurationError> {
        self.run(filter, &|_completion| {})
    }
}
