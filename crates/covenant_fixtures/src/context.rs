//! Generation context: the seeded randomness source, the frozen clock and
//! the DFS ancestor set used for cycle detection.

use std::sync::Arc;

use covenant_trace::{ScenarioTrace, TraceEvent};
use covenant_type_graph::{FrozenClock, TypeId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::rng::{chance, next_double_inclusive, next_long_inclusive};

pub struct GenerationContext {
    rng: StdRng,
    clock: FrozenClock,
    /// The DFS path of structural types currently being assembled.
    history: Vec<TypeId>,
    trace: Arc<ScenarioTrace>,
}

impl GenerationContext {
    pub fn new(seed: i64, clock: FrozenClock, trace: Arc<ScenarioTrace>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed as u64),
            clock,
            history: Vec::new(),
            trace,
        }
    }

    pub fn clock(&self) -> FrozenClock {
        self.clock
    }

    pub fn trace(&self) -> &ScenarioTrace {
        &self.trace
    }

    /// Records a design decision with the frozen clock's timestamp.
    pub fn record_design(&self, subject: &str, strategy: &str, value: &str) {
        self.trace.record(TraceEvent::Design {
            subject: subject.to_owned(),
            strategy: strategy.to_owned(),
            value: value.to_owned(),
            ts: self.clock.epoch_millis(),
        });
    }

    pub fn next_long_inclusive(&mut self, min: i64, max: i64) -> i64 {
        next_long_inclusive(&mut self.rng, min, max)
    }

    pub fn next_double_inclusive(&mut self, min: f64, max: f64) -> f64 {
        next_double_inclusive(&mut self.rng, min, max)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        chance(&mut self.rng, probability)
    }

    /// Uniform index into a non-empty slice length.
    pub fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.rng.random_range(0..len)
    }

    /// Deterministic v4 uuid from the seeded stream.
    pub fn next_uuid(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.random()).into_uuid()
    }

    /// Instance token for the mocking engine, drawn from the seeded stream
    /// so mock identity replays under the same seed.
    pub fn next_token(&mut self) -> u64 {
        self.rng.random()
    }

    pub fn random_char_from(&mut self, alphabet: &[char]) -> char {
        alphabet[self.rng.random_range(0..alphabet.len())]
    }

    // DFS ancestor set.

    pub fn in_history(&self, type_id: &TypeId) -> bool {
        let base = type_id.non_nullable();
        self.history.iter().any(|entry| entry.non_nullable() == base)
    }

    pub fn push_history(&mut self, type_id: TypeId) {
        self.history.push(type_id);
    }

    pub fn pop_history(&mut self) {
        self.history.pop();
    }

    /// The full path, closing the loop at `repeat`: `"A -> B -> A"`.
    pub fn render_cycle(&self, repeat: &TypeId) -> String {
        let mut names: Vec<&str> = self
            .history
            .iter()
            .map(|entry| simple_name(entry))
            .collect();
        names.push(simple_name(repeat));
        names.join(" -> ")
    }
}

fn simple_name(type_id: &TypeId) -> &str {
    let name = type_id.qualified_name();
    name.rsplit('.').next().unwrap_or(name)
}
