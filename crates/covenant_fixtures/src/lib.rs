//! Fixture generation: the seeded, cycle-safe recursive generator and its
//! pluggable strategy registry.
//!
//! Every strategy produces three things for the types it supports: a random
//! draw (`generate`), the boundary set (`edge_cases`) and deliberately
//! broken samples (`invalid`). The [`FixtureGenerator`] dispatches over the
//! registry in a fixed priority order, enforces nullability and the cycle
//! policy, and records every decision it makes into the scenario trace.

#[macro_use]
extern crate tracing;

mod context;
pub use context::GenerationContext;

mod error;
pub use error::GenerationError;

mod generator;
pub use generator::FixtureGenerator;

mod mocking;
pub use mocking::{MockingEngine, MockingError, OpaqueMockingEngine};

mod request;
pub use request::GenerationRequest;

pub mod rng;

pub mod strategies;
pub use strategies::{GenerationStrategy, Regen, SealedIndex};

mod validator;
pub use validator::validate_configuration;
